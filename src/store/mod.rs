//! Read-only access to the patient and provider tables.
//!
//! This module handles:
//! - Row types for each query
//! - The fixed SQL text per endpoint
//! - The MySQL-backed store over a bounded connection pool
//! - An in-memory store for tests

pub mod memory;
pub mod mysql;
pub mod queries;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreError;

pub use memory::{MemoryStore, MemoryStoreBuilder, ProviderEntry};
pub use mysql::{MySqlStore, DEFAULT_ACQUIRE_TIMEOUT};
pub use queries::QueryKind;
pub use types::{BirthDate, Patient, PatientFirstName, Provider, ProviderSpecialty, RowId};

/// Source of directory rows used by the HTTP handlers.
///
/// Every call is one independent read; implementations hold no per-request
/// state.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Check that a connection can be acquired and used.
    async fn ping(&self) -> Result<(), StoreError>;

    /// All patients.
    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError>;

    /// All providers.
    async fn list_providers(&self) -> Result<Vec<Provider>, StoreError>;

    /// Patients with a non-null first name, narrowed to `first_name` when given.
    async fn search_patients(
        &self,
        first_name: Option<&str>,
    ) -> Result<Vec<PatientFirstName>, StoreError>;

    /// Providers with a non-null specialty, narrowed to `specialty` when given.
    async fn search_providers(
        &self,
        specialty: Option<&str>,
    ) -> Result<Vec<ProviderSpecialty>, StoreError>;
}
