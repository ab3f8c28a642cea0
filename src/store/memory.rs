//! In-memory directory store for tests.
//!
//! Behaves like the MySQL store: the same row shapes, the same `IS NOT NULL`
//! predicates on the searches, and a bounded number of concurrent "connections"
//! that callers queue on.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::queries::QueryKind;
use super::types::{Patient, PatientFirstName, Provider, ProviderSpecialty, RowId};
use super::DirectoryStore;
use crate::error::StoreError;

/// Default number of concurrent queries, matching the pool default.
const DEFAULT_MAX_CONNECTIONS: usize = 10;

/// A full row of the `providers` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEntry {
    pub provider_id: RowId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub provider_speciality: Option<String>,
}

impl ProviderEntry {
    /// Provider with every column set.
    pub fn new(
        provider_id: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        provider_speciality: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: RowId::from(provider_id),
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            provider_speciality: Some(provider_speciality.into()),
        }
    }
}

/// In-memory store with fault injection and a simulated connection limit.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    patients: Arc<Vec<Patient>>,
    providers: Arc<Vec<ProviderEntry>>,
    failing: Arc<Mutex<HashSet<QueryKind>>>,
    stalling: Arc<HashSet<QueryKind>>,
    latency: Duration,
    connections: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Empty store with default limits.
    pub fn new() -> Self {
        MemoryStoreBuilder::new().build()
    }

    /// Start building a populated store.
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    /// Make every subsequent `kind` query fail.
    pub fn fail(&self, kind: QueryKind) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
    }

    /// Let `kind` queries succeed again.
    pub fn recover(&self, kind: QueryKind) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }

    /// Highest number of queries that ran at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of queries that ran to completion, failed or not.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn is_failing(&self, kind: QueryKind) -> bool {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
    }

    /// Hold one connection slot for the duration of a query.
    async fn run<T>(
        &self,
        kind: QueryKind,
        query: impl FnOnce() -> T + Send,
    ) -> Result<T, StoreError> {
        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.stalling.contains(&kind) {
            std::future::pending::<()>().await;
        }

        let result = if self.is_failing(kind) {
            Err(StoreError::Unavailable(format!("simulated {kind} failure")))
        } else {
            Ok(query())
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.run(QueryKind::Ping, || ()).await
    }

    async fn list_patients(&self) -> Result<Vec<Patient>, StoreError> {
        self.run(QueryKind::ListPatients, || self.patients.to_vec())
            .await
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, StoreError> {
        self.run(QueryKind::ListProviders, || {
            self.providers
                .iter()
                .map(|p| Provider {
                    first_name: p.first_name.clone(),
                    last_name: p.last_name.clone(),
                    provider_speciality: p.provider_speciality.clone(),
                })
                .collect()
        })
        .await
    }

    async fn search_patients(
        &self,
        first_name: Option<&str>,
    ) -> Result<Vec<PatientFirstName>, StoreError> {
        self.run(QueryKind::SearchPatients, || {
            self.patients
                .iter()
                .filter_map(|p| {
                    let name = p.first_name.as_deref()?;
                    if first_name.is_some_and(|wanted| wanted != name) {
                        return None;
                    }
                    Some(PatientFirstName {
                        patient_id: p.patient_id,
                        first_name: name.to_string(),
                    })
                })
                .collect()
        })
        .await
    }

    async fn search_providers(
        &self,
        specialty: Option<&str>,
    ) -> Result<Vec<ProviderSpecialty>, StoreError> {
        self.run(QueryKind::SearchProviders, || {
            self.providers
                .iter()
                .filter_map(|p| {
                    let speciality = p.provider_speciality.as_deref()?;
                    if specialty.is_some_and(|wanted| wanted != speciality) {
                        return None;
                    }
                    Some(ProviderSpecialty {
                        provider_id: p.provider_id,
                        provider_speciality: speciality.to_string(),
                    })
                })
                .collect()
        })
        .await
    }
}

/// Builder for [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreBuilder {
    patients: Vec<Patient>,
    providers: Vec<ProviderEntry>,
    failing: HashSet<QueryKind>,
    stalling: HashSet<QueryKind>,
    latency: Duration,
    max_connections: usize,
}

impl MemoryStoreBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            patients: Vec::new(),
            providers: Vec::new(),
            failing: HashSet::new(),
            stalling: HashSet::new(),
            latency: Duration::ZERO,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Add a patient row.
    pub fn patient(mut self, patient: Patient) -> Self {
        self.patients.push(patient);
        self
    }

    /// Add a provider row.
    pub fn provider(mut self, provider: ProviderEntry) -> Self {
        self.providers.push(provider);
        self
    }

    /// Fail every `kind` query from the start.
    pub fn failing(mut self, kind: QueryKind) -> Self {
        self.failing.insert(kind);
        self
    }

    /// Make every `kind` query hang while holding its connection, like a
    /// database that never answers.
    pub fn stalling(mut self, kind: QueryKind) -> Self {
        self.stalling.insert(kind);
        self
    }

    /// Delay applied to every query while it holds a connection.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of queries allowed to run at once.
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Build the store.
    pub fn build(self) -> MemoryStore {
        MemoryStore {
            patients: Arc::new(self.patients),
            providers: Arc::new(self.providers),
            failing: Arc::new(Mutex::new(self.failing)),
            stalling: Arc::new(self.stalling),
            latency: self.latency,
            connections: Arc::new(Semaphore::new(self.max_connections)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
