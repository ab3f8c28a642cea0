//! Read-only HTTP API over a MySQL directory of patients and providers.
//!
//! Each endpoint runs one fixed query against a bounded connection pool and
//! returns the rows in a `{message, data}` envelope:
//!
//! ```text
//! GET /                   welcome text
//! GET /patients           every patient
//! GET /providers          every provider
//! GET /patients/search    patients with a first name   (?first_name=)
//! GET /providers/search   providers with a specialty   (?specialty=, 404 when empty)
//! ```
//!
//! Query failures are logged in full and reach the caller only as a
//! plain-text `500 Server error`.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`store`]: Directory queries, MySQL pool and in-memory store
//! - [`api`]: HTTP handlers and router
//! - [`server`]: Startup check and serve loop
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod utils;

pub use config::Config;
pub use error::AppError;
