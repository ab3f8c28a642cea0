//! HTTP API handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchMode;
use crate::error::ApiError;
use crate::store::{DirectoryStore, Patient, PatientFirstName, Provider, ProviderSpecialty};

/// Plain-text body served at `/`.
pub const WELCOME_MESSAGE: &str =
    "Welcome to the API! Use /patients or /providers to access data.";

/// `message` of every successful list response.
pub const SUCCESS_MESSAGE: &str = "Successful";

/// 404 message for an empty specialty search.
pub const NO_PROVIDERS_FOR_SPECIALTY: &str = "No providers found for this specialty.";

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Directory rows come from here.
    pub store: Arc<dyn DirectoryStore>,
    /// How search parameters reach the query.
    pub search_mode: SearchMode,
}

impl AppState {
    /// Create new app state.
    pub fn new(store: Arc<dyn DirectoryStore>, search_mode: SearchMode) -> Self {
        Self { store, search_mode }
    }
}

/// Envelope for successful list responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub message: String,
    pub data: Vec<T>,
}

impl<T> ListResponse<T> {
    fn successful(data: Vec<T>) -> Json<Self> {
        Json(Self {
            message: SUCCESS_MESSAGE.to_string(),
            data,
        })
    }
}

/// Query string of `/patients/search`.
#[derive(Debug, Default, Deserialize)]
pub struct PatientSearchParams {
    pub first_name: Option<String>,
}

/// Query string of `/providers/search`.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderSearchParams {
    pub specialty: Option<String>,
}

/// Root handler - static welcome text.
pub async fn root() -> &'static str {
    WELCOME_MESSAGE
}

/// All patients.
pub async fn list_patients(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Patient>>, ApiError> {
    let patients = state.store.list_patients().await?;
    Ok(ListResponse::successful(patients))
}

/// All providers.
pub async fn list_providers(
    State(state): State<AppState>,
) -> Result<Json<ListResponse<Provider>>, ApiError> {
    let providers = state.store.list_providers().await?;
    Ok(ListResponse::successful(providers))
}

/// Patients by first name. Never 404s, even on an empty result.
pub async fn search_patients(
    State(state): State<AppState>,
    Query(params): Query<PatientSearchParams>,
) -> Result<Json<ListResponse<PatientFirstName>>, ApiError> {
    let filter = state.search_mode.filter_value(params.first_name.as_deref());
    debug!(
        requested = ?params.first_name,
        applied = ?filter,
        mode = %state.search_mode,
        "patient search"
    );

    let patients = state.store.search_patients(filter).await?;
    Ok(ListResponse::successful(patients))
}

/// Providers by specialty. An empty result is a 404.
pub async fn search_providers(
    State(state): State<AppState>,
    Query(params): Query<ProviderSearchParams>,
) -> Result<Json<ListResponse<ProviderSpecialty>>, ApiError> {
    let filter = state.search_mode.filter_value(params.specialty.as_deref());
    debug!(
        requested = ?params.specialty,
        applied = ?filter,
        mode = %state.search_mode,
        "provider search"
    );

    let providers = state.store.search_providers(filter).await?;
    if providers.is_empty() {
        return Err(ApiError::NotFound(NO_PROVIDERS_FOR_SPECIALTY));
    }
    Ok(ListResponse::successful(providers))
}
