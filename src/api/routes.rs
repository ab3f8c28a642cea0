//! HTTP API route definitions.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{
    list_patients, list_providers, root, search_patients, search_providers, AppState,
};

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        // Patients
        .route("/patients", get(list_patients))
        .route("/patients/search", get(search_patients))
        // Providers
        .route("/providers", get(list_providers))
        .route("/providers/search", get(search_providers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
