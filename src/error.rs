//! Unified error types for the directory service.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Process-level error: startup, configuration and I/O failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while running a directory query.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database driver or pool failed.
    #[error("query failed: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced at the HTTP boundary.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Query failed; the detail stays in the server log.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The query succeeded but the endpoint treats an empty result as missing.
    #[error("{0}")]
    NotFound(&'static str),
}

/// Body returned to callers for a failed query.
pub const SERVER_ERROR_BODY: &str = "Server error";

#[derive(Debug, Serialize)]
struct MessageBody {
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(err) => {
                tracing::error!(error = %err, "Error executing query");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    SERVER_ERROR_BODY,
                )
                    .into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(MessageBody { message })).into_response()
            }
        }
    }
}
