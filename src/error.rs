use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// ApiError
///
/// The request-level error taxonomy. Every handler returns `Result<_, ApiError>`
/// and the `IntoResponse` impl maps each variant to its status code with an
/// `{ "error": ... }` body.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A record lookup missed: 404.
    #[error("{0}")]
    NotFound(String),

    /// Missing or invalid credentials: 401.
    #[error("{0}")]
    Unauthorized(String),

    /// The record store failed: 500, carrying the upstream message verbatim.
    #[error("{0}")]
    Upstream(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Upstream(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("upstream failure: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
