//! Gateway error type and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::batch::{AdmissionError, ProgressStoreError};

/// Errors surfaced by the HTTP endpoints as structured JSON.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Batch ID not found")]
    BatchNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<AdmissionError> for GatewayError {
    fn from(e: AdmissionError) -> Self {
        GatewayError::BadRequest(e.to_string())
    }
}

impl From<ProgressStoreError> for GatewayError {
    fn from(e: ProgressStoreError) -> Self {
        match e {
            ProgressStoreError::NotFound => GatewayError::BatchNotFound,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            GatewayError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            GatewayError::BatchNotFound => (StatusCode::NOT_FOUND, self.to_string()),
            GatewayError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_errors_map_to_bad_request() {
        let err: GatewayError = AdmissionError::Empty.into();
        assert!(matches!(err, GatewayError::BadRequest(_)));
        assert_eq!(err.to_string(), "No image files in request");
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err: GatewayError = ProgressStoreError::NotFound.into();
        assert!(matches!(err, GatewayError::BatchNotFound));
    }
}
