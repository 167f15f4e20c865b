//! Service error → HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tahaqq_service::ServiceError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct RpcError(#[from] pub ServiceError);

impl RpcError {
    /// Stable machine-readable code for the error payload.
    fn code(&self) -> &'static str {
        match &self.0 {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::ProviderUnavailable(_) => "provider_unavailable",
            ServiceError::LaunchConflict(_) => "conflict",
            ServiceError::Transition(_) => "invalid_state",
            ServiceError::Store(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
            ServiceError::LaunchConflict(_) | ServiceError::Transition(_) => StatusCode::CONFLICT,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.code(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
