use crate::provider::ProviderError;
use crate::teach::DecodeError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Failures of the one-shot endpoint and of request decoding.
///
/// Provider details are logged but never sent to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    BadRequest(#[from] DecodeError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub const PROVIDER_ERROR: &'static str = "GenAI error";
    pub const PROVIDER_TIMEOUT: &'static str = "GenAI timeout";

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Provider(e) if e.is_timeout() => {
                (StatusCode::GATEWAY_TIMEOUT, Self::PROVIDER_TIMEOUT.to_string())
            }
            ApiError::Provider(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Self::PROVIDER_ERROR.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::BadRequest(e) => tracing::warn!(error = %e, "rejected teach request"),
            ApiError::Provider(e) => tracing::error!(error = %e, "provider call failed"),
        }
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
