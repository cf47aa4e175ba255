use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;

use crate::config::prompt::FAILSAFE_VERDICT;
use crate::llm::LlmError;
use crate::models::triage::{ ErrorResponse, PredictResponse };

/// Request failures of the triage API and their HTTP mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("Auth Verification Failed")]
    Unauthorized,
    #[error("Rate limit exceeded")]
    RateLimited,
    /// Rendered as the fail-safe verdict; the cause stays server-side.
    #[error("provider failure: {0}")]
    Provider(#[from] LlmError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Provider(_) => {
                let body = PredictResponse { output: FAILSAFE_VERDICT.to_string() };
                return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
            }
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
