use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use leadgen_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            AppError::InvalidFilename(_) => (StatusCode::BAD_REQUEST, "Invalid filename provided."),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "File not found."),
            AppError::SearchProviderError(_) => (StatusCode::BAD_GATEWAY, "search_provider_error"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::IoError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: Some(self.0.to_string()),
        };

        (status, axum::Json(body)).into_response()
    }
}
