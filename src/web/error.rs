use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::AppError;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::CycleInProgress { .. } => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::CaptchaTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AppError::TargetUnavailable { .. } | AppError::Browser(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}
