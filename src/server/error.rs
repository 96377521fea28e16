//! Error-to-HTTP response conversion.
//!
//! Implements `IntoResponse` for [`fr_core::Error`] so route handlers can
//! return `Result<T, AppError>` and bubble domain errors with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(fr_core::Error);

impl From<fr_core::Error> for AppError {
    fn from(e: fr_core::Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        }

        let code = match &self.0 {
            fr_core::Error::NotFound { .. } => "not_found",
            fr_core::Error::Validation(_) => "validation_error",
            fr_core::Error::Conflict(_) => "conflict",
            fr_core::Error::Routing { .. } => "routing_error",
            fr_core::Error::Step { .. } => "step_error",
            fr_core::Error::Artifact(_) => "artifact_error",
            fr_core::Error::Timeout(_) => "timeout",
            fr_core::Error::Database { .. } => "database_error",
            fr_core::Error::Io { .. } => "io_error",
            fr_core::Error::Tool { .. } => "tool_error",
            fr_core::Error::Internal(_) => "internal_error",
        };

        let body = json!({
            "error": self.0.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_produces_404() {
        let err = AppError::from(fr_core::Error::not_found("task", "abc"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn routing_produces_422() {
        let err = AppError::from(fr_core::Error::routing("stl", "catpart"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn conflict_produces_409() {
        let err = AppError::from(fr_core::Error::Conflict("already claimed".into()));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
