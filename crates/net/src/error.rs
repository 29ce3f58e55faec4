//! API error types and their HTTP mapping

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use atelier_core::Error as CoreError;

/// API result type
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by handlers and extractors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Core(CoreError::Authentication(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Core(CoreError::PermissionDenied(msg.into()))
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Core(CoreError::Validation(_)) | ApiError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "VALIDATION")
            }
            ApiError::Core(CoreError::Authentication(_)) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Core(CoreError::PermissionDenied(_)) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Core(CoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Core(CoreError::Conflict(_)) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Core(CoreError::Capacity(_)) => (StatusCode::CONFLICT, "SOLD_OUT"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                warn!(code, error = %self, "Request rejected");
            }
            match self {
                ApiError::Core(CoreError::Validation(msg))
                | ApiError::Core(CoreError::Capacity(msg))
                | ApiError::Core(CoreError::Conflict(msg))
                | ApiError::Core(CoreError::NotFound(msg))
                | ApiError::Core(CoreError::Authentication(msg))
                | ApiError::Core(CoreError::PermissionDenied(msg))
                | ApiError::BadRequest(msg) => msg,
                other => other.to_string(),
            }
        };

        let body = ErrorBody {
            success: false,
            code,
            message,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::validation("x"), StatusCode::BAD_REQUEST, "VALIDATION"),
            (CoreError::Authentication("x".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (CoreError::PermissionDenied("x".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (CoreError::not_found("x"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (CoreError::conflict("x"), StatusCode::CONFLICT, "CONFLICT"),
            (CoreError::Capacity("x".into()), StatusCode::CONFLICT, "SOLD_OUT"),
            (CoreError::PasswordHash("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        ];
        for (err, status, code) in cases {
            assert_eq!(ApiError::from(err).status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_internal_details_hidden() {
        let response = ApiError::LockPoisoned.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
