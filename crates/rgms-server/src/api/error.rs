use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rgms_core::RgmsError;
use serde_json::json;
use tracing::error;

/// An error rendered as `{"error": {"code": ..., "message": ...}}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<RgmsError> for ApiError {
    fn from(err: RgmsError) -> Self {
        let (status, code) = match &err {
            RgmsError::CadetNotFound(_) => (StatusCode::NOT_FOUND, "cadet_not_found"),
            RgmsError::MeritLogNotFound(_) => (StatusCode::NOT_FOUND, "merit_log_not_found"),
            e if e.is_client_error() => (StatusCode::BAD_REQUEST, "validation_failed"),
            _ => {
                error!(error = %err, "Store operation failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
        };
        Self::new(status, code, err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        error!(error = %err, "Background task failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "background task failed",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(RgmsError::CadetNotFound(3)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(RgmsError::MeritLogNotFound(3)).code(),
            "merit_log_not_found"
        );
        assert_eq!(
            ApiError::from(RgmsError::InvalidMeritType("bonus".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RgmsError::InvalidPoints("0".to_string())).code(),
            "validation_failed"
        );

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(
            ApiError::from(RgmsError::Io(io)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
