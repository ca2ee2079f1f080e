use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    InvalidRequest(&'static str),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Unsupported database type: {0}")]
    UnsupportedKind(String),

    #[error("A container named {0} already exists")]
    NameConflict(String),

    #[error("Failed to pull image {image}: {cause}")]
    PullFailed { image: String, cause: String },

    #[error("Container runtime {operation} failed: {cause}")]
    Runtime {
        operation: &'static str,
        cause: String,
    },

    #[error("Failed to delete container {id}: {cause}")]
    DeleteFailed { id: String, cause: String },
}

impl AppError {
    pub fn runtime(operation: &'static str, cause: impl ToString) -> Self {
        Self::Runtime {
            operation,
            cause: cause.to_string(),
        }
    }

    /// Failures caused by the container runtime rather than by the caller
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::PullFailed { .. }
                | Self::Runtime { .. }
                | Self::DeleteFailed { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::MalformedBody(_) => "INVALID_REQUEST",
            Self::UnsupportedKind(_) => "UNSUPPORTED_KIND",
            Self::NameConflict(_) => "NAME_CONFLICT",
            Self::PullFailed { .. }
            | Self::Runtime { .. }
            | Self::DeleteFailed { .. } => "RUNTIME_FAILURE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedKind(_) => StatusCode::BAD_REQUEST,
            Self::NameConflict(_) => StatusCode::CONFLICT,
            Self::PullFailed { .. }
            | Self::Runtime { .. }
            | Self::DeleteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to an untrusted caller
    fn public_message(&self) -> String {
        match self {
            Self::DeleteFailed { .. } => "Failed to delete database".to_string(),
            Self::PullFailed { .. } | Self::Runtime { .. } => {
                "Container runtime request failed".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.public_message(),
            },
        };

        (self.status_code(), Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_are_structured() {
        let (status, body) = body_of(AppError::UnsupportedKind("redis".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_KIND");
        assert_eq!(body["error"]["message"], "Unsupported database type: redis");

        let (status, body) = body_of(AppError::NameConflict("postgres-app-abcde".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "NAME_CONFLICT");
    }

    #[tokio::test]
    async fn runtime_detail_is_not_exposed() {
        let err = AppError::runtime("create", "socket /var/run/docker.sock refused");
        assert!(err.is_infrastructure());

        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "RUNTIME_FAILURE");
        assert!(!body.to_string().contains("docker.sock"));
    }

    #[tokio::test]
    async fn delete_failure_is_generic() {
        let err = AppError::DeleteFailed {
            id: "abc".into(),
            cause: "No such container: abc".into(),
        };
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["message"], "Failed to delete database");
    }

    #[test]
    fn caller_errors_are_not_infrastructure() {
        assert!(!AppError::InvalidRequest("username").is_infrastructure());
        assert!(!AppError::UnsupportedKind("redis".into()).is_infrastructure());
        assert!(!AppError::NameConflict("x".into()).is_infrastructure());
        assert!(!AppError::MalformedBody("EOF".into()).is_infrastructure());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_request() {
        let (status, body) = body_of(AppError::MalformedBody("expected value".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
        assert_eq!(body["error"]["message"], "Malformed request body: expected value");
    }
}
