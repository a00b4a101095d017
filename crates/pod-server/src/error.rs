use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pod_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("object exceeds limit of {max} bytes")]
    PayloadTooLarge { max: usize },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidDigest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                StoreError::Serialization(_) => StatusCode::BAD_REQUEST,
                StoreError::Disabled => StatusCode::SERVICE_UNAVAILABLE,
                StoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                StoreError::Unavailable(_) => StatusCode::BAD_GATEWAY,
                StoreError::HashMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::PayloadTooLarge { max }
            | Self::Store(StoreError::PayloadTooLarge { max, .. }) => {
                json!({ "error": self.to_string(), "max_size": max })
            }
            _ => json!({ "error": self.to_string() }),
        };
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
