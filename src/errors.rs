use crate::services::gateway_service::GatewayError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Like `From<GatewayError>`, but answers a missing object with `msg`
    /// instead of the gateway's own wording.
    pub fn missing_object(err: GatewayError, msg: &str) -> Self {
        match err {
            GatewayError::ObjectNotFound { .. } => Self::not_found(msg),
            other => other.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "{}", self.message);
        }

        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            GatewayError::StorageConnectivity(_) => StatusCode::BAD_GATEWAY,
            GatewayError::BucketSetup { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::StorageWrite { .. }
            | GatewayError::StorageRead { .. }
            | GatewayError::StorageList(_)
            | GatewayError::StorageDelete { .. }
            | GatewayError::Signing { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}
