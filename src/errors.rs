use crate::services::{file_store::FileStoreError, order_store::StoreError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Message returned for any failure whose details stay in the logs.
pub const GENERIC_ERROR: &str = "Internal server error";

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

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    }

    /// Map an order service failure. Validation problems go back to the
    /// client; everything else becomes `context` with a 500. The service has
    /// already logged the cause.
    pub fn from_store(err: StoreError, context: &str) -> Self {
        match err {
            StoreError::Validation(msg) => Self::bad_request(msg),
            _ => Self::internal(context),
        }
    }

    /// Map a file store failure, logging I/O causes at this boundary.
    pub fn from_files(err: FileStoreError, context: &str) -> Self {
        match err {
            FileStoreError::InvalidPath(_) => Self::bad_request(err.to_string()),
            FileStoreError::TooLarge { .. } => {
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            FileStoreError::Io(io_err) => {
                error!(error = %io_err, "{}", context);
                Self::internal(context)
            }
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
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}
