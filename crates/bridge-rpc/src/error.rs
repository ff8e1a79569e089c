//! RPC error types.

use crate::protocol::error_codes;
use thiserror::Error;

/// Failures surfaced by method handlers, classified for JSON-RPC codes.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The request parameters are semantically invalid (`-32602`).
    #[error("{0}")]
    InvalidParams(String),

    /// Anything else (`-32603`).
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            Self::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }
}

impl From<bridge_database::DatabaseError> for HandlerError {
    fn from(err: bridge_database::DatabaseError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Transport-level failures of the RPC session itself.
#[derive(Error, Debug)]
pub enum RpcError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using RpcError.
pub type RpcResult<T> = Result<T, RpcError>;
