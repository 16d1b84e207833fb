//! Unified error types for storelink

use thiserror::Error;

/// Unified error type for all storelink operations
#[derive(Error, Debug)]
pub enum StoreLinkError {
    // Transport errors
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Stream channel error: {0}")]
    Channel(String),

    // API errors
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Session expired. Please login again.")]
    SessionExpired,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Payload errors
    #[error("Parse error: {0}")]
    Parse(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreLinkError {
    /// HTTP status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreLinkError::Api { status, .. } => Some(*status),
            StoreLinkError::SessionExpired | StoreLinkError::Unauthorized(_) => Some(401),
            _ => None,
        }
    }
}

/// Result type alias using StoreLinkError
pub type Result<T> = std::result::Result<T, StoreLinkError>;
