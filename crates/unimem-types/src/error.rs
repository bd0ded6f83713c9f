//! Shared error types for the unified memory client.

use crate::memory::MemorySource;
use thiserror::Error;

/// Top-level error type for every memory operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoryError {
    /// Malformed caller input. Raised before any request is sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request was sent but no response was received
    /// (DNS, connection refused, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-supplied error code, if any.
        code: Option<String>,
        /// Human readable message extracted from the body.
        message: String,
        /// Raw response body.
        body: String,
    },

    /// The requested or defaulted backend is disabled or was never configured.
    #[error("Memory source '{backend}' is not available: {reason}")]
    UnavailableSource {
        /// The backend that could not serve the call.
        backend: MemorySource,
        /// Why it is unavailable.
        reason: String,
    },

    /// A 2xx body could not be decoded, or a payload could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A base URL or endpoint could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl MemoryError {
    /// Shorthand for a validation failure.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// HTTP status code, when the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error was raised locally by input validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Alias for Result with MemoryError.
pub type MemoryResult<T> = Result<T, MemoryError>;
