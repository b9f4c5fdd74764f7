//! Error types for the Claudia client.

use thiserror::Error;

/// A shared error type for the entire Claudia client.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait. The variants distinguish
/// the failure classes the session controller reacts to differently:
/// a transport failure (request never reached the backend) and a backend
/// rejection (response received with a non-success status).
#[derive(Error, Debug, Clone)]
pub enum ClaudiaError {
    /// Request could not be sent or no response was received
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response received with a non-success status
    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input rejected before reaching the backend
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClaudiaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Rejected error
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a Rejected error
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Check if the backend was reached at all.
    ///
    /// Returns true for `Rejected` and `Serialization` errors: a response
    /// arrived, it just wasn't usable. The send fallback policy treats a
    /// malformed response the same as a rejection.
    pub fn backend_reached(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Serialization { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ClaudiaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ClaudiaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ClaudiaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ClaudiaError>`.
pub type Result<T> = std::result::Result<T, ClaudiaError>;
