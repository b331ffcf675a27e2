//! Error Types

use thiserror::Error;

/// Result type alias for desk-side operations
pub type Result<T> = std::result::Result<T, PayError>;

/// Errors raised by remote calls and document persistence
#[derive(Error, Debug)]
pub enum PayError {
    /// The remote call itself failed (network, server fault, non-success status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Document store failure
    #[error("Storage error: {0}")]
    Store(String),

    /// Document does not exist
    #[error("{doctype} {name} not found")]
    NotFound { doctype: String, name: String },

    /// Business validation failed (e.g. invoice not submitted)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PayError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Store(_))
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(_) => "Could not reach the payment server. Please try again.".into(),
            Self::Store(_) => "The document could not be saved.".into(),
            Self::NotFound { doctype, name } => format!("{doctype} {name} does not exist."),
            Self::Validation(msg) => msg.clone(),
            Self::Config(_) => "Service configuration error.".into(),
            Self::Json(_) => "An unexpected error occurred.".into(),
        }
    }
}
