//! Error types for pdca-desk

use thiserror::Error;

/// Result type alias for store, engine and export operations
pub type Result<T> = std::result::Result<T, PdcaError>;

#[derive(Error, Debug)]
pub enum PdcaError {
    /// Malformed week or month identifier
    #[error("Invalid period '{value}': {reason}")]
    InvalidPeriod { value: String, reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Export error: {0}")]
    Export(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl PdcaError {
    pub fn invalid_period(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPeriod {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
}
