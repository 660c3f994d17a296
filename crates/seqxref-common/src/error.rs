//! Error types shared by the seqxref crates

use thiserror::Error;

/// Result type alias for seqxref operations
pub type Result<T> = std::result::Result<T, XrefError>;

/// Main error type for the shared collaborators
#[derive(Error, Debug)]
pub enum XrefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delimited file error: {0}")]
    Delimited(#[from] csv::Error),

    #[error("Unsupported format for {operation}: {format}")]
    UnsupportedFormat { operation: String, format: String },

    #[error("Cache file not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl XrefError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn unsupported(operation: impl Into<String>, format: impl std::fmt::Display) -> Self {
        Self::UnsupportedFormat {
            operation: operation.into(),
            format: format.to_string(),
        }
    }
}
