//! Error types for record sources.

use thiserror::Error;

/// Errors a record source can report while decoding its byte stream.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse record: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Malformed record stream: {0}")]
    Malformed(String),
}

/// Result type for record source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;
