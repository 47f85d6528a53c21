//! Error types for projection construction.

use thiserror::Error;

/// Errors raised when building a projection from record metadata.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("South-pole polar stereographic projections are not supported")]
    SouthPoleUnsupported,

    #[error("Degenerate projected area: {0}")]
    DegenerateArea(String),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
