//! Error types for the assembly pipeline.
//!
//! Batch-fatal conditions are `AssemblyError`; a single bad record is a
//! `RejectReason` value instead, so the batch driver can aggregate and
//! count rejections without exception-style control flow.

use thiserror::Error;

/// Fatal errors that abort the run (or one axis combination).
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// One parameter id used both as a remap target and as an
    /// unmodified original. Continuing would silently corrupt two
    /// unrelated parameter axes.
    #[error("Parameter remap conflict: id {id} is both a remap target and an unmodified original")]
    RemapConflict { id: u16 },

    /// Projected dataset size exceeds the configured ceiling. Itemized
    /// so the caller can see which axis to reduce.
    #[error(
        "Dataset too large: {times} times x {levels} levels x {parameters} parameters \
         x {nx}x{ny} points = {bytes} bytes (limit {limit})"
    )]
    DatasetTooLarge {
        times: usize,
        levels: usize,
        parameters: usize,
        nx: usize,
        ny: usize,
        bytes: u64,
        limit: u64,
    },

    #[error("Record source failed: {0}")]
    Source(#[from] grid_common::SourceError),
}

/// Result type for assembly operations.
pub type Result<T> = std::result::Result<T, AssemblyError>;

/// Why a single record was dropped from the batch.
///
/// These are per-record values, not errors: the pipeline continues with
/// the remaining batch and reports the rejected count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("unsupported scan order (alternating rows)")]
    UnsupportedScanOrder,

    #[error("incomplete geometry: missing field '{field}'")]
    IncompleteGeometry { field: &'static str },

    #[error("south-pole polar stereographic projections are unsupported")]
    SouthPoleUnsupported,

    #[error("reduced grid row {row} has zero samples")]
    EmptyRow { row: usize },

    #[error("sample count mismatch: expected {expected}, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("degenerate control tile")]
    DegenerateTile,

    #[error("level rejected by filter")]
    RejectedLevel,

    #[error("parameter not selected")]
    FilteredParameter,

    #[error("accumulation window does not match the configured target")]
    AccumulationWindow,

    #[error("valid time is implausibly far in the past")]
    ImplausibleTime,
}
