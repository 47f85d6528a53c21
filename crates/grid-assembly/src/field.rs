//! A spatial field: one grid plus its sample matrix.

use chrono::{DateTime, Utc};
use grid_common::{Level, Parameter};
use projection::Grid;

/// Check for the internal missing marker.
///
/// Wire sentinels are normalized to NaN immediately after decoding;
/// nothing downstream ever compares against a sentinel value.
#[inline]
pub fn is_missing(v: f32) -> bool {
    v.is_nan()
}

/// One grid's worth of samples in canonical orientation: row-major,
/// row 0 southernmost, column 0 westernmost.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub grid: Grid,
    pub data: Vec<f32>,
}

impl Field {
    /// A field with every cell missing.
    pub fn missing(grid: Grid) -> Self {
        let len = grid.len();
        Self {
            grid,
            data: vec![f32::NAN; len],
        }
    }

    pub fn new(grid: Grid, data: Vec<f32>) -> Self {
        debug_assert_eq!(grid.len(), data.len());
        Self { grid, data }
    }

    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.grid.nx + col
    }

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.data[self.index(col, row)]
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, v: f32) {
        let idx = self.index(col, row);
        self.data[idx] = v;
    }

    /// Number of non-missing samples.
    pub fn present_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

/// A record that survived per-record preparation: metadata plus its
/// normalized (and possibly cropped/reprojected) field.
#[derive(Debug, Clone)]
pub struct PreparedRecord {
    /// Sequence index of the record in its source, for diagnostics.
    pub seq: usize,
    pub param: Parameter,
    pub level: Level,
    pub origin_time: DateTime<Utc>,
    pub valid_time: DateTime<Utc>,
    pub accumulation_hours: Option<u32>,
    /// Corrected/priority report; overwrites earlier dataset writes.
    pub corrected: bool,
    /// Vertical coefficient side channel from hybrid-level records.
    pub vertical_coefficients: Option<Vec<f64>>,
    pub field: Field,
}
