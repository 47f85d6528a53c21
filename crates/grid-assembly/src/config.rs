//! Pipeline configuration.
//!
//! One immutable `AssemblyConfig` value is passed by reference into
//! every stage entry point; components never retain or mutate it.

use grid_common::{BoundingBox, LevelFilter, RemapTable};
use projection::Grid;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Interpolation used when resampling onto a target grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Nearest,
    #[default]
    Bilinear,
}

/// Valid data range for a parameter. Samples outside the range are
/// converted to the missing marker during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    /// Minimum valid value (inclusive).
    pub min: f32,
    /// Maximum valid value (inclusive).
    pub max: f32,
}

impl ValidRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_valid(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Selection between time-staggered variants of a cumulative parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulationSelect {
    /// Target accumulation window length in hours.
    pub hours: u32,
    /// Keep the variants that do NOT match instead.
    #[serde(default)]
    pub complement: bool,
}

/// Which derived parameters to synthesize after assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveOptions {
    /// Compute hybrid-level pressure from vertical coefficients and
    /// surface pressure.
    pub hybrid_pressure: bool,
    /// Compute relative humidity from temperature, pressure and
    /// specific humidity where it is missing.
    pub relative_humidity: bool,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            hybrid_pressure: true,
            relative_humidity: true,
        }
    }
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    /// Remap 0..360-degree longitude spans to -180..180.
    pub dateline_fix: bool,
    /// Geographic crop rectangle applied to every record.
    pub crop: Option<BoundingBox>,
    /// Reproject every record onto this grid instead of cropping.
    pub target_grid: Option<Grid>,
    /// Interpolation used for reprojection and stitch gap filling.
    pub interpolation: InterpolationMethod,
    /// Parameter remap rules, applied once per record before
    /// classification.
    pub remap: RemapTable,
    /// Level inclusion/exclusion policy.
    pub levels: LevelFilter,
    /// Drop every parameter not mentioned in the remap table.
    pub remap_only_parameters: bool,
    /// Cumulative-parameter accumulation window selection.
    pub accumulation: Option<AccumulationSelect>,
    /// Merge edge-adjacent tiles into larger covering grids.
    pub stitch: bool,
    /// Derived parameter synthesis.
    pub derive: DeriveOptions,
    /// Ceiling on the allocated size of one dataset, in bytes.
    pub max_dataset_bytes: u64,
    /// Per-parameter physical plausibility ranges, keyed by parameter id.
    pub valid_ranges: HashMap<u16, ValidRange>,
    /// Process sources one at a time; required when the active decoder
    /// is not thread-safe.
    pub sequential_decode: bool,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            dateline_fix: false,
            crop: None,
            target_grid: None,
            interpolation: InterpolationMethod::Bilinear,
            remap: RemapTable::default(),
            levels: LevelFilter::default(),
            remap_only_parameters: false,
            accumulation: None,
            stitch: false,
            derive: DeriveOptions::default(),
            max_dataset_bytes: 2 * 1024 * 1024 * 1024,
            valid_ranges: HashMap::new(),
            sequential_decode: false,
        }
    }
}
