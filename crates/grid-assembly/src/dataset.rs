//! Axis sets, the assembled dataset container, and the assembler.

use crate::config::AssemblyConfig;
use crate::error::{AssemblyError, Result};
use crate::field::PreparedRecord;
use crate::transform::{reproject, ReprojectionCache};
use grid_common::{Parameter, TimeAxis};
use projection::Grid;
use std::path::Path;
use tracing::info;

/// The discovered axes for one level type.
#[derive(Debug, Clone)]
pub struct AxisSet {
    pub level_type: u8,
    /// Deduplicated, ascending valid times.
    pub times: TimeAxis,
    /// Deduplicated level values sharing the level type, ascending.
    pub levels: Vec<f64>,
    /// Deduplicated parameters, in first-seen order.
    pub parameters: Vec<Parameter>,
    /// The chosen geometry: target override, stitched result, or the
    /// most popular tile geometry.
    pub grid: Grid,
}

impl AxisSet {
    pub fn level_index(&self, value: f64) -> Option<usize> {
        self.levels.iter().position(|l| *l == value)
    }

    pub fn param_index(&self, id: u16) -> Option<usize> {
        self.parameters.iter().position(|p| p.id == id)
    }

    /// Projected allocation size of a dataset over these axes, in bytes.
    pub fn projected_bytes(&self) -> u64 {
        self.times.len() as u64
            * self.levels.len() as u64
            * self.parameters.len() as u64
            * self.grid.len() as u64
            * std::mem::size_of::<f32>() as u64
    }
}

/// An assembled 4-axis dataset: time x level x parameter x location.
///
/// Immutable to callers once built; only the derived-parameter pass
/// inside this crate writes after assembly.
#[derive(Debug, Clone)]
pub struct Dataset {
    axes: AxisSet,
    data: Vec<f32>,
}

impl Dataset {
    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    #[inline]
    fn cell_base(&self, t: usize, l: usize, p: usize) -> usize {
        ((t * self.axes.levels.len() + l) * self.axes.parameters.len() + p) * self.axes.grid.len()
    }

    #[inline]
    pub fn get(&self, t: usize, l: usize, p: usize, col: usize, row: usize) -> f32 {
        self.data[self.cell_base(t, l, p) + row * self.axes.grid.nx + col]
    }

    #[inline]
    pub(crate) fn set(&mut self, t: usize, l: usize, p: usize, col: usize, row: usize, v: f32) {
        let idx = self.cell_base(t, l, p) + row * self.axes.grid.nx + col;
        self.data[idx] = v;
    }

    /// The full sample plane of one (time, level, parameter) cell.
    pub fn plane(&self, t: usize, l: usize, p: usize) -> &[f32] {
        let base = self.cell_base(t, l, p);
        &self.data[base..base + self.axes.grid.len()]
    }

    /// True if any sample of this parameter is present.
    pub fn parameter_nonempty(&self, p: usize) -> bool {
        (0..self.axes.times.len()).any(|t| {
            (0..self.axes.levels.len()).any(|l| self.plane(t, l, p).iter().any(|v| !v.is_nan()))
        })
    }

    fn time_nonempty(&self, t: usize) -> bool {
        (0..self.axes.levels.len()).any(|l| {
            (0..self.axes.parameters.len())
                .any(|p| self.plane(t, l, p).iter().any(|v| !v.is_nan()))
        })
    }
}

/// A sink the completed dataset is handed to. The core never inspects
/// the serialized layout.
pub trait DatasetSink {
    fn write(&self, dataset: &Dataset, dest: &Path) -> std::io::Result<()>;
}

/// Allocate a dataset over the axes and fill it from the records.
///
/// Returns `Ok(None)` when, after filling, zero parameters or zero
/// times ended up non-empty: the batch has nothing to contribute and
/// the caller decides whether that is acceptable.
pub fn assemble(
    axes: AxisSet,
    records: &[PreparedRecord],
    config: &AssemblyConfig,
    cache: &ReprojectionCache,
) -> Result<Option<Dataset>> {
    let bytes = axes.projected_bytes();
    if bytes > config.max_dataset_bytes {
        return Err(AssemblyError::DatasetTooLarge {
            times: axes.times.len(),
            levels: axes.levels.len(),
            parameters: axes.parameters.len(),
            nx: axes.grid.nx,
            ny: axes.grid.ny,
            bytes,
            limit: config.max_dataset_bytes,
        });
    }

    let len = axes.times.len() * axes.levels.len() * axes.parameters.len() * axes.grid.len();
    let mut dataset = Dataset {
        axes,
        data: vec![f32::NAN; len],
    };

    for record in records {
        let (Some(t), Some(l), Some(p)) = (
            dataset.axes.times.index_of(record.valid_time),
            dataset.axes.level_index(record.level.value),
            dataset.axes.param_index(record.param.id),
        ) else {
            continue;
        };

        // Tiles on a minority geometry are resampled onto the axis grid.
        let resampled;
        let field = if record.field.grid == dataset.axes.grid {
            &record.field
        } else {
            resampled = reproject(
                &record.field,
                &dataset.axes.grid,
                config.interpolation,
                cache,
            );
            &resampled
        };

        // First non-missing write wins; corrected reports overwrite.
        for row in 0..dataset.axes.grid.ny {
            for col in 0..dataset.axes.grid.nx {
                let v = field.get(col, row);
                if record.corrected {
                    if !v.is_nan() {
                        dataset.set(t, l, p, col, row, v);
                    }
                } else if dataset.get(t, l, p, col, row).is_nan() {
                    dataset.set(t, l, p, col, row, v);
                }
            }
        }
    }

    let nonempty_params = (0..dataset.axes.parameters.len())
        .filter(|p| dataset.parameter_nonempty(*p))
        .count();
    let nonempty_times = (0..dataset.axes.times.len())
        .filter(|t| dataset.time_nonempty(*t))
        .count();
    if nonempty_params == 0 || nonempty_times == 0 {
        info!(
            level_type = dataset.axes.level_type,
            "Assembled dataset is empty, nothing to contribute"
        );
        return Ok(None);
    }

    Ok(Some(dataset))
}
