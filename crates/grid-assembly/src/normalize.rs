//! Value field normalizer.
//!
//! Turns a record's raw 1-D sample array into a `Field` in canonical
//! orientation (row 0 southernmost, column 0 westernmost), replaces the
//! wire missing-value sentinel with the internal marker, reconstructs
//! reduced grids, and applies the dateline column half-swap when the
//! resolver flagged it.

use crate::config::AssemblyConfig;
use crate::error::RejectReason;
use crate::field::Field;
use crate::interpolate::resample_row;
use crate::resolve::ResolvedGeometry;
use grid_common::DecodedRecord;
use tracing::warn;

/// Relative tolerance for sentinel matching; float sentinels carry
/// rounding noise after unpacking.
const SENTINEL_RTOL: f32 = 1e-6;

fn matches_sentinel(v: f32, sentinel: f32) -> bool {
    if v == sentinel {
        return true;
    }
    (v - sentinel).abs() <= sentinel.abs() * SENTINEL_RTOL + f32::EPSILON
}

/// Normalize a record's samples onto its resolved grid.
pub fn normalize_field(
    record: &DecodedRecord,
    resolved: &ResolvedGeometry,
    config: &AssemblyConfig,
) -> Result<Field, RejectReason> {
    if record.scan_mode.alternating_rows {
        return Err(RejectReason::UnsupportedScanOrder);
    }

    let nx = resolved.grid.nx;
    let ny = resolved.grid.ny;

    // Reduced grids: rebuild each row at native length, then resample
    // to the declared row length. Row order on the wire still follows
    // the scan mode, which is applied afterwards.
    let samples: Vec<f32> = match &record.row_lengths {
        Some(row_lengths) => {
            if record.scan_mode.j_consecutive {
                return Err(RejectReason::UnsupportedScanOrder);
            }
            if row_lengths.len() != ny {
                return Err(RejectReason::SampleCountMismatch {
                    expected: ny,
                    actual: row_lengths.len(),
                });
            }
            let mut out = Vec::with_capacity(nx * ny);
            let mut offset = 0usize;
            for (row, &len) in row_lengths.iter().enumerate() {
                if len == 0 {
                    return Err(RejectReason::EmptyRow { row });
                }
                if offset + len > record.values.len() {
                    return Err(RejectReason::SampleCountMismatch {
                        expected: offset + len,
                        actual: record.values.len(),
                    });
                }
                out.extend(resample_row(&record.values[offset..offset + len], nx));
                offset += len;
            }
            out
        }
        None => {
            if record.values.len() != nx * ny {
                return Err(RejectReason::SampleCountMismatch {
                    expected: nx * ny,
                    actual: record.values.len(),
                });
            }
            record.values.clone()
        }
    };

    // Orientation fix plus sentinel replacement in one pass.
    let valid_range = config.valid_ranges.get(&record.param_id);
    let mut out_of_range = 0usize;
    let mut data = vec![f32::NAN; nx * ny];
    for (k, &v) in samples.iter().enumerate() {
        let (col, row) = record.scan_mode.destination(k, nx, ny);
        let v = match record.missing_value {
            Some(sentinel) if matches_sentinel(v, sentinel) => f32::NAN,
            _ => v,
        };
        let v = match valid_range {
            Some(range) if !v.is_nan() && !range.is_valid(v) => {
                out_of_range += 1;
                f32::NAN
            }
            _ => v,
        };
        data[row * nx + col] = v;
    }

    if out_of_range > 0 && out_of_range * 1000 > samples.len() {
        warn!(
            param = record.param_id,
            out_of_range,
            total = samples.len(),
            "Samples outside the configured valid range were dropped"
        );
    }

    let mut field = Field::new(resolved.grid.clone(), data);

    // Dateline relabel: rotate the field 180 degrees in longitude by
    // swapping the left and right column halves. Runs after orientation
    // fixing and before any crop or reprojection.
    if resolved.dateline_swap {
        swap_column_halves(&mut field);
    }

    Ok(field)
}

/// Left/right half-swap of the matrix columns; its own inverse.
fn swap_column_halves(field: &mut Field) {
    let nx = field.grid.nx;
    let ny = field.grid.ny;
    let half = nx / 2;
    for row in 0..ny {
        let base = row * nx;
        for col in 0..half {
            field.data.swap(base + col, base + col + half);
        }
    }
}
