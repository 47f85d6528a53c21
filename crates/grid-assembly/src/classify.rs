//! Record classifier and axis builder.
//!
//! Whole-batch reduction over the prepared records: remap application,
//! inclusion/exclusion filters, then per-level-type axis discovery.
//! The step order matters and follows the batch driver's calls: remap,
//! filter, group, (optional stitch in between), axes.

use crate::config::AssemblyConfig;
use crate::dataset::AxisSet;
use crate::error::{AssemblyError, RejectReason, Result};
use crate::field::PreparedRecord;
use grid_common::{sanity_cutoff, Level, Parameter, TimeAxis};
use projection::Grid;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Apply the remap table to every record, in place.
///
/// Returns one flag per record telling whether a rule applied (the
/// remap-only parameter policy needs it). Fails the whole run on a
/// remap conflict: a parameter id appearing both as an applied remap
/// target and as an unmodified original would corrupt two unrelated
/// parameter axes.
pub fn apply_remap(records: &mut [PreparedRecord], config: &AssemblyConfig) -> Result<Vec<bool>> {
    let mut remapped = vec![false; records.len()];
    let mut targets: HashSet<u16> = HashSet::new();
    let mut originals: HashSet<u16> = HashSet::new();

    for (record, flag) in records.iter_mut().zip(remapped.iter_mut()) {
        match config.remap.find(record.param.id, record.level) {
            Some(rule) => {
                record.param = Parameter::new(rule.target_id, rule.target_name.clone());
                if let Some(conv) = &rule.conversion {
                    for v in &mut record.field.data {
                        if !v.is_nan() {
                            *v = conv.apply(*v);
                        }
                    }
                }
                if rule.force_surface {
                    record.level = Level::surface();
                }
                targets.insert(rule.target_id);
                *flag = true;
            }
            None => {
                originals.insert(record.param.id);
            }
        }
    }

    if let Some(id) = targets.intersection(&originals).min() {
        return Err(AssemblyError::RemapConflict { id: *id });
    }
    Ok(remapped)
}

/// Apply the inclusion/exclusion filters.
///
/// Returns the surviving records plus the rejections (sequence index
/// and reason) for aggregation; nothing is dropped without a count.
pub fn apply_filters(
    records: Vec<PreparedRecord>,
    remapped: &[bool],
    config: &AssemblyConfig,
) -> (Vec<PreparedRecord>, Vec<(usize, RejectReason)>) {
    let cutoff = sanity_cutoff();
    let mut kept = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for (record, was_remapped) in records.into_iter().zip(remapped.iter().copied()) {
        let reason = if record.field.grid.nx <= 2 && record.field.grid.ny <= 2 {
            Some(RejectReason::DegenerateTile)
        } else if record.valid_time < cutoff {
            Some(RejectReason::ImplausibleTime)
        } else if !config.levels.accepts(record.level) {
            Some(RejectReason::RejectedLevel)
        } else if config.remap_only_parameters && !was_remapped {
            Some(RejectReason::FilteredParameter)
        } else if let (Some(select), Some(hours)) = (&config.accumulation, record.accumulation_hours)
        {
            if (hours == select.hours) != select.complement {
                None
            } else {
                Some(RejectReason::AccumulationWindow)
            }
        } else {
            None
        };

        match reason {
            Some(reason) => rejected.push((record.seq, reason)),
            None => kept.push(record),
        }
    }

    (kept, rejected)
}

/// Group the surviving records by level type, in first-seen order.
pub fn group_by_level_type(records: Vec<PreparedRecord>) -> Vec<(u8, Vec<PreparedRecord>)> {
    let mut order: Vec<u8> = Vec::new();
    let mut groups: HashMap<u8, Vec<PreparedRecord>> = HashMap::new();
    for record in records {
        let key = record.level.type_code;
        if !groups.contains_key(&key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(record);
    }
    order
        .into_iter()
        .map(|k| {
            let records = groups.remove(&k).unwrap_or_default();
            (k, records)
        })
        .collect()
}

/// Discover the axes of one level-type group.
///
/// Times and levels are deduplicated and sorted; the geometry is the
/// configured target grid if any, otherwise the most frequent tile
/// geometry (first seen wins a tie); parameters are deduplicated in
/// first-seen order. Uniformly spaced time lists collapse to a range.
pub fn build_axes(level_type: u8, records: &[PreparedRecord], config: &AssemblyConfig) -> AxisSet {
    let mut times: Vec<_> = records.iter().map(|r| r.valid_time).collect();
    times.sort();
    times.dedup();

    let mut levels: Vec<f64> = Vec::new();
    for record in records {
        if !levels.iter().any(|l| *l == record.level.value) {
            levels.push(record.level.value);
        }
    }
    levels.sort_by(|a, b| a.total_cmp(b));

    let grid = match &config.target_grid {
        Some(grid) => grid.clone(),
        None => most_popular_grid(records),
    };

    let mut parameters: Vec<Parameter> = Vec::new();
    for record in records {
        if !parameters.iter().any(|p| p.id == record.param.id) {
            parameters.push(record.param.clone());
        }
    }

    debug!(
        level_type,
        times = times.len(),
        levels = levels.len(),
        parameters = parameters.len(),
        "Discovered axes"
    );

    AxisSet {
        level_type,
        times: TimeAxis::from_times(times),
        levels,
        parameters,
        grid,
    }
}

/// The tile geometry occurring most often in the group; ties go to the
/// geometry seen first. The group is never empty.
fn most_popular_grid(records: &[PreparedRecord]) -> Grid {
    let mut counts: HashMap<&Grid, usize> = HashMap::new();
    for record in records {
        *counts.entry(&record.field.grid).or_insert(0) += 1;
    }

    let mut best = &records[0].field.grid;
    let mut best_count = counts[best];
    for record in records {
        let count = counts[&record.field.grid];
        if count > best_count {
            best = &record.field.grid;
            best_count = count;
        }
    }
    best.clone()
}
