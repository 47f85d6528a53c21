//! Batch driver.
//!
//! Runs the per-record stages (resolve, normalize, transform) in
//! parallel, joins, then performs the whole-batch reductions: remap and
//! filters, optional tile stitching, axis discovery, assembly and the
//! derived-parameter pass. Rejected records are aggregated and counted,
//! never silently dropped.

use crate::classify::{apply_filters, apply_remap, build_axes, group_by_level_type};
use crate::config::AssemblyConfig;
use crate::dataset::{assemble, Dataset};
use crate::derive::{derive_hybrid_pressure, derive_relative_humidity, VerticalCoefficients};
use crate::error::{RejectReason, Result};
use crate::field::{Field, PreparedRecord};
use crate::normalize::normalize_field;
use crate::resolve::resolve_geometry;
use crate::stitch::stitch_tiles;
use crate::transform::{crop, reproject, ReprojectionCache};
use chrono::{DateTime, Utc};
use grid_common::{level_types, params, DecodedRecord, Parameter, RecordSource};
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

/// The result of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutput {
    /// One assembled dataset per level type that had anything to
    /// contribute.
    pub datasets: Vec<Dataset>,
    /// Rejected records with their in-source sequence index.
    pub rejected: Vec<(usize, RejectReason)>,
    /// Total records consumed, including rejected ones.
    pub record_count: usize,
}

/// The dataset assembly pipeline. One instance per run; the contained
/// reprojection cache is shared across all records and sources.
pub struct Pipeline<'a> {
    config: &'a AssemblyConfig,
    cache: ReprojectionCache,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a AssemblyConfig) -> Self {
        Self {
            config,
            cache: ReprojectionCache::new(),
        }
    }

    /// Run over a single record source.
    pub fn run(&self, source: &mut dyn RecordSource) -> Result<PipelineOutput> {
        let mut decoded = Vec::new();
        while let Some(record) = source.next_record()? {
            decoded.push(record);
        }
        self.run_records(decoded)
    }

    /// Run over an in-memory batch of decoded records.
    pub fn run_records(&self, records: Vec<DecodedRecord>) -> Result<PipelineOutput> {
        let (prepared, rejected) = self.prepare_batch(0, records);
        self.reduce(prepared, rejected)
    }

    /// Run over several sources, accumulating into one merged batch.
    ///
    /// Per-source conversion runs concurrently unless the configuration
    /// demands sequential decoding (required when the active decoder is
    /// not thread-safe); the whole-batch reduction happens once, after
    /// every source finished.
    pub fn run_sources(&self, sources: Vec<Box<dyn RecordSource + Send>>) -> Result<PipelineOutput> {
        let collector: Mutex<(Vec<PreparedRecord>, Vec<(usize, RejectReason)>)> =
            Mutex::new((Vec::new(), Vec::new()));

        let consume = |(source_idx, mut source): (usize, Box<dyn RecordSource + Send>)| -> Result<()> {
            let mut decoded = Vec::new();
            while let Some(record) = source.next_record()? {
                decoded.push(record);
            }
            let (prepared, rejected) = self.prepare_batch(source_idx, decoded);
            let mut guard = collector.lock().unwrap();
            guard.0.extend(prepared);
            guard.1.extend(rejected);
            Ok(())
        };

        if self.config.sequential_decode {
            for entry in sources.into_iter().enumerate() {
                consume(entry)?;
            }
        } else {
            sources
                .into_par_iter()
                .enumerate()
                .try_for_each(consume)?;
        }

        let (prepared, rejected) = collector.into_inner().unwrap();
        self.reduce(prepared, rejected)
    }

    /// Per-record work for one source: resolve, normalize, transform.
    /// Records are independent and run as parallel tasks.
    fn prepare_batch(
        &self,
        source_idx: usize,
        records: Vec<DecodedRecord>,
    ) -> (Vec<PreparedRecord>, Vec<(usize, RejectReason)>) {
        let results: Vec<std::result::Result<PreparedRecord, (usize, RejectReason)>> = records
            .into_par_iter()
            .enumerate()
            .map(|(seq, record)| {
                self.prepare_record(seq, &record)
                    .map_err(|reason| (seq, reason))
            })
            .collect();

        let mut prepared = Vec::new();
        let mut rejected = Vec::new();
        for result in results {
            match result {
                Ok(record) => prepared.push(record),
                Err((seq, reason)) => {
                    warn!(source = source_idx, seq, reason = %reason, "Record rejected");
                    rejected.push((seq, reason));
                }
            }
        }
        (prepared, rejected)
    }

    fn prepare_record(
        &self,
        seq: usize,
        record: &DecodedRecord,
    ) -> std::result::Result<PreparedRecord, RejectReason> {
        let resolved = resolve_geometry(record, self.config)?;
        let mut field = normalize_field(record, &resolved, self.config)?;

        if let Some(target) = &self.config.target_grid {
            field = reproject(&field, target, self.config.interpolation, &self.cache);
        } else if let Some(rect) = &self.config.crop {
            field = crop(&field, rect);
        }

        Ok(PreparedRecord {
            seq,
            param: Parameter::new(record.param_id, record.param_name.clone()),
            level: record.level(),
            origin_time: record.origin_time,
            valid_time: record.valid_time,
            accumulation_hours: record.accumulation_hours,
            corrected: record.corrected,
            vertical_coefficients: record.vertical_coefficients.clone(),
            field,
        })
    }

    /// The single-threaded whole-batch reduction, run after the join
    /// barrier.
    fn reduce(
        &self,
        mut records: Vec<PreparedRecord>,
        mut rejected: Vec<(usize, RejectReason)>,
    ) -> Result<PipelineOutput> {
        let record_count = records.len() + rejected.len();

        let remapped = apply_remap(&mut records, self.config)?;
        let (records, filter_rejects) = apply_filters(records, &remapped, self.config);
        for (seq, reason) in &filter_rejects {
            warn!(seq, reason = %reason, "Record rejected");
        }
        rejected.extend(filter_rejects);
        if !rejected.is_empty() {
            info!(
                rejected = rejected.len(),
                total = record_count,
                "Some records were rejected"
            );
        }

        // Side channels feeding the derived-parameter pass.
        let mut coeffs = VerticalCoefficients::new();
        for record in &records {
            if record.level.type_code == level_types::HYBRID {
                if let Some(table) = &record.vertical_coefficients {
                    coeffs.observe(record.level.value, table);
                }
            }
        }
        let mut surface_pressure: HashMap<DateTime<Utc>, Field> = HashMap::new();
        for record in &records {
            if record.level.type_code == level_types::SURFACE
                && record.param.id == params::PRESSURE
            {
                surface_pressure
                    .entry(record.valid_time)
                    .or_insert_with(|| record.field.clone());
            }
        }

        let mut datasets = Vec::new();
        for (level_type, group) in group_by_level_type(records) {
            let group = if self.config.stitch {
                stitch_tiles(group)
            } else {
                group
            };
            if group.is_empty() {
                continue;
            }

            let mut axes = build_axes(level_type, &group, self.config);
            if self.config.derive.hybrid_pressure
                && level_type == level_types::HYBRID
                && !coeffs.is_empty()
                && !surface_pressure.is_empty()
                && axes.param_index(params::PRESSURE).is_none()
            {
                axes.parameters.push(Parameter::new(params::PRESSURE, "pressure"));
            }
            if self.config.derive.relative_humidity
                && axes.param_index(params::TEMPERATURE).is_some()
                && axes.param_index(params::SPECIFIC_HUMIDITY).is_some()
                && (axes.param_index(params::PRESSURE).is_some()
                    || level_type == level_types::ISOBARIC)
                && axes.param_index(params::RELATIVE_HUMIDITY).is_none()
            {
                axes.parameters
                    .push(Parameter::new(params::RELATIVE_HUMIDITY, "relative humidity"));
            }

            let Some(mut dataset) = assemble(axes, &group, self.config, &self.cache)? else {
                continue;
            };

            if self.config.derive.hybrid_pressure && level_type == level_types::HYBRID {
                let on_grid: HashMap<DateTime<Utc>, Field> = surface_pressure
                    .iter()
                    .map(|(time, field)| {
                        let field = if field.grid == dataset.axes().grid {
                            field.clone()
                        } else {
                            reproject(
                                field,
                                &dataset.axes().grid,
                                self.config.interpolation,
                                &self.cache,
                            )
                        };
                        (*time, field)
                    })
                    .collect();
                derive_hybrid_pressure(&mut dataset, &coeffs, &on_grid);
            }
            if self.config.derive.relative_humidity {
                derive_relative_humidity(&mut dataset);
            }

            info!(
                level_type,
                times = dataset.axes().times.len(),
                levels = dataset.axes().levels.len(),
                parameters = dataset.axes().parameters.len(),
                "Assembled dataset"
            );
            datasets.push(dataset);
        }

        Ok(PipelineOutput {
            datasets,
            rejected,
            record_count,
        })
    }
}
