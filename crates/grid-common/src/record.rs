//! The decoded record abstraction consumed by the assembly pipeline.
//!
//! A `DecodedRecord` is what an external wire-format decoder hands the
//! core: metadata, raw geometry parameters exposed as typed lookups by
//! name, and the raw 1-D sample array. The core never sees the wire
//! format itself.

use crate::error::SourceResult;
use crate::level::Level;
use crate::scan::ScanMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of projection families a record can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectionFamily {
    RegularLatLon,
    RotatedLatLon,
    Mercator,
    PolarStereographic,
    LambertConformal,
}

/// A raw geometry metadata value: integer, real, or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Real(f64),
    Str(String),
}

/// One decoded grid message.
///
/// Geometry parameters are carried as named fields; which names are
/// required depends on the projection family (see the geometry
/// resolver). Typed lookups return `None` when a field is absent, which
/// is the documented failure flag for missing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodedRecord {
    /// Parameter identifier.
    pub param_id: u16,
    /// Parameter display name.
    pub param_name: String,
    /// Vertical level type code.
    pub level_type: u8,
    /// Vertical level value.
    pub level_value: f64,
    /// Model run / reference time.
    pub origin_time: DateTime<Utc>,
    /// Time the field is valid for.
    pub valid_time: DateTime<Utc>,
    /// Wire missing-value sentinel, if the message declares one.
    pub missing_value: Option<f32>,
    /// Scanning order of the raw sample array.
    pub scan_mode: ScanMode,
    /// Projection family discriminant.
    pub family: ProjectionFamily,
    /// Raw geometry parameters, keyed by field name.
    pub geometry: BTreeMap<String, MetaValue>,
    /// Raw samples, length nx*ny (or sum of row lengths for reduced grids).
    pub values: Vec<f32>,
    /// Per-row sample counts for reduced grids.
    pub row_lengths: Option<Vec<usize>>,
    /// Vertical coefficient side channel, present on hybrid-level records.
    pub vertical_coefficients: Option<Vec<f64>>,
    /// Accumulation window in hours for cumulative parameters.
    pub accumulation_hours: Option<u32>,
    /// True for corrected/priority reports, which overwrite earlier writes.
    pub corrected: bool,
}

impl DecodedRecord {
    /// Integer geometry field lookup. `None` when absent or not an integer.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        match self.geometry.get(name) {
            Some(MetaValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Real geometry field lookup. Integer fields widen to real.
    pub fn real_field(&self, name: &str) -> Option<f64> {
        match self.geometry.get(name) {
            Some(MetaValue::Real(v)) => Some(*v),
            Some(MetaValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    /// String geometry field lookup.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        match self.geometry.get(name) {
            Some(MetaValue::Str(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn level(&self) -> Level {
        Level::new(self.level_type, self.level_value)
    }
}

/// A source of decoded records.
///
/// Yields records until exhausted (`Ok(None)`); decoder failures
/// surface as errors.
pub trait RecordSource {
    fn next_record(&mut self) -> SourceResult<Option<DecodedRecord>>;
}

/// A record source over an in-memory vector, used by tests and
/// synthetic pipelines.
pub struct VecSource {
    records: std::vec::IntoIter<DecodedRecord>,
}

impl VecSource {
    pub fn new(records: Vec<DecodedRecord>) -> Self {
        Self {
            records: records.into_iter(),
        }
    }
}

impl RecordSource for VecSource {
    fn next_record(&mut self) -> SourceResult<Option<DecodedRecord>> {
        Ok(self.records.next())
    }
}
