//! Vertical level types and level filtering.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// GRIB2-style vertical level type codes.
pub mod level_types {
    /// Surface level
    pub const SURFACE: u8 = 1;
    /// Isobaric (pressure) level
    pub const ISOBARIC: u8 = 100;
    /// Mean sea level
    pub const MSL: u8 = 101;
    /// Height above ground
    pub const HEIGHT_ABOVE_GROUND: u8 = 103;
    /// Hybrid model level (requires vertical coefficients for pressure)
    pub const HYBRID: u8 = 105;
    /// Entire atmosphere
    pub const ENTIRE_ATMOSPHERE: u8 = 200;
}

/// A vertical level: type code plus numeric value.
///
/// The value unit depends on the type (hPa for isobaric, meters for
/// height above ground, model level index for hybrid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub type_code: u8,
    pub value: f64,
}

impl Level {
    pub fn new(type_code: u8, value: f64) -> Self {
        Self { type_code, value }
    }

    /// The synthetic surface level used when a remap rule forces a
    /// parameter down to the surface.
    pub fn surface() -> Self {
        Self {
            type_code: level_types::SURFACE,
            value: 0.0,
        }
    }

    /// Bit pattern for use in hash keys and deduplication.
    pub fn key(&self) -> (u8, u64) {
        (self.type_code, self.value.to_bits())
    }
}

/// A single level match rule: one exact level, or every level of a type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LevelMatch {
    /// Match one exact (type, value) pair.
    Exact(Level),
    /// Match all levels of this type (wildcard).
    AllOfType(u8),
}

impl LevelMatch {
    pub fn matches(&self, level: Level) -> bool {
        match self {
            LevelMatch::Exact(l) => l.type_code == level.type_code && l.value == level.value,
            LevelMatch::AllOfType(t) => *t == level.type_code,
        }
    }
}

/// Level inclusion/exclusion policy applied during classification.
///
/// A record's level is accepted iff it is not rejected by any rule and,
/// when an allow-list of level types is configured, its type is listed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelFilter {
    /// Levels to drop, exact or whole-type wildcard.
    pub rejected: Vec<LevelMatch>,
    /// If set, only these level types are kept.
    pub accepted_types: Option<HashSet<u8>>,
}

impl LevelFilter {
    pub fn accepts(&self, level: Level) -> bool {
        if self.rejected.iter().any(|m| m.matches(level)) {
            return false;
        }
        match &self.accepted_types {
            Some(types) => types.contains(&level.type_code),
            None => true,
        }
    }
}
