//! Parameter identifiers and remap rules.

use crate::level::{Level, LevelMatch};
use serde::{Deserialize, Serialize};

/// Well-known parameter identifiers used by the derived-parameter stage.
pub mod params {
    /// Pressure (surface pressure when on a surface level)
    pub const PRESSURE: u16 = 1;
    /// Temperature
    pub const TEMPERATURE: u16 = 11;
    /// Specific humidity
    pub const SPECIFIC_HUMIDITY: u16 = 51;
    /// Relative humidity
    pub const RELATIVE_HUMIDITY: u16 = 52;
}

/// A meteorological parameter: numeric id plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
    pub id: u16,
    pub name: String,
}

impl Parameter {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Affine sample conversion applied by a remap rule: `base + scale * v`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineConversion {
    pub base: f32,
    pub scale: f32,
}

impl AffineConversion {
    pub fn apply(&self, v: f32) -> f32 {
        self.base + self.scale * v
    }
}

/// A single parameter remap rule.
///
/// Rewrites a source parameter id (optionally only at one matching
/// level) to a target id/name, with an optional affine sample
/// conversion and an optional forced surface output level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamRemap {
    /// Parameter id this rule applies to.
    pub source_id: u16,
    /// If set, the rule only applies to records at a matching level.
    pub level: Option<LevelMatch>,
    /// Replacement parameter id.
    pub target_id: u16,
    /// Replacement display name.
    pub target_name: String,
    /// Optional affine conversion applied to every sample.
    pub conversion: Option<AffineConversion>,
    /// When true, the record's level is replaced by the synthetic
    /// surface level.
    pub force_surface: bool,
}

impl ParamRemap {
    pub fn applies_to(&self, param_id: u16, level: Level) -> bool {
        if param_id != self.source_id {
            return false;
        }
        match &self.level {
            Some(m) => m.matches(level),
            None => true,
        }
    }
}

/// The full remap table for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemapTable {
    pub rules: Vec<ParamRemap>,
}

impl RemapTable {
    pub fn new(rules: Vec<ParamRemap>) -> Self {
        Self { rules }
    }

    /// First rule matching this parameter/level, if any.
    pub fn find(&self, param_id: u16, level: Level) -> Option<&ParamRemap> {
        self.rules.iter().find(|r| r.applies_to(param_id, level))
    }

    /// True if the table mentions this id as a remap source.
    pub fn mentions_source(&self, param_id: u16) -> bool {
        self.rules.iter().any(|r| r.source_id == param_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::level_types;

    fn kelvin_to_celsius() -> ParamRemap {
        ParamRemap {
            source_id: 11,
            level: None,
            target_id: 11,
            target_name: "temperature".to_string(),
            conversion: Some(AffineConversion {
                base: -273.15,
                scale: 1.0,
            }),
            force_surface: false,
        }
    }

    #[test]
    fn test_affine_conversion() {
        let conv = AffineConversion {
            base: -273.15,
            scale: 1.0,
        };
        assert!((conv.apply(273.15) - 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_rule_level_match() {
        let mut rule = kelvin_to_celsius();
        rule.level = Some(LevelMatch::AllOfType(level_types::ISOBARIC));

        assert!(rule.applies_to(11, Level::new(level_types::ISOBARIC, 500.0)));
        assert!(!rule.applies_to(11, Level::new(level_types::SURFACE, 0.0)));
        assert!(!rule.applies_to(12, Level::new(level_types::ISOBARIC, 500.0)));
    }

    #[test]
    fn test_table_lookup() {
        let table = RemapTable::new(vec![kelvin_to_celsius()]);
        assert!(table
            .find(11, Level::new(level_types::SURFACE, 0.0))
            .is_some());
        assert!(table
            .find(33, Level::new(level_types::SURFACE, 0.0))
            .is_none());
        assert!(table.mentions_source(11));
        assert!(!table.mentions_source(33));
    }
}
