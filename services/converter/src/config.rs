//! Run configuration loading.
//!
//! The YAML run config is the only place strings are parsed; the
//! assembly core receives an already-typed `AssemblyConfig`.

use anyhow::{Context, Result};
use grid_assembly::{
    AccumulationSelect, AssemblyConfig, DeriveOptions, InterpolationMethod, ValidRange,
};
use grid_common::{BoundingBox, LevelFilter, ParamRemap, RemapTable};
use projection::{Grid, Projection, RegularLatLon};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A regular lat/lon target grid override, as written in the config.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetGridSpec {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub nx: usize,
    pub ny: usize,
}

impl TargetGridSpec {
    fn to_grid(&self) -> Grid {
        Grid::new(
            Projection::RegularLatLon(RegularLatLon::new(BoundingBox::new(
                self.west,
                self.south,
                self.east,
                self.north,
            ))),
            self.nx,
            self.ny,
        )
    }
}

/// The YAML run configuration. Every field is optional; omissions fall
/// back to the assembly defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub dateline_fix: bool,
    pub crop: Option<BoundingBox>,
    pub target_grid: Option<TargetGridSpec>,
    pub interpolation: InterpolationMethod,
    pub remap: Vec<ParamRemap>,
    pub levels: LevelFilter,
    pub remap_only_parameters: bool,
    pub accumulation: Option<AccumulationSelect>,
    pub stitch: bool,
    pub derive: DeriveOptions,
    pub max_dataset_bytes: Option<u64>,
    pub valid_ranges: HashMap<u16, ValidRange>,
    pub sequential_decode: bool,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn into_assembly_config(self) -> AssemblyConfig {
        let defaults = AssemblyConfig::default();
        AssemblyConfig {
            dateline_fix: self.dateline_fix,
            crop: self.crop,
            target_grid: self.target_grid.as_ref().map(TargetGridSpec::to_grid),
            interpolation: self.interpolation,
            remap: RemapTable::new(self.remap),
            levels: self.levels,
            remap_only_parameters: self.remap_only_parameters,
            accumulation: self.accumulation,
            stitch: self.stitch,
            derive: self.derive,
            max_dataset_bytes: self.max_dataset_bytes.unwrap_or(defaults.max_dataset_bytes),
            valid_ranges: self.valid_ranges,
            sequential_decode: self.sequential_decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: RunConfig = serde_yaml::from_str("{}").unwrap();
        let config = config.into_assembly_config();
        assert!(!config.dateline_fix);
        assert!(!config.stitch);
        assert_eq!(config.interpolation, InterpolationMethod::Bilinear);
        assert!(config.derive.hybrid_pressure);
    }

    #[test]
    fn test_full_config_round_trip() {
        let yaml = r#"
dateline_fix: true
stitch: true
interpolation: nearest
crop: { min_x: -10.0, min_y: 30.0, max_x: 30.0, max_y: 70.0 }
target_grid: { west: 0.0, south: 40.0, east: 20.0, north: 60.0, nx: 81, ny: 81 }
levels:
  rejected:
    - !AllOfType 103
  accepted_types: [1, 100, 105]
remap:
  - source_id: 61
    level: null
    target_id: 228
    target_name: total precipitation
    conversion: { base: 0.0, scale: 1000.0 }
    force_surface: false
accumulation: { hours: 3 }
max_dataset_bytes: 1048576
valid_ranges:
  11: { min: -100.0, max: 60.0 }
sequential_decode: true
derive: { hybrid_pressure: false, relative_humidity: true }
"#;
        let config: RunConfig = serde_yaml::from_str(yaml).unwrap();
        let config = config.into_assembly_config();

        assert!(config.dateline_fix);
        assert!(config.stitch);
        assert_eq!(config.interpolation, InterpolationMethod::Nearest);
        assert!(config.crop.is_some());
        let grid = config.target_grid.unwrap();
        assert_eq!((grid.nx, grid.ny), (81, 81));
        assert_eq!(config.remap.rules.len(), 1);
        assert_eq!(config.remap.rules[0].target_id, 228);
        assert_eq!(config.accumulation.unwrap().hours, 3);
        assert!(!config.accumulation.unwrap().complement);
        assert_eq!(config.max_dataset_bytes, 1_048_576);
        assert!(config.valid_ranges.contains_key(&11));
        assert!(config.sequential_decode);
        assert!(!config.derive.hybrid_pressure);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "stitch: true").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert!(config.stitch);
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let err = serde_yaml::from_str::<RunConfig>("no_such_option: 1").unwrap_err();
        assert!(err.to_string().contains("no_such_option"));
    }
}
