//! Synthetic decoded-record builders for tests.

use chrono::{DateTime, TimeZone, Utc};
use grid_common::{BoundingBox, DecodedRecord, MetaValue, ProjectionFamily, ScanMode};
use projection::{Grid, Projection, RegularLatLon};
use std::collections::BTreeMap;

/// A regular lat/lon grid over the given corners.
pub fn latlon_grid(west: f64, south: f64, east: f64, north: f64, nx: usize, ny: usize) -> Grid {
    Grid::new(
        Projection::RegularLatLon(RegularLatLon::new(BoundingBox::new(
            west, south, east, north,
        ))),
        nx,
        ny,
    )
}

/// The reference time most tests use.
pub fn test_time(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).unwrap()
}

/// Builder for synthetic lat/lon records.
///
/// Defaults: temperature (id 11) at the surface, valid at the test
/// reference time, canonical west-to-east / south-to-north scan, and a
/// predictable counting sample pattern.
pub struct RecordBuilder {
    record: DecodedRecord,
}

impl RecordBuilder {
    pub fn latlon(west: f64, south: f64, east: f64, north: f64, nx: usize, ny: usize) -> Self {
        let mut geometry = BTreeMap::new();
        geometry.insert("ni".to_string(), MetaValue::Int(nx as i64));
        geometry.insert("nj".to_string(), MetaValue::Int(ny as i64));
        geometry.insert("lat_first".to_string(), MetaValue::Real(south));
        geometry.insert("lon_first".to_string(), MetaValue::Real(west));
        geometry.insert("lat_last".to_string(), MetaValue::Real(north));
        geometry.insert("lon_last".to_string(), MetaValue::Real(east));

        Self {
            record: DecodedRecord {
                param_id: 11,
                param_name: "temperature".to_string(),
                level_type: grid_common::level_types::SURFACE,
                level_value: 0.0,
                origin_time: test_time(0),
                valid_time: test_time(0),
                missing_value: None,
                scan_mode: ScanMode::south_to_north(),
                family: ProjectionFamily::RegularLatLon,
                geometry,
                values: (0..nx * ny).map(|v| v as f32).collect(),
                row_lengths: None,
                vertical_coefficients: None,
                accumulation_hours: None,
                corrected: false,
            },
        }
    }

    pub fn param(mut self, id: u16, name: &str) -> Self {
        self.record.param_id = id;
        self.record.param_name = name.to_string();
        self
    }

    pub fn level(mut self, type_code: u8, value: f64) -> Self {
        self.record.level_type = type_code;
        self.record.level_value = value;
        self
    }

    pub fn valid_time(mut self, t: DateTime<Utc>) -> Self {
        self.record.valid_time = t;
        self
    }

    pub fn values(mut self, values: Vec<f32>) -> Self {
        self.record.values = values;
        self
    }

    pub fn uniform(mut self, value: f32) -> Self {
        for v in &mut self.record.values {
            *v = value;
        }
        self
    }

    pub fn scan(mut self, mode: ScanMode) -> Self {
        self.record.scan_mode = mode;
        self
    }

    pub fn missing_value(mut self, sentinel: f32) -> Self {
        self.record.missing_value = Some(sentinel);
        self
    }

    pub fn corrected(mut self) -> Self {
        self.record.corrected = true;
        self
    }

    pub fn accumulation(mut self, hours: u32) -> Self {
        self.record.accumulation_hours = Some(hours);
        self
    }

    pub fn coefficients(mut self, table: Vec<f64>) -> Self {
        self.record.vertical_coefficients = Some(table);
        self
    }

    pub fn geometry_field(mut self, name: &str, value: MetaValue) -> Self {
        self.record.geometry.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> DecodedRecord {
        self.record
    }
}
