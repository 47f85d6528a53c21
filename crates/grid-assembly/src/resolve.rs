//! Grid geometry resolver.
//!
//! Turns a decoded record's raw geometry metadata into a `Grid`,
//! applying the per-family corner and sign conventions. Pure function
//! of the record and configuration.
//!
//! Required geometry fields by family (all records carry `ni`/`nj`):
//!
//! - regular lat/lon: `lat_first`, `lon_first`, `lat_last`, `lon_last`
//! - rotated lat/lon: as regular, plus `south_pole_lat`,
//!   `south_pole_lon`; `rotation_angle` is absent when the producer
//!   applies no extra rotation
//! - Mercator: `lat_first`, `lon_first`, `lat_last`, `lon_last`,
//!   `ref_lat`
//! - polar stereographic: `lat_first`, `lon_first`, `lon_orient`,
//!   `ref_lat`, `dx`, `dy`, `projection_center` (1 = south, unsupported)
//! - Lambert conformal: `lat_first`, `lon_first`, `lon_orient`,
//!   `latin1`, `latin2`, `dx`, `dy`

use crate::config::AssemblyConfig;
use crate::error::RejectReason;
use grid_common::{BoundingBox, DecodedRecord, ProjectionFamily};
use projection::{
    Grid, LambertConformal, Mercator, PolarStereographic, Projection, RegularLatLon, RotatedLatLon,
};

/// Tolerance for deciding that a longitude span touches 0/360.
const LON_EPS: f64 = 1e-6;

/// A resolved geometry plus the column half-swap flag the normalizer
/// must honor when the dateline fix relabeled the span.
#[derive(Debug, Clone)]
pub struct ResolvedGeometry {
    pub grid: Grid,
    pub dateline_swap: bool,
}

/// Resolve a record's geometry metadata into a `Grid`.
pub fn resolve_geometry(
    record: &DecodedRecord,
    config: &AssemblyConfig,
) -> Result<ResolvedGeometry, RejectReason> {
    let nx = int_field(record, "ni")? as usize;
    let ny = int_field(record, "nj")? as usize;

    match record.family {
        ProjectionFamily::RegularLatLon => {
            let (area, swap) = latlon_area(record, config, nx)?;
            Ok(ResolvedGeometry {
                grid: Grid::new(Projection::RegularLatLon(RegularLatLon::new(area)), nx, ny),
                dateline_swap: swap,
            })
        }
        ProjectionFamily::RotatedLatLon => {
            let (area, swap) = latlon_area(record, config, nx)?;
            let south_pole_lat = real_field(record, "south_pole_lat")?;
            let south_pole_lon = real_field(record, "south_pole_lon")?;
            let angle = record.real_field("rotation_angle").unwrap_or(0.0);
            Ok(ResolvedGeometry {
                grid: Grid::new(
                    Projection::RotatedLatLon(RotatedLatLon::new(
                        area,
                        south_pole_lat,
                        south_pole_lon,
                        angle,
                    )),
                    nx,
                    ny,
                ),
                dateline_swap: swap,
            })
        }
        ProjectionFamily::Mercator => {
            let ref_lat = real_field(record, "ref_lat")?;
            let (lat_a, lon_a, lat_b, lon_b) = corners(record)?;
            let (xa, ya) = Mercator::project_corner(ref_lat, lat_a, lon_a);
            let (xb, yb) = Mercator::project_corner(ref_lat, lat_b, lon_b);
            let area = world_box(xa, ya, xb, yb);
            Ok(ResolvedGeometry {
                grid: Grid::new(Projection::Mercator(Mercator::new(area, ref_lat)), nx, ny),
                dateline_swap: false,
            })
        }
        ProjectionFamily::PolarStereographic => {
            if int_field(record, "projection_center")? == 1 {
                return Err(RejectReason::SouthPoleUnsupported);
            }
            let lon_orient = real_field(record, "lon_orient")?;
            let ref_lat = real_field(record, "ref_lat")?;
            let area = first_corner_box(record, nx, ny, |lat, lon| {
                PolarStereographic::project(lon_orient, ref_lat, lat, lon)
            })?;
            let proj = PolarStereographic::new(area, lon_orient, ref_lat, false)
                .map_err(|_| RejectReason::SouthPoleUnsupported)?;
            Ok(ResolvedGeometry {
                grid: Grid::new(Projection::PolarStereographic(proj), nx, ny),
                dateline_swap: false,
            })
        }
        ProjectionFamily::LambertConformal => {
            let lon_orient = real_field(record, "lon_orient")?;
            let latin1 = real_field(record, "latin1")?;
            let latin2 = real_field(record, "latin2")?;
            let area = first_corner_box(record, nx, ny, |lat, lon| {
                LambertConformal::project(lon_orient, latin1, latin2, lat, lon)
            })?;
            Ok(ResolvedGeometry {
                grid: Grid::new(
                    Projection::LambertConformal(LambertConformal::new(
                        area, lon_orient, latin1, latin2,
                    )),
                    nx,
                    ny,
                ),
                dateline_swap: false,
            })
        }
    }
}

fn int_field(record: &DecodedRecord, name: &'static str) -> Result<i64, RejectReason> {
    record
        .int_field(name)
        .ok_or(RejectReason::IncompleteGeometry { field: name })
}

fn real_field(record: &DecodedRecord, name: &'static str) -> Result<f64, RejectReason> {
    record
        .real_field(name)
        .ok_or(RejectReason::IncompleteGeometry { field: name })
}

fn corners(record: &DecodedRecord) -> Result<(f64, f64, f64, f64), RejectReason> {
    Ok((
        real_field(record, "lat_first")?,
        real_field(record, "lon_first")?,
        real_field(record, "lat_last")?,
        real_field(record, "lon_last")?,
    ))
}

fn world_box(xa: f64, ya: f64, xb: f64, yb: f64) -> BoundingBox {
    BoundingBox::new(xa.min(xb), ya.min(yb), xa.max(xb), ya.max(yb))
}

/// Geographic corner conventions for the lat/lon families.
///
/// Scan direction decides which corner is west/south; a span whose east
/// end wraps past 360 keeps a continuous east > west representation.
/// The "antimeridian view" (whole span at or beyond 180) is relabeled
/// into -180..180 without moving data; the 0/360 dateline fix relabels
/// AND flags a column half-swap.
fn latlon_area(
    record: &DecodedRecord,
    config: &AssemblyConfig,
    nx: usize,
) -> Result<(BoundingBox, bool), RejectReason> {
    let (lat_first, lon_first, lat_last, lon_last) = corners(record)?;

    let (mut west, mut east) = if record.scan_mode.i_negative {
        (lon_last, lon_first)
    } else {
        (lon_first, lon_last)
    };
    if east < west {
        east += 360.0;
    }

    let (south, north) = if record.scan_mode.j_positive {
        (lat_first, lat_last)
    } else {
        (lat_last, lat_first)
    };

    let dx = if nx > 1 {
        (east - west) / (nx - 1) as f64
    } else {
        0.0
    };

    let mut swap = false;
    if config.dateline_fix && west.abs() < LON_EPS && (east + dx - 360.0).abs() < dx / 2.0 + LON_EPS
    {
        // 0..360 span: relabel to -180..180. The matching data motion
        // (left/right column half-swap) is done by the normalizer and
        // needs an even column count.
        if nx % 2 == 0 {
            west -= 180.0;
            east -= 180.0;
            swap = true;
        }
    } else if west >= 180.0 {
        // Antimeridian view: the whole span sits past 180, relabel only.
        west -= 360.0;
        east -= 360.0;
    }

    Ok((BoundingBox::new(west, south, east, north), swap))
}

/// World box for the conformal families: project the first grid point,
/// then extend by grid spacing according to the scan direction.
fn first_corner_box(
    record: &DecodedRecord,
    nx: usize,
    ny: usize,
    project: impl Fn(f64, f64) -> (f64, f64),
) -> Result<BoundingBox, RejectReason> {
    let lat_first = real_field(record, "lat_first")?;
    let lon_first = real_field(record, "lon_first")?;
    let dx = real_field(record, "dx")?;
    let dy = real_field(record, "dy")?;

    let (x_first, y_first) = project(lat_first, lon_first);
    let width = (nx.max(2) - 1) as f64 * dx;
    let height = (ny.max(2) - 1) as f64 * dy;

    let (min_x, max_x) = if record.scan_mode.i_negative {
        (x_first - width, x_first)
    } else {
        (x_first, x_first + width)
    };
    let (min_y, max_y) = if record.scan_mode.j_positive {
        (y_first, y_first + height)
    } else {
        (y_first - height, y_first)
    };

    Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use grid_common::{MetaValue, ScanMode};
    use std::collections::BTreeMap;

    fn latlon_record(fields: &[(&str, MetaValue)], scan: ScanMode) -> DecodedRecord {
        let mut geometry = BTreeMap::new();
        for (k, v) in fields {
            geometry.insert(k.to_string(), v.clone());
        }
        DecodedRecord {
            param_id: 11,
            param_name: "temperature".to_string(),
            level_type: 1,
            level_value: 0.0,
            origin_time: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            valid_time: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            missing_value: None,
            scan_mode: scan,
            family: ProjectionFamily::RegularLatLon,
            geometry,
            values: Vec::new(),
            row_lengths: None,
            vertical_coefficients: None,
            accumulation_hours: None,
            corrected: false,
        }
    }

    fn basic_fields(
        ni: i64,
        nj: i64,
        lat_first: f64,
        lon_first: f64,
        lat_last: f64,
        lon_last: f64,
    ) -> Vec<(&'static str, MetaValue)> {
        vec![
            ("ni", MetaValue::Int(ni)),
            ("nj", MetaValue::Int(nj)),
            ("lat_first", MetaValue::Real(lat_first)),
            ("lon_first", MetaValue::Real(lon_first)),
            ("lat_last", MetaValue::Real(lat_last)),
            ("lon_last", MetaValue::Real(lon_last)),
        ]
    }

    #[test]
    fn test_standard_scan_corners() {
        // North-to-south scan: first point is the NW corner.
        let record = latlon_record(
            &basic_fields(5, 3, 60.0, 0.0, 40.0, 20.0),
            ScanMode::standard(),
        );
        let resolved = resolve_geometry(&record, &AssemblyConfig::default()).unwrap();

        let area = *resolved.grid.projection.area();
        assert_eq!(area, BoundingBox::new(0.0, 40.0, 20.0, 60.0));
        assert_eq!(resolved.grid.nx, 5);
        assert_eq!(resolved.grid.ny, 3);
        assert!(!resolved.dateline_swap);
    }

    #[test]
    fn test_decreasing_i_swaps_corners() {
        let mut scan = ScanMode::standard();
        scan.i_negative = true;
        let record = latlon_record(&basic_fields(5, 3, 60.0, 20.0, 40.0, 0.0), scan);
        let resolved = resolve_geometry(&record, &AssemblyConfig::default()).unwrap();

        let area = *resolved.grid.projection.area();
        assert_eq!(area, BoundingBox::new(0.0, 40.0, 20.0, 60.0));
    }

    #[test]
    fn test_missing_field_is_incomplete_geometry() {
        let record = latlon_record(
            &[("ni", MetaValue::Int(5)), ("nj", MetaValue::Int(3))],
            ScanMode::standard(),
        );
        let err = resolve_geometry(&record, &AssemblyConfig::default()).unwrap_err();
        assert_eq!(err, RejectReason::IncompleteGeometry { field: "lat_first" });
    }

    #[test]
    fn test_dateline_fix_relabels_global_span() {
        // Global 0..360 grid at 1 degree: corner-inclusive east edge 359.
        let record = latlon_record(
            &basic_fields(360, 181, 90.0, 0.0, -90.0, 359.0),
            ScanMode::standard(),
        );
        let config = AssemblyConfig {
            dateline_fix: true,
            ..AssemblyConfig::default()
        };
        let resolved = resolve_geometry(&record, &config).unwrap();

        let area = *resolved.grid.projection.area();
        assert_eq!(area.min_x, -180.0);
        assert_eq!(area.max_x, 179.0);
        assert!(resolved.dateline_swap);
    }

    #[test]
    fn test_dateline_fix_off_keeps_span() {
        let record = latlon_record(
            &basic_fields(360, 181, 90.0, 0.0, -90.0, 359.0),
            ScanMode::standard(),
        );
        let resolved = resolve_geometry(&record, &AssemblyConfig::default()).unwrap();
        assert_eq!(resolved.grid.projection.area().min_x, 0.0);
        assert!(!resolved.dateline_swap);
    }

    #[test]
    fn test_antimeridian_view_relabeled() {
        // Span 180..200 relabels to -180..-160 with no data motion.
        let record = latlon_record(
            &basic_fields(3, 3, 10.0, 180.0, 0.0, 200.0),
            ScanMode::standard(),
        );
        let resolved = resolve_geometry(&record, &AssemblyConfig::default()).unwrap();

        let area = *resolved.grid.projection.area();
        assert_eq!(area.min_x, -180.0);
        assert_eq!(area.max_x, -160.0);
        assert!(!resolved.dateline_swap);
    }

    #[test]
    fn test_straddling_span_stays_continuous() {
        // 170..(-170) wraps: kept as 170..190.
        let record = latlon_record(
            &basic_fields(3, 3, 10.0, 170.0, 0.0, -170.0),
            ScanMode::standard(),
        );
        let resolved = resolve_geometry(&record, &AssemblyConfig::default()).unwrap();

        let area = *resolved.grid.projection.area();
        assert_eq!(area.min_x, 170.0);
        assert_eq!(area.max_x, 190.0);
    }

    #[test]
    fn test_south_pole_polar_fails_fast() {
        let mut record = latlon_record(
            &[
                ("ni", MetaValue::Int(10)),
                ("nj", MetaValue::Int(10)),
                ("lat_first", MetaValue::Real(-30.0)),
                ("lon_first", MetaValue::Real(0.0)),
                ("lon_orient", MetaValue::Real(0.0)),
                ("ref_lat", MetaValue::Real(-60.0)),
                ("dx", MetaValue::Real(25000.0)),
                ("dy", MetaValue::Real(25000.0)),
                ("projection_center", MetaValue::Int(1)),
            ],
            ScanMode::standard(),
        );
        record.family = ProjectionFamily::PolarStereographic;
        let err = resolve_geometry(&record, &AssemblyConfig::default()).unwrap_err();
        assert_eq!(err, RejectReason::SouthPoleUnsupported);
    }

    #[test]
    fn test_lambert_box_from_first_corner() {
        let mut scan = ScanMode::standard();
        scan.j_positive = true;
        let mut record = latlon_record(
            &[
                ("ni", MetaValue::Int(100)),
                ("nj", MetaValue::Int(50)),
                ("lat_first", MetaValue::Real(21.138123)),
                ("lon_first", MetaValue::Real(-122.719528)),
                ("lon_orient", MetaValue::Real(-97.5)),
                ("latin1", MetaValue::Real(38.5)),
                ("latin2", MetaValue::Real(38.5)),
                ("dx", MetaValue::Real(3000.0)),
                ("dy", MetaValue::Real(3000.0)),
            ],
            scan,
        );
        record.family = ProjectionFamily::LambertConformal;
        let resolved = resolve_geometry(&record, &AssemblyConfig::default()).unwrap();

        let area = *resolved.grid.projection.area();
        assert!((area.width() - 99.0 * 3000.0).abs() < 1e-6);
        assert!((area.height() - 49.0 * 3000.0).abs() < 1e-6);
        // First point scans south to north: it is the SW corner.
        let (i, j) = resolved.grid.geo_to_grid(21.138123, -122.719528);
        assert!(i.abs() < 0.1 && j.abs() < 0.1, "i = {}, j = {}", i, j);
    }
}
