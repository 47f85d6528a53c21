//! Polar stereographic projection (north pole only).

use crate::error::ProjectionError;
use crate::EARTH_RADIUS;
use grid_common::BoundingBox;

/// North-pole polar stereographic projection parameters.
///
/// World coordinates are meters in the projection plane; x points along
/// `lon_orient + 90`, y from the image of `lon_orient` toward the pole.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarStereographic {
    /// Covered area in meters.
    pub area: BoundingBox,
    /// Orientation longitude (the meridian parallel to the y axis), degrees.
    pub lon_orient: f64,
    /// Latitude at which the scale is true, degrees.
    pub ref_lat: f64,
}

impl PolarStereographic {
    /// Create a new projection. A south-pole projection center is
    /// explicitly unsupported and fails fast.
    pub fn new(
        area: BoundingBox,
        lon_orient: f64,
        ref_lat: f64,
        south_pole_center: bool,
    ) -> Result<Self, ProjectionError> {
        if south_pole_center {
            return Err(ProjectionError::SouthPoleUnsupported);
        }
        Ok(Self {
            area,
            lon_orient,
            ref_lat,
        })
    }

    /// Scale factor making the projection true at `ref_lat`.
    fn k0(ref_lat: f64) -> f64 {
        (1.0 + ref_lat.to_radians().sin()) / 2.0
    }

    pub fn world_from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        Self::project(self.lon_orient, self.ref_lat, lat, lon)
    }

    pub fn geo_from_world(&self, x: f64, y: f64) -> (f64, f64) {
        let k0 = Self::k0(self.ref_lat);
        let r = (x * x + y * y).sqrt();
        let lat = (std::f64::consts::FRAC_PI_2 - 2.0 * (r / (2.0 * EARTH_RADIUS * k0)).atan())
            .to_degrees();
        let mut lon = self.lon_orient + x.atan2(-y).to_degrees();
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        (lat, lon)
    }

    /// World coordinates of a grid corner given in geographic degrees.
    pub fn project(lon_orient: f64, ref_lat: f64, lat: f64, lon: f64) -> (f64, f64) {
        let k0 = Self::k0(ref_lat);
        let r = 2.0 * EARTH_RADIUS * k0 * (std::f64::consts::FRAC_PI_4 - lat.to_radians() / 2.0).tan();
        let theta = (lon - lon_orient).to_radians();
        (r * theta.sin(), -r * theta.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_south_pole_center_fails_fast() {
        let area = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let err = PolarStereographic::new(area, 0.0, 60.0, true).unwrap_err();
        assert_eq!(err, ProjectionError::SouthPoleUnsupported);
    }

    #[test]
    fn test_pole_maps_to_origin() {
        let (x, y) = PolarStereographic::project(-80.0, 60.0, 90.0, 0.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip() {
        let (x0, y0) = PolarStereographic::project(-80.0, 60.0, 30.0, -120.0);
        let (x1, y1) = PolarStereographic::project(-80.0, 60.0, 60.0, -40.0);
        let area = BoundingBox::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1));
        let proj = PolarStereographic::new(area, -80.0, 60.0, false).unwrap();

        let (x, y) = proj.world_from_geo(45.0, -100.0);
        let (lat, lon) = proj.geo_from_world(x, y);
        assert!((lat - 45.0).abs() < 1e-6, "lat = {}", lat);
        assert!((lon + 100.0).abs() < 1e-6, "lon = {}", lon);
    }
}
