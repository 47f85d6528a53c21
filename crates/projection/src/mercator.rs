//! Mercator projection.
//!
//! Standard Mercator with the scale true at a reference latitude, as
//! used by tropical-belt model output. World coordinates are meters.

use crate::EARTH_RADIUS;
use grid_common::BoundingBox;

/// Mercator projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    /// Covered area in meters.
    pub area: BoundingBox,
    /// Latitude at which the scale is true, degrees.
    pub ref_lat: f64,
}

impl Mercator {
    pub fn new(area: BoundingBox, ref_lat: f64) -> Self {
        Self { area, ref_lat }
    }

    /// Scale factor applied to both axes.
    fn k(&self) -> f64 {
        EARTH_RADIUS * self.ref_lat.to_radians().cos()
    }

    /// Project a geographic point to meters.
    ///
    /// Longitudes are unwrapped into the frame of the covered area so
    /// grids crossing the antimeridian stay continuous.
    pub fn world_from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        let k = self.k();
        let x = k * lon.to_radians();
        // Stay in the area's longitude frame (one world revolution is
        // 2*pi*k meters).
        let revolution = 2.0 * std::f64::consts::PI * k;
        let mut x = x;
        while x < self.area.min_x {
            x += revolution;
        }
        while x >= self.area.min_x + revolution {
            x -= revolution;
        }
        let y = k * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    pub fn geo_from_world(&self, x: f64, y: f64) -> (f64, f64) {
        let k = self.k();
        let lat = (2.0 * (y / k).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
        let mut lon = (x / k).to_degrees();
        while lon > 180.0 {
            lon -= 360.0;
        }
        while lon < -180.0 {
            lon += 360.0;
        }
        (lat, lon)
    }

    /// World coordinates of a grid corner given in geographic degrees.
    pub fn project_corner(ref_lat: f64, lat: f64, lon: f64) -> (f64, f64) {
        let k = EARTH_RADIUS * ref_lat.to_radians().cos();
        let x = k * lon.to_radians();
        let y = k * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }
}
