//! Lambert Conformal Conic projection.
//!
//! Maps a cone tangent or secant to the Earth's surface onto a flat
//! plane. Used by many regional model grids. World coordinates are
//! meters in the projection plane.

use crate::EARTH_RADIUS;
use grid_common::BoundingBox;
use std::f64::consts::PI;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LambertConformal {
    /// Covered area in meters.
    pub area: BoundingBox,
    /// Central meridian (LoV), degrees.
    pub lon0: f64,
    /// First standard parallel, degrees.
    pub latin1: f64,
    /// Second standard parallel, degrees (equal to latin1 for a tangent cone).
    pub latin2: f64,
}

/// Derived cone constants, recomputed from the defining parameters so
/// that projection equality stays structural.
struct Cone {
    n: f64,
    f: f64,
    rho0: f64,
}

impl LambertConformal {
    pub fn new(area: BoundingBox, lon0: f64, latin1: f64, latin2: f64) -> Self {
        Self {
            area,
            lon0,
            latin1,
            latin2,
        }
    }

    fn cone(latin1_deg: f64, latin2_deg: f64) -> Cone {
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            // Tangent cone (single standard parallel)
            latin1.sin()
        } else {
            // Secant cone (two standard parallels)
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = EARTH_RADIUS * f / (PI / 4.0 + latin1 / 2.0).tan().powf(n);

        Cone { n, f, rho0 }
    }

    fn normalize(mut dlon: f64) -> f64 {
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }
        dlon
    }

    pub fn world_from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        Self::project(self.lon0, self.latin1, self.latin2, lat, lon)
    }

    pub fn geo_from_world(&self, x: f64, y: f64) -> (f64, f64) {
        let cone = Self::cone(self.latin1, self.latin2);

        let rho = (x * x + (cone.rho0 - y) * (cone.rho0 - y)).sqrt();
        let rho = if cone.n < 0.0 { -rho } else { rho };
        let theta = (x / (cone.rho0 - y)).atan();

        let lat = 2.0 * ((EARTH_RADIUS * cone.f / rho).powf(1.0 / cone.n)).atan() - PI / 2.0;
        let lon = self.lon0.to_radians() + theta / cone.n;

        (lat.to_degrees(), Self::normalize(lon).to_degrees())
    }

    /// World coordinates of a grid corner given in geographic degrees.
    pub fn project(lon0: f64, latin1: f64, latin2: f64, lat: f64, lon: f64) -> (f64, f64) {
        let cone = Self::cone(latin1, latin2);

        let dlon = Self::normalize((lon - lon0).to_radians());
        let rho = EARTH_RADIUS * cone.f / (PI / 4.0 + lat.to_radians() / 2.0).tan().powf(cone.n);
        let theta = cone.n * dlon;

        (rho * theta.sin(), cone.rho0 - rho * theta.cos())
    }
}
