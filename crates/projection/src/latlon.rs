//! Regular and rotated latitude/longitude grids.

use grid_common::BoundingBox;

/// Bring a longitude into the continuous frame `[min, min + 360)`.
///
/// Grids spanning the antimeridian keep a continuous representation
/// with east longitudes above 180; incoming geographic longitudes must
/// be shifted into that frame before index arithmetic.
pub(crate) fn wrap_lon(lon: f64, min: f64) -> f64 {
    let mut l = lon;
    while l < min {
        l += 360.0;
    }
    while l >= min + 360.0 {
        l -= 360.0;
    }
    l
}

/// A regular latitude/longitude grid.
///
/// World coordinates are (lon, lat) in degrees. The area's east edge
/// may exceed 180 when the grid crosses the antimeridian.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularLatLon {
    /// Covered area in degrees: x = longitude, y = latitude.
    pub area: BoundingBox,
}

impl RegularLatLon {
    pub fn new(area: BoundingBox) -> Self {
        Self { area }
    }

    pub fn world_from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        (wrap_lon(lon, self.area.min_x), lat)
    }

    pub fn geo_from_world(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = if x > 180.0 { x - 360.0 } else { x };
        (y, lon)
    }
}

/// A rotated latitude/longitude grid.
///
/// The pole of rotation is carried as the geographic position of the
/// rotated system's south pole, the wire convention. World coordinates
/// are (rotated lon, rotated lat) in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct RotatedLatLon {
    /// Covered area in rotated degrees.
    pub area: BoundingBox,
    /// Geographic latitude of the rotated south pole, degrees.
    pub south_pole_lat: f64,
    /// Geographic longitude of the rotated south pole, degrees.
    pub south_pole_lon: f64,
    /// Additional rotation about the new polar axis, degrees.
    pub angle: f64,
}

impl RotatedLatLon {
    pub fn new(area: BoundingBox, south_pole_lat: f64, south_pole_lon: f64, angle: f64) -> Self {
        Self {
            area,
            south_pole_lat,
            south_pole_lon,
            angle,
        }
    }

    /// Geographic position of the rotated north pole, degrees.
    fn north_pole(&self) -> (f64, f64) {
        let lat = -self.south_pole_lat;
        let mut lon = self.south_pole_lon - 180.0;
        if lon < -180.0 {
            lon += 360.0;
        }
        (lat, lon)
    }

    pub fn world_from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (pole_lat, pole_lon) = self.north_pole();
        let phi_n = pole_lat.to_radians();
        let phi = lat.to_radians();
        let dlon = (lon - pole_lon).to_radians();

        let sin_phi_r = phi.sin() * phi_n.sin() + phi.cos() * phi_n.cos() * dlon.cos();
        let phi_r = sin_phi_r.clamp(-1.0, 1.0).asin();
        let lam_r = (phi.cos() * dlon.sin())
            .atan2(phi.cos() * phi_n.sin() * dlon.cos() - phi.sin() * phi_n.cos());

        let x = wrap_lon(lam_r.to_degrees() - self.angle, self.area.min_x);
        (x, phi_r.to_degrees())
    }

    pub fn geo_from_world(&self, x: f64, y: f64) -> (f64, f64) {
        let (pole_lat, pole_lon) = self.north_pole();
        let phi_n = pole_lat.to_radians();
        let phi_r = y.to_radians();
        let lam_r = (x + self.angle).to_radians();

        let sin_phi = phi_r.sin() * phi_n.sin() - phi_r.cos() * phi_n.cos() * lam_r.cos();
        let phi = sin_phi.clamp(-1.0, 1.0).asin();
        let lam = (phi_r.cos() * lam_r.sin())
            .atan2(phi_r.sin() * phi_n.cos() + phi_r.cos() * phi_n.sin() * lam_r.cos());

        let mut lon = pole_lon + lam.to_degrees();
        if lon > 180.0 {
            lon -= 360.0;
        } else if lon < -180.0 {
            lon += 360.0;
        }
        (phi.to_degrees(), lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_lon() {
        assert_eq!(wrap_lon(-170.0, 0.0), 190.0);
        assert_eq!(wrap_lon(10.0, 0.0), 10.0);
        assert_eq!(wrap_lon(370.0, 0.0), 10.0);
        assert_eq!(wrap_lon(170.0, -180.0), 170.0);
    }

    #[test]
    fn test_regular_latlon_roundtrip() {
        let proj = RegularLatLon::new(BoundingBox::new(0.0, 40.0, 20.0, 60.0));
        let (x, y) = proj.world_from_geo(50.0, 10.0);
        assert_eq!((x, y), (10.0, 50.0));
        let (lat, lon) = proj.geo_from_world(x, y);
        assert_eq!((lat, lon), (50.0, 10.0));
    }

    #[test]
    fn test_regular_latlon_antimeridian_frame() {
        // Grid covering 170E..190E (i.e. across the antimeridian).
        let proj = RegularLatLon::new(BoundingBox::new(170.0, 0.0, 190.0, 10.0));
        let (x, _) = proj.world_from_geo(5.0, -175.0);
        assert_eq!(x, 185.0);
        let (_, lon) = proj.geo_from_world(185.0, 5.0);
        assert_eq!(lon, -175.0);
    }

    #[test]
    fn test_rotated_identity_pole() {
        // South pole at (-90, 180) leaves the system unrotated.
        let proj = RotatedLatLon::new(BoundingBox::new(-10.0, -10.0, 10.0, 10.0), -90.0, 180.0, 0.0);
        let (x, y) = proj.world_from_geo(5.0, 5.0);
        assert!((x - 5.0).abs() < 1e-9, "x = {}", x);
        assert!((y - 5.0).abs() < 1e-9, "y = {}", y);
    }

    #[test]
    fn test_rotated_pole_maps_to_north() {
        // Rotated north pole sits at geographic (50N, 0E).
        let proj = RotatedLatLon::new(BoundingBox::new(-20.0, -20.0, 20.0, 20.0), -50.0, 180.0, 0.0);
        let (_, y) = proj.world_from_geo(50.0, 0.0);
        assert!((y - 90.0).abs() < 1e-6, "rotated lat = {}", y);
    }

    #[test]
    fn test_rotated_roundtrip() {
        let proj = RotatedLatLon::new(BoundingBox::new(-20.0, -20.0, 20.0, 20.0), -40.0, 170.0, 0.0);
        let (x, y) = proj.world_from_geo(48.0, 11.5);
        let (lat, lon) = proj.geo_from_world(x, y);
        assert!((lat - 48.0).abs() < 1e-6, "lat = {}", lat);
        assert!((lon - 11.5).abs() < 1e-6, "lon = {}", lon);
    }
}
