//! The `Grid` value type: a projection plus fixed column/row counts.

use crate::{LambertConformal, Mercator, PolarStereographic, RegularLatLon, RotatedLatLon};
use grid_common::{BoundingBox, ProjectionFamily};
use std::hash::{Hash, Hasher};

/// The closed union of supported projection families.
///
/// Each variant carries only its own parameters. Matching is exhaustive,
/// so adding a family is a compile-time visible change everywhere.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    RegularLatLon(RegularLatLon),
    RotatedLatLon(RotatedLatLon),
    Mercator(Mercator),
    PolarStereographic(PolarStereographic),
    LambertConformal(LambertConformal),
}

/// Quantize a coordinate for hashing; 1e-6 of a degree or a meter is
/// below any resolution the pipeline handles.
fn q(v: f64) -> i64 {
    (v * 1e6).round() as i64
}

impl Projection {
    pub fn family(&self) -> ProjectionFamily {
        match self {
            Projection::RegularLatLon(_) => ProjectionFamily::RegularLatLon,
            Projection::RotatedLatLon(_) => ProjectionFamily::RotatedLatLon,
            Projection::Mercator(_) => ProjectionFamily::Mercator,
            Projection::PolarStereographic(_) => ProjectionFamily::PolarStereographic,
            Projection::LambertConformal(_) => ProjectionFamily::LambertConformal,
        }
    }

    /// The projected area covered by the grid, in world units.
    pub fn area(&self) -> &BoundingBox {
        match self {
            Projection::RegularLatLon(p) => &p.area,
            Projection::RotatedLatLon(p) => &p.area,
            Projection::Mercator(p) => &p.area,
            Projection::PolarStereographic(p) => &p.area,
            Projection::LambertConformal(p) => &p.area,
        }
    }

    /// Same projection with a different covered area. Used by cropping
    /// and tile stitching, which move the extent but never the family
    /// parameters.
    pub fn with_area(&self, area: BoundingBox) -> Projection {
        let mut p = self.clone();
        match &mut p {
            Projection::RegularLatLon(p) => p.area = area,
            Projection::RotatedLatLon(p) => p.area = area,
            Projection::Mercator(p) => p.area = area,
            Projection::PolarStereographic(p) => p.area = area,
            Projection::LambertConformal(p) => p.area = area,
        }
        p
    }

    /// True when two projections share family and parameters, ignoring
    /// the covered area. Tiles must satisfy this to be stitchable.
    pub fn same_parameters(&self, other: &Projection) -> bool {
        match (self, other) {
            (Projection::RegularLatLon(_), Projection::RegularLatLon(_)) => true,
            (Projection::RotatedLatLon(a), Projection::RotatedLatLon(b)) => {
                a.south_pole_lat == b.south_pole_lat
                    && a.south_pole_lon == b.south_pole_lon
                    && a.angle == b.angle
            }
            (Projection::Mercator(a), Projection::Mercator(b)) => a.ref_lat == b.ref_lat,
            (Projection::PolarStereographic(a), Projection::PolarStereographic(b)) => {
                a.lon_orient == b.lon_orient && a.ref_lat == b.ref_lat
            }
            (Projection::LambertConformal(a), Projection::LambertConformal(b)) => {
                a.lon0 == b.lon0 && a.latin1 == b.latin1 && a.latin2 == b.latin2
            }
            _ => false,
        }
    }

    /// Project a geographic point into world coordinates.
    pub fn world_from_geo(&self, lat: f64, lon: f64) -> (f64, f64) {
        match self {
            Projection::RegularLatLon(p) => p.world_from_geo(lat, lon),
            Projection::RotatedLatLon(p) => p.world_from_geo(lat, lon),
            Projection::Mercator(p) => p.world_from_geo(lat, lon),
            Projection::PolarStereographic(p) => p.world_from_geo(lat, lon),
            Projection::LambertConformal(p) => p.world_from_geo(lat, lon),
        }
    }

    /// Recover the geographic point of a world coordinate.
    pub fn geo_from_world(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::RegularLatLon(p) => p.geo_from_world(x, y),
            Projection::RotatedLatLon(p) => p.geo_from_world(x, y),
            Projection::Mercator(p) => p.geo_from_world(x, y),
            Projection::PolarStereographic(p) => p.geo_from_world(x, y),
            Projection::LambertConformal(p) => p.geo_from_world(x, y),
        }
    }
}

// Projection parameters are finite by construction (they come from
// validated record metadata), so float equality is an equivalence.
impl Eq for Projection {}

impl Hash for Projection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        for b in self.area().quantized_bits() {
            b.hash(state);
        }
        match self {
            Projection::RegularLatLon(_) => {}
            Projection::RotatedLatLon(p) => {
                q(p.south_pole_lat).hash(state);
                q(p.south_pole_lon).hash(state);
                q(p.angle).hash(state);
            }
            Projection::Mercator(p) => q(p.ref_lat).hash(state),
            Projection::PolarStereographic(p) => {
                q(p.lon_orient).hash(state);
                q(p.ref_lat).hash(state);
            }
            Projection::LambertConformal(p) => {
                q(p.lon0).hash(state);
                q(p.latin1).hash(state);
                q(p.latin2).hash(state);
            }
        }
    }
}

/// A projected area with a fixed sample resolution.
///
/// Grid points are corner-inclusive: column 0 sits on the west edge of
/// the area, column `nx - 1` on the east edge, so the point spacing is
/// `width / (nx - 1)`. Row 0 is the southernmost row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    pub projection: Projection,
    /// Number of columns.
    pub nx: usize,
    /// Number of rows.
    pub ny: usize,
}

impl Grid {
    pub fn new(projection: Projection, nx: usize, ny: usize) -> Self {
        Self { projection, nx, ny }
    }

    /// Point spacing along x, in world units.
    pub fn dx(&self) -> f64 {
        self.projection.area().width() / (self.nx.max(2) - 1) as f64
    }

    /// Point spacing along y, in world units.
    pub fn dy(&self) -> f64 {
        self.projection.area().height() / (self.ny.max(2) - 1) as f64
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    /// Fractional (col, row) of a geographic point.
    ///
    /// Row 0 is the southernmost row. The result may lie outside
    /// `[0, nx) x [0, ny)` when the point is off the grid.
    pub fn geo_to_grid(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (x, y) = self.projection.world_from_geo(lat, lon);
        let area = self.projection.area();
        ((x - area.min_x) / self.dx(), (y - area.min_y) / self.dy())
    }

    /// Geographic coordinates (lat, lon) of a fractional (col, row).
    pub fn grid_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let area = self.projection.area();
        let x = area.min_x + col * self.dx();
        let y = area.min_y + row * self.dy();
        self.projection.geo_from_world(x, y)
    }

    /// Check if a geographic point falls on the grid.
    pub fn contains_geo(&self, lat: f64, lon: f64) -> bool {
        let (i, j) = self.geo_to_grid(lat, lon);
        i >= 0.0 && i <= (self.nx - 1) as f64 && j >= 0.0 && j <= (self.ny - 1) as f64
    }

    /// Approximate geographic bounding box of the grid.
    ///
    /// Exact for the lat/lon family. For projected families the edges
    /// are curved in geographic space, so corners and edge midpoints
    /// are sampled the way the rendering side of the house does it.
    pub fn geographic_bounds(&self) -> BoundingBox {
        if let Projection::RegularLatLon(p) = &self.projection {
            return p.area;
        }

        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;

        let last_col = (self.nx - 1) as f64;
        let last_row = (self.ny - 1) as f64;
        for t in 0..=10 {
            let frac = t as f64 / 10.0;
            for (col, row) in [
                (frac * last_col, 0.0),
                (frac * last_col, last_row),
                (0.0, frac * last_row),
                (last_col, frac * last_row),
            ] {
                let (lat, lon) = self.grid_to_geo(col, row);
                min_lat = min_lat.min(lat);
                max_lat = max_lat.max(lat);
                min_lon = min_lon.min(lon);
                max_lon = max_lon.max(lon);
            }
        }

        BoundingBox::new(min_lon, min_lat, max_lon, max_lat)
    }
}
