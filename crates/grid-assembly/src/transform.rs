//! Spatial transform engine: index cropping and cached reprojection.

use crate::config::InterpolationMethod;
use crate::field::Field;
use crate::interpolate::interpolate;
use grid_common::BoundingBox;
use projection::Grid;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

/// Margin when deciding whether a fractional source coordinate still
/// falls on the source grid.
const EDGE_EPS: f64 = 1e-9;

/// Crop a field to the tightest integer cell box enclosing a geographic
/// rectangle.
///
/// The minimum corner is floored and the maximum ceiled, so the crop
/// never loses coverage of the requested rectangle. The box may extend
/// past the source's actual coverage; cells without a source sample are
/// left missing rather than failing.
pub fn crop(field: &Field, rect: &BoundingBox) -> Field {
    let grid = &field.grid;
    let area = grid.projection.area();
    let dx = grid.dx();
    let dy = grid.dy();

    // Project the rectangle corners into the source's world system.
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for (lat, lon) in [
        (rect.min_y, rect.min_x),
        (rect.min_y, rect.max_x),
        (rect.max_y, rect.min_x),
        (rect.max_y, rect.max_x),
    ] {
        let (x, y) = grid.projection.world_from_geo(lat, lon);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let i0 = ((min_x - area.min_x) / dx).floor() as i64;
    let j0 = ((min_y - area.min_y) / dy).floor() as i64;
    let i1 = ((max_x - area.min_x) / dx).ceil() as i64;
    let j1 = ((max_y - area.min_y) / dy).ceil() as i64;

    let out_nx = (i1 - i0 + 1).max(1) as usize;
    let out_ny = (j1 - j0 + 1).max(1) as usize;

    let out_area = BoundingBox::new(
        area.min_x + i0 as f64 * dx,
        area.min_y + j0 as f64 * dy,
        area.min_x + i1 as f64 * dx,
        area.min_y + j1 as f64 * dy,
    );
    let out_grid = Grid::new(grid.projection.with_area(out_area), out_nx, out_ny);

    let mut out = Field::missing(out_grid);
    for dj in 0..out_ny {
        let sj = j0 + dj as i64;
        if sj < 0 || sj >= grid.ny as i64 {
            continue;
        }
        for di in 0..out_nx {
            let si = i0 + di as i64;
            if si < 0 || si >= grid.nx as i64 {
                continue;
            }
            let v = field.get(si as usize, sj as usize);
            out.set(di, dj, v);
        }
    }
    out
}

/// Per-target-cell source locations for one (source, target) grid pair.
///
/// `points[row * nx + col]` is the fractional source (col, row) the
/// target cell reads from, or `None` when the cell falls outside the
/// source coverage.
#[derive(Debug)]
pub struct LocationTable {
    pub points: Vec<Option<(f64, f64)>>,
}

fn build_location_table(source: &Grid, target: &Grid) -> LocationTable {
    debug!(
        source_nx = source.nx,
        source_ny = source.ny,
        target_nx = target.nx,
        target_ny = target.ny,
        "Building reprojection location table"
    );

    let max_i = (source.nx - 1) as f64;
    let max_j = (source.ny - 1) as f64;
    let mut points = Vec::with_capacity(target.len());
    for row in 0..target.ny {
        for col in 0..target.nx {
            let (lat, lon) = target.grid_to_geo(col as f64, row as f64);
            let (si, sj) = source.geo_to_grid(lat, lon);
            if si >= -EDGE_EPS && si <= max_i + EDGE_EPS && sj >= -EDGE_EPS && sj <= max_j + EDGE_EPS
            {
                points.push(Some((si.clamp(0.0, max_i), sj.clamp(0.0, max_j))));
            } else {
                points.push(None);
            }
        }
    }
    LocationTable { points }
}

/// Cache of reprojection location tables keyed by the structural
/// (source, target) grid pair.
///
/// Each table is populated at most once; the first caller builds it
/// while concurrent callers for the same key wait, and readers after
/// population take no lock.
#[derive(Default)]
pub struct ReprojectionCache {
    tables: Mutex<HashMap<(Grid, Grid), Arc<OnceLock<LocationTable>>>>,
}

impl ReprojectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, source: &Grid, target: &Grid) -> Arc<OnceLock<LocationTable>> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .entry((source.clone(), target.clone()))
            .or_default()
            .clone()
    }

    /// Number of cached (source, target) pairs.
    pub fn len(&self) -> usize {
        self.tables.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resample a field onto a target grid.
///
/// The output shape is exactly the target's; every cell is overwritten.
/// An interpolation touching any missing source sample yields a missing
/// destination sample.
pub fn reproject(
    field: &Field,
    target: &Grid,
    method: InterpolationMethod,
    cache: &ReprojectionCache,
) -> Field {
    let cell = cache.entry(&field.grid, target);
    let table = cell.get_or_init(|| build_location_table(&field.grid, target));

    let src = &field.data;
    let (snx, sny) = (field.grid.nx, field.grid.ny);
    let data = table
        .points
        .iter()
        .map(|p| match p {
            Some((si, sj)) => interpolate(src, snx, sny, *si, *sj, method),
            None => f32::NAN,
        })
        .collect();

    Field::new(target.clone(), data)
}
