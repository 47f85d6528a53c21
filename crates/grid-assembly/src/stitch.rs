//! Multi-tile area stitcher.
//!
//! Merges separately-tiled grids that share a full edge into one larger
//! covering grid. Validated for 1x2, 2x1 and 2x2 tile layouts; larger
//! irregular tile sets are a best-effort optimization, not a
//! correctness guarantee.

use crate::field::{Field, PreparedRecord};
use crate::interpolate::bilinear_interpolate;
use projection::Grid;
use std::collections::HashMap;
use tracing::info;

/// Stitch edge-adjacent tiles of the same logical field.
///
/// Tiles are grouped by (parameter, level, valid time); within a group,
/// pairs with matching edges form connected components that merge into
/// one record each. Records not part of any connected pair pass through
/// unchanged.
pub fn stitch_tiles(records: Vec<PreparedRecord>) -> Vec<PreparedRecord> {
    let mut groups: HashMap<(u16, (u8, u64), i64), Vec<PreparedRecord>> = HashMap::new();
    let mut order = Vec::new();
    for record in records {
        let key = (
            record.param.id,
            record.level.key(),
            record.valid_time.timestamp(),
        );
        if !groups.contains_key(&key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(record);
    }

    let mut out = Vec::new();
    for key in order {
        let members = groups.remove(&key).unwrap_or_default();
        out.extend(stitch_group(members));
    }
    out
}

/// True when one tile's right/top edge exactly equals the other's
/// left/bottom edge. Tiles must share projection parameters, point
/// spacing, and perpendicular extent; coordinate comparison is exact.
fn edge_adjacent(a: &Grid, b: &Grid) -> bool {
    if !a.projection.same_parameters(&b.projection) {
        return false;
    }
    if a.dx() != b.dx() || a.dy() != b.dy() {
        return false;
    }
    let aa = a.projection.area();
    let ba = b.projection.area();

    let horizontal = aa.max_x == ba.min_x && aa.min_y == ba.min_y && aa.max_y == ba.max_y;
    let vertical = aa.max_y == ba.min_y && aa.min_x == ba.min_x && aa.max_x == ba.max_x;
    horizontal || vertical
}

fn stitch_group(members: Vec<PreparedRecord>) -> Vec<PreparedRecord> {
    if members.len() < 2 {
        return members;
    }

    // Pairwise edge-adjacency over record indices, both orders.
    let mut pairs = Vec::new();
    for i in 0..members.len() {
        for j in 0..members.len() {
            if i != j && edge_adjacent(&members[i].field.grid, &members[j].field.grid) {
                pairs.push((i, j));
            }
        }
    }

    // Connected components. The second pass catches links discovered
    // transitively after a member was already grouped.
    let mut group_of: Vec<Option<usize>> = vec![None; members.len()];
    let mut next_group = 0usize;
    for _ in 0..2 {
        for &(i, j) in &pairs {
            match (group_of[i], group_of[j]) {
                (None, None) => {
                    group_of[i] = Some(next_group);
                    group_of[j] = Some(next_group);
                    next_group += 1;
                }
                (Some(g), None) => group_of[j] = Some(g),
                (None, Some(g)) => group_of[i] = Some(g),
                (Some(a), Some(b)) if a != b => {
                    for slot in group_of.iter_mut() {
                        if *slot == Some(b) {
                            *slot = Some(a);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut singles = Vec::new();
    for (idx, group) in group_of.iter().enumerate() {
        match group {
            Some(g) => components.entry(*g).or_default().push(idx),
            None => singles.push(idx),
        }
    }

    let mut merged: Vec<PreparedRecord> = Vec::new();
    let mut component_ids: Vec<usize> = components.keys().copied().collect();
    component_ids.sort();
    for id in component_ids {
        let indices = &components[&id];
        merged.push(merge_component(&members, indices));
    }

    // Singletons pass through unchanged, after the merged tiles.
    let mut out = merged;
    for (idx, member) in members.into_iter().enumerate() {
        if singles.contains(&idx) {
            out.push(member);
        }
    }
    out
}

/// Merge one connected component into a single covering record.
///
/// The covering box grows over every member's area; member samples copy
/// directly onto coinciding grid points, and any gap left by an
/// incomplete layout is resampled from whichever member overlaps it.
fn merge_component(members: &[PreparedRecord], indices: &[usize]) -> PreparedRecord {
    let first = &members[indices[0]];
    let dx = first.field.grid.dx();
    let dy = first.field.grid.dy();

    let mut bbox = *first.field.grid.projection.area();
    for &idx in &indices[1..] {
        bbox = bbox.union(members[idx].field.grid.projection.area());
    }

    let nx = (bbox.width() / dx).round() as usize + 1;
    let ny = (bbox.height() / dy).round() as usize + 1;
    let grid = Grid::new(first.field.grid.projection.with_area(bbox), nx, ny);

    info!(
        param = first.param.id,
        tiles = indices.len(),
        nx,
        ny,
        "Stitched adjacent tiles into a covering grid"
    );

    let mut field = Field::missing(grid);
    for &idx in indices {
        let member = &members[idx].field;
        let area = member.grid.projection.area();
        let off_i = ((area.min_x - bbox.min_x) / dx).round() as usize;
        let off_j = ((area.min_y - bbox.min_y) / dy).round() as usize;
        for row in 0..member.grid.ny {
            for col in 0..member.grid.nx {
                let v = member.get(col, row);
                if !v.is_nan() {
                    field.set(off_i + col, off_j + row, v);
                }
            }
        }
    }

    // Gap fill for cells no member covered exactly.
    for row in 0..field.grid.ny {
        for col in 0..field.grid.nx {
            if !field.get(col, row).is_nan() {
                continue;
            }
            let (lat, lon) = field.grid.grid_to_geo(col as f64, row as f64);
            for &idx in indices {
                let member = &members[idx].field;
                let (si, sj) = member.grid.geo_to_grid(lat, lon);
                if si < 0.0
                    || sj < 0.0
                    || si > (member.grid.nx - 1) as f64
                    || sj > (member.grid.ny - 1) as f64
                {
                    continue;
                }
                let v = bilinear_interpolate(&member.data, member.grid.nx, member.grid.ny, si, sj);
                if !v.is_nan() {
                    field.set(col, row, v);
                    break;
                }
            }
        }
    }

    PreparedRecord {
        seq: first.seq,
        param: first.param.clone(),
        level: first.level,
        origin_time: first.origin_time,
        valid_time: first.valid_time,
        accumulation_hours: first.accumulation_hours,
        corrected: first.corrected,
        vertical_coefficients: first.vertical_coefficients.clone(),
        field,
    }
}
