//! Sphere-to-cells rasterization.
//!
//! Registers an entity into every cell whose offset from the entity's own
//! cell lies inside its range sphere. The sphere is walked as nested
//! cross-sections: for each slab offset `i` along axis 0 the disc radius
//! is computed once, and for each row offset `j` inside that disc the
//! remaining reach along axis 2 is computed once.
//!
//! Every interval is clipped to [`CellSpace::cell_range`] before it is
//! walked, so on a bounded grid the work is capped by the grid size no
//! matter how large the range is. Each cell is visited at most once.

use crate::grid::{CellCoord, CellIndex, CellSpace};
use crate::math::{IVec3, Vec3};

/// Radius of the cross-section left after removing `used_sq` from `range_sq`.
///
/// Rounding at the sphere's edge can push the difference slightly below
/// zero; it is clamped so NaN never reaches the cell-range computation.
#[inline]
fn remaining_reach(range_sq: f32, used_sq: f32) -> f32 {
    (range_sq - used_sq).max(0.0).sqrt()
}

/// Inclusive interval `center ± reach` along `axis`, clipped to `bounds`.
#[inline]
fn axis_span(center: i32, reach: i32, bounds: Option<(CellCoord, CellCoord)>, axis: usize) -> (i32, i32) {
    let lo = center.saturating_sub(reach);
    let hi = center.saturating_add(reach);
    match bounds {
        Some((first, last)) => (
            lo.max(IVec3::from(first)[axis]),
            hi.min(IVec3::from(last)[axis]),
        ),
        None => (lo, hi),
    }
}

/// Call `visit` once for every cell of the sphere `center`, `range` that
/// `space` can hold.
///
/// Negative or non-finite ranges visit nothing. Unbounded spaces are walked
/// in full, so their cost follows the volume of the sphere.
pub fn for_each_sphere_cell<S>(space: &S, center: Vec3, range: f32, mut visit: impl FnMut(CellCoord))
where
    S: CellSpace + ?Sized,
{
    if !(range.is_finite() && range >= 0.0) {
        return;
    }
    let origin = space.cell_of(center);
    let bounds = space.cell_range();
    let range_sq = range * range;

    let reach_i = space.extent_to_cells(0, range).max(0);
    let (first_i, last_i) = axis_span(origin.i, reach_i, bounds, 0);
    for i in first_i..=last_i {
        // Offsets never exceed the reach they were clipped from.
        let di = space.cells_to_extent(0, origin.i.abs_diff(i) as i32);
        let di_sq = di * di;
        let reach_j = space
            .extent_to_cells(1, remaining_reach(range_sq, di_sq))
            .max(0);
        let (first_j, last_j) = axis_span(origin.j, reach_j, bounds, 1);
        for j in first_j..=last_j {
            let dj = space.cells_to_extent(1, origin.j.abs_diff(j) as i32);
            let reach_k = space
                .extent_to_cells(2, remaining_reach(range_sq, di_sq + dj * dj))
                .max(0);
            let (first_k, last_k) = axis_span(origin.k, reach_k, bounds, 2);
            for k in first_k..=last_k {
                visit(CellCoord::new(i, j, k));
            }
        }
    }
}

/// Register `item` in every cell of the sphere `center`, `range` on `index`.
///
/// Returns the number of `update_cell` calls that were accepted.
pub fn rasterize_sphere<T, I>(index: &mut I, center: Vec3, range: f32, item: T) -> usize
where
    T: Copy,
    I: CellIndex<T> + ?Sized,
{
    let mut cells = Vec::new();
    for_each_sphere_cell(&*index, center, range, |coord| cells.push(coord));
    cells
        .into_iter()
        .filter(|&coord| index.update_cell(coord, item))
        .count()
}

/// Cells `rasterize_sphere` would write, in visiting order.
pub fn sphere_cells<S: CellSpace + ?Sized>(space: &S, center: Vec3, range: f32) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    for_each_sphere_cell(space, center, range, |coord| cells.push(coord));
    cells
}
