//! Dense, arena-bounded grid.

use super::{CellCoord, CellIndex, CellSpace, GridConfig, GridGeometry};
use crate::error::ConfigError;
use crate::math::Vec3;

/// One grid cell. Contents are valid only while `stamp` matches the grid's.
#[derive(Debug, Clone)]
struct Cell<T> {
    stamp: u64,
    entities: Vec<T>,
}

impl<T> Default for Cell<T> {
    fn default() -> Self {
        Self {
            stamp: 0,
            entities: Vec::new(),
        }
    }
}

/// Write counters for the current generation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct GridStats {
    /// Accepted `update_cell` calls (including repeats of an existing member).
    pub cells_updated: usize,
    /// `update_cell` calls dropped because the cell lies outside the arena.
    pub cells_out_of_bounds: usize,
}

/// Uniform 3D grid mapping cells to entity references.
///
/// Writes outside the arena are silently dropped (and counted), never
/// clamped onto the border cells.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    geometry: GridGeometry,
    cells: Vec<Cell<T>>,
    stamp: u64,
    stats: GridStats,
}

impl<T: Copy + PartialEq> Grid<T> {
    pub fn new(config: &GridConfig) -> Result<Self, ConfigError> {
        let geometry = GridGeometry::new(config)?;
        let mut cells = Vec::with_capacity(geometry.cell_count());
        cells.resize_with(geometry.cell_count(), Cell::default);
        Ok(Self {
            geometry,
            cells,
            stamp: 1,
            stats: GridStats::default(),
        })
    }

    #[inline]
    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn stats(&self) -> GridStats {
        self.stats
    }

    /// Current generation number.
    pub fn generation(&self) -> u64 {
        self.stamp
    }

    /// Entities registered in a cell this generation.
    pub fn cell(&self, coord: CellCoord) -> &[T] {
        match self.geometry.linear_index(coord) {
            Some(idx) => self.live(idx),
            None => &[],
        }
    }

    /// Visit every in-grid cell intersecting the box, with its current contents.
    /// The visitor returns `false` to stop early.
    pub fn for_cells_in_box_range(
        &self,
        center: Vec3,
        half_extents: Vec3,
        mut visitor: impl FnMut(CellCoord, &[T]) -> bool,
    ) -> bool {
        self.geometry
            .for_cells_in_box_range(center, half_extents, |coord| {
                visitor(coord, self.cell(coord))
            })
    }

    /// Register `item` in every cell of the box `center ± half_extents`.
    pub fn register_box(&mut self, center: Vec3, half_extents: Vec3, item: T) -> usize {
        let geometry = self.geometry;
        let mut updated = 0;
        geometry.for_cells_in_box_range(center, half_extents, |coord| {
            if self.update_cell(coord, item) {
                updated += 1;
            }
            true
        });
        updated
    }

    /// Remove `item` from every live cell. Returns the number of cells it left.
    pub fn remove_everywhere(&mut self, item: T) -> usize {
        let stamp = self.stamp;
        let mut removed = 0;
        for cell in self.cells.iter_mut().filter(|cell| cell.stamp == stamp) {
            let before = cell.entities.len();
            cell.entities.retain(|&e| e != item);
            removed += before - cell.entities.len();
        }
        removed
    }

    /// Cells holding at least one entity this generation, in row-major order.
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellCoord, &[T])> + '_ {
        let size = self.geometry.size();
        let (sj, sk) = (size.y as usize, size.z as usize);
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| cell.stamp == self.stamp && !cell.entities.is_empty())
            .map(move |(idx, cell)| {
                let coord = CellCoord::new(
                    (idx / (sj * sk)) as i32,
                    ((idx / sk) % sj) as i32,
                    (idx % sk) as i32,
                );
                (coord, cell.entities.as_slice())
            })
    }

    #[inline]
    fn live(&self, idx: usize) -> &[T] {
        let cell = &self.cells[idx];
        if cell.stamp == self.stamp {
            &cell.entities
        } else {
            &[]
        }
    }
}

impl<T: Copy + Ord> Grid<T> {
    /// Distinct entities registered in any cell overlapping the box, sorted.
    pub fn entities_in_box(&self, center: Vec3, half_extents: Vec3) -> Vec<T> {
        let mut found = Vec::new();
        self.for_cells_in_box_range(center, half_extents, |_, entities| {
            found.extend_from_slice(entities);
            true
        });
        found.sort_unstable();
        found.dedup();
        found
    }

    /// Distinct entities registered in any cell the sphere touches, sorted.
    pub fn entities_in_sphere(&self, center: Vec3, radius: f32) -> Vec<T> {
        let radius = radius.max(0.0);
        let radius_sq = radius * radius;
        let mut found = Vec::new();
        self.for_cells_in_box_range(center, Vec3::splat(radius), |coord, entities| {
            let (lo, hi) = self.geometry.cell_bounds(coord);
            if center.clamp(lo, hi).distance_squared(center) <= radius_sq {
                found.extend_from_slice(entities);
            }
            true
        });
        found.sort_unstable();
        found.dedup();
        found
    }
}

impl<T> CellSpace for Grid<T> {
    #[inline]
    fn cell_of(&self, position: Vec3) -> CellCoord {
        self.geometry.cell_of(position)
    }

    #[inline]
    fn extent_to_cells(&self, axis: usize, length: f32) -> i32 {
        self.geometry.extent_to_cells(axis, length)
    }

    #[inline]
    fn cells_to_extent(&self, axis: usize, cells: i32) -> f32 {
        self.geometry.cells_to_extent(axis, cells)
    }

    #[inline]
    fn cell_range(&self) -> Option<(CellCoord, CellCoord)> {
        CellSpace::cell_range(&self.geometry)
    }
}

impl<T: Copy + PartialEq> CellIndex<T> for Grid<T> {
    fn update_cell(&mut self, coord: CellCoord, item: T) -> bool {
        let Some(idx) = self.geometry.linear_index(coord) else {
            self.stats.cells_out_of_bounds += 1;
            tracing::trace!(?coord, "dropping grid write outside the arena");
            return false;
        };
        let stamp = self.stamp;
        let cell = &mut self.cells[idx];
        if cell.stamp != stamp {
            cell.entities.clear();
            cell.stamp = stamp;
        }
        if !cell.entities.contains(&item) {
            cell.entities.push(item);
        }
        self.stats.cells_updated += 1;
        true
    }

    fn begin_update(&mut self) {
        self.stamp += 1;
        self.stats = GridStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid<u32> {
        Grid::new(&GridConfig {
            min: [0.0, 0.0, 0.0],
            max: [4.0, 4.0, 4.0],
            cells: [4, 4, 4],
        })
        .unwrap()
    }

    #[test]
    fn update_cell_inserts_once_per_generation() {
        let mut g = grid();
        let c = CellCoord::new(1, 2, 3);
        assert!(g.update_cell(c, 7));
        assert!(g.update_cell(c, 7));
        assert!(g.update_cell(c, 9));
        assert_eq!(g.cell(c), &[7, 9]);
        assert_eq!(g.stats().cells_updated, 3);
    }

    #[test]
    fn out_of_bounds_writes_are_dropped_not_clamped() {
        let mut g = grid();
        assert!(!g.update_cell(CellCoord::new(4, 0, 0), 1));
        assert!(!g.update_cell(CellCoord::new(-1, 0, 0), 1));
        assert_eq!(g.stats().cells_out_of_bounds, 2);
        assert_eq!(g.occupied_cells().count(), 0);
        assert!(g.cell(CellCoord::new(3, 0, 0)).is_empty());
        assert!(g.cell(CellCoord::new(0, 0, 0)).is_empty());
    }

    #[test]
    fn begin_update_discards_previous_generation() {
        let mut g = grid();
        g.update_cell(CellCoord::new(0, 0, 0), 1);
        g.begin_update();
        assert!(g.cell(CellCoord::new(0, 0, 0)).is_empty());
        assert_eq!(g.stats(), GridStats::default());

        g.update_cell(CellCoord::new(0, 0, 0), 2);
        assert_eq!(g.cell(CellCoord::new(0, 0, 0)), &[2]);
    }

    #[test]
    fn register_box_and_remove_everywhere() {
        let mut g = grid();
        assert_eq!(g.register_box(Vec3::splat(2.0), Vec3::splat(0.5), 5), 8);
        g.update_cell(CellCoord::new(0, 0, 0), 6);

        let occupied: Vec<CellCoord> = g.occupied_cells().map(|(c, _)| c).collect();
        assert_eq!(occupied.len(), 9);
        assert_eq!(occupied[0], CellCoord::new(0, 0, 0));
        assert_eq!(occupied[1], CellCoord::new(1, 1, 1));

        assert_eq!(g.remove_everywhere(5), 8);
        assert_eq!(g.occupied_cells().count(), 1);
    }

    #[test]
    fn box_and_sphere_queries_deduplicate() {
        let mut g = grid();
        g.register_box(Vec3::splat(2.0), Vec3::splat(0.5), 5);
        g.update_cell(CellCoord::new(0, 0, 0), 6);
        g.update_cell(CellCoord::new(3, 3, 3), 7);

        assert_eq!(g.entities_in_box(Vec3::splat(1.5), Vec3::splat(1.0)), vec![5, 6]);
        // The corner cell (3,3,3) starts at distance sqrt(3) from (2,2,2).
        assert_eq!(g.entities_in_sphere(Vec3::splat(2.0), 1.0), vec![5]);
        assert_eq!(g.entities_in_sphere(Vec3::splat(2.0), 2.0), vec![5, 6, 7]);
    }

    #[test]
    fn visitor_sees_cell_contents() {
        let mut g = grid();
        g.update_cell(CellCoord::new(0, 0, 0), 3);
        let mut hits = Vec::new();
        g.for_cells_in_box_range(Vec3::splat(0.5), Vec3::splat(0.4), |coord, entities| {
            hits.push((coord, entities.to_vec()));
            true
        });
        assert_eq!(hits, vec![(CellCoord::new(0, 0, 0), vec![3])]);
    }
}
