//! Unbounded spatial hash.
//!
//! Same contract as the dense grid but with no arena: cell `(i, j, k)`
//! covers `[i, i + 1) * cell_size` along each axis, so coordinates are
//! absolute and every write is accepted. Useful when entities roam
//! outside any fixed bounds.

use super::{CellCoord, CellIndex, CellSpace};
use crate::error::ConfigError;
use crate::math::Vec3;
use std::collections::HashMap;

/// Sparse cell index keyed by absolute cell coordinate.
#[derive(Debug, Clone)]
pub struct SpaceHash<T> {
    cell_size: Vec3,
    inv_cell_size: Vec3,
    /// Map from cell coordinates to entities in that cell.
    cells: HashMap<CellCoord, Vec<T>>,
}

impl<T: Copy + PartialEq> SpaceHash<T> {
    /// Create a hash whose cells measure `cell_size` along each axis.
    pub fn new(cell_size: Vec3) -> Result<Self, ConfigError> {
        if !cell_size.is_finite() || cell_size.cmple(Vec3::ZERO).any() {
            return Err(ConfigError::MalformedAttribute {
                tag: "space_hash".into(),
                attribute: "cell_size".into(),
                value: format!("{cell_size}"),
                reason: "cell sizes must be positive and finite".into(),
            });
        }
        Ok(Self {
            cell_size,
            inv_cell_size: cell_size.recip(),
            cells: HashMap::new(),
        })
    }

    /// Cubic cells of side `size`.
    pub fn uniform(size: f32) -> Result<Self, ConfigError> {
        Self::new(Vec3::splat(size))
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn cell(&self, coord: CellCoord) -> &[T] {
        self.cells.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of non-empty cells.
    pub fn occupied(&self) -> usize {
        self.cells.len()
    }

    /// Every non-empty cell, sorted by coordinate.
    pub fn occupied_cells(&self) -> Vec<CellCoord> {
        let mut coords: Vec<CellCoord> = self.cells.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    pub fn remove_everywhere(&mut self, item: T) -> usize {
        let mut removed = 0;
        self.cells.retain(|_, entities| {
            let before = entities.len();
            entities.retain(|&e| e != item);
            removed += before - entities.len();
            !entities.is_empty()
        });
        removed
    }
}

impl<T: Copy + Ord> SpaceHash<T> {
    /// Distinct entities registered in any cell the sphere's bounding box touches.
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<T> {
        let reach = Vec3::splat(radius.max(0.0));
        let lo = self.cell_of(center - reach);
        let hi = self.cell_of(center + reach);
        let mut found = Vec::new();
        for i in lo.i..=hi.i {
            for j in lo.j..=hi.j {
                for k in lo.k..=hi.k {
                    found.extend_from_slice(self.cell(CellCoord::new(i, j, k)));
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}

impl<T> CellSpace for SpaceHash<T> {
    fn cell_of(&self, position: Vec3) -> CellCoord {
        let scaled = (position * self.inv_cell_size).floor();
        CellCoord::new(scaled.x as i32, scaled.y as i32, scaled.z as i32)
    }

    #[inline]
    fn extent_to_cells(&self, axis: usize, length: f32) -> i32 {
        (length * self.inv_cell_size[axis]).floor() as i32
    }

    #[inline]
    fn cells_to_extent(&self, axis: usize, cells: i32) -> f32 {
        cells as f32 * self.cell_size[axis]
    }
}

impl<T: Copy + PartialEq> CellIndex<T> for SpaceHash<T> {
    fn update_cell(&mut self, coord: CellCoord, item: T) -> bool {
        let entities = self.cells.entry(coord).or_default();
        if !entities.contains(&item) {
            entities.push(item);
        }
        true
    }

    fn begin_update(&mut self) {
        self.cells.clear();
    }
}
