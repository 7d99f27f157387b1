//! Arena bounds, cell sizes and world <-> cell conversions.

use super::{CellCoord, CellSpace};
use crate::error::ConfigError;
use crate::math::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

/// Arena description the grid is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Lower corner of the arena (world units).
    pub min: [f32; 3],
    /// Upper corner of the arena (world units).
    pub max: [f32; 3],
    /// Number of cells along each axis.
    pub cells: [u32; 3],
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            min: [-5.0, -5.0, 0.0],
            max: [5.0, 5.0, 2.0],
            cells: [20, 20, 4],
        }
    }
}

/// Immutable grid layout. `Copy` so traversals can run while the cell
/// storage is borrowed mutably.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridGeometry {
    min: Vec3,
    max: Vec3,
    size: IVec3,
    cell_size: Vec3,
    inv_cell_size: Vec3,
}

impl GridGeometry {
    pub fn new(config: &GridConfig) -> Result<Self, ConfigError> {
        let min = Vec3::from_array(config.min);
        let max = Vec3::from_array(config.max);
        if !min.is_finite() || !max.is_finite() || max.cmple(min).any() {
            return Err(ConfigError::MalformedAttribute {
                tag: "arena".into(),
                attribute: "max".into(),
                value: format!("{:?}", config.max),
                reason: format!("must exceed min {:?} on every axis", config.min),
            });
        }
        if config.cells.iter().any(|&n| n == 0 || n > i32::MAX as u32) {
            return Err(ConfigError::MalformedAttribute {
                tag: "arena".into(),
                attribute: "cells".into(),
                value: format!("{:?}", config.cells),
                reason: "every axis needs at least one cell".into(),
            });
        }
        let size = IVec3::new(
            config.cells[0] as i32,
            config.cells[1] as i32,
            config.cells[2] as i32,
        );
        let cell_size = (max - min) / size.as_vec3();
        Ok(Self {
            min,
            max,
            size,
            cell_size,
            inv_cell_size: cell_size.recip(),
        })
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Cell counts along i, j, k.
    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    pub fn cell_count(&self) -> usize {
        self.size.x as usize * self.size.y as usize * self.size.z as usize
    }

    /// Cell index of a world coordinate along `axis`. Not clamped.
    #[inline]
    pub fn space_to_cell(&self, axis: usize, coordinate: f32) -> i32 {
        ((coordinate - self.min[axis]) * self.inv_cell_size[axis]).floor() as i32
    }

    /// World coordinate of the lower boundary of cell `index` along `axis`.
    #[inline]
    pub fn cell_to_space(&self, index: i32, axis: usize) -> f32 {
        index as f32 * self.cell_size[axis] + self.min[axis]
    }

    pub fn cell_of(&self, position: Vec3) -> CellCoord {
        CellCoord::new(
            self.space_to_cell(0, position.x),
            self.space_to_cell(1, position.y),
            self.space_to_cell(2, position.z),
        )
    }

    #[inline]
    pub fn extent_to_cells(&self, axis: usize, length: f32) -> i32 {
        (length * self.inv_cell_size[axis]).floor() as i32
    }

    #[inline]
    pub fn cells_to_extent(&self, axis: usize, cells: i32) -> f32 {
        cells as f32 * self.cell_size[axis]
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        (0..self.size.x).contains(&coord.i)
            && (0..self.size.y).contains(&coord.j)
            && (0..self.size.z).contains(&coord.k)
    }

    /// Row-major slot of a cell, `None` outside the grid.
    #[inline]
    pub fn linear_index(&self, coord: CellCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let (sj, sk) = (self.size.y as usize, self.size.z as usize);
        Some((coord.i as usize * sj + coord.j as usize) * sk + coord.k as usize)
    }

    /// Lower and upper corner of a cell.
    pub fn cell_bounds(&self, coord: CellCoord) -> (Vec3, Vec3) {
        let lo = Vec3::new(
            self.cell_to_space(coord.i, 0),
            self.cell_to_space(coord.j, 1),
            self.cell_to_space(coord.k, 2),
        );
        (lo, lo + self.cell_size)
    }

    pub fn cell_center(&self, coord: CellCoord) -> Vec3 {
        let (lo, hi) = self.cell_bounds(coord);
        (lo + hi) * 0.5
    }

    /// Visit every in-grid cell intersecting the box `center ± half_extents`,
    /// i outermost and k innermost.
    ///
    /// The visitor returns `false` to stop; the return value tells whether
    /// the traversal ran to completion.
    pub fn for_cells_in_box_range(
        &self,
        center: Vec3,
        half_extents: Vec3,
        mut visitor: impl FnMut(CellCoord) -> bool,
    ) -> bool {
        let half = half_extents.abs();
        let lo = center - half;
        let hi = center + half;
        if !lo.is_finite() || !hi.is_finite() {
            return true;
        }
        if hi.cmplt(self.min).any() || lo.cmpgt(self.max).any() {
            return true;
        }
        let last = self.size - IVec3::ONE;
        let first_cell = IVec3::from(self.cell_of(lo)).clamp(IVec3::ZERO, last);
        let last_cell = IVec3::from(self.cell_of(hi)).clamp(IVec3::ZERO, last);
        for i in first_cell.x..=last_cell.x {
            for j in first_cell.y..=last_cell.y {
                for k in first_cell.z..=last_cell.z {
                    if !visitor(CellCoord::new(i, j, k)) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

impl CellSpace for GridGeometry {
    #[inline]
    fn cell_of(&self, position: Vec3) -> CellCoord {
        GridGeometry::cell_of(self, position)
    }

    #[inline]
    fn extent_to_cells(&self, axis: usize, length: f32) -> i32 {
        GridGeometry::extent_to_cells(self, axis, length)
    }

    #[inline]
    fn cells_to_extent(&self, axis: usize, cells: i32) -> f32 {
        GridGeometry::cells_to_extent(self, axis, cells)
    }

    fn cell_range(&self) -> Option<(CellCoord, CellCoord)> {
        let last = self.size - IVec3::ONE;
        Some((CellCoord::new(0, 0, 0), last.into()))
    }
}
