//! Cell indices over continuous world space.
//!
//! Two indices share one contract ([`CellIndex`]):
//! - [`Grid`]: dense, bounded to the arena; writes outside it are dropped.
//! - [`SpaceHash`]: sparse and unbounded, keyed by absolute cell coordinate.
//!
//! Both are rebuilt every tick. [`CellIndex::begin_update`] starts a new
//! generation and every cell written in an older one reads as empty.

mod dense;
mod geometry;
mod space_hash;

pub use dense::{Grid, GridStats};
pub use geometry::{GridConfig, GridGeometry};
pub use space_hash::SpaceHash;

use crate::math::{IVec3, Vec3};

/// Discrete cell coordinate (i, j, k) along axes 0, 1, 2.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoord {
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

impl CellCoord {
    pub const fn new(i: i32, j: i32, k: i32) -> Self {
        Self { i, j, k }
    }

    /// Offset this coordinate by `(di, dj, dk)`.
    #[inline]
    pub const fn offset(self, di: i32, dj: i32, dk: i32) -> Self {
        Self::new(self.i + di, self.j + dj, self.k + dk)
    }
}

impl From<IVec3> for CellCoord {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<CellCoord> for IVec3 {
    fn from(c: CellCoord) -> Self {
        IVec3::new(c.i, c.j, c.k)
    }
}

/// World <-> cell conversions shared by every cell layout.
///
/// `extent_to_cells` maps a length to the number of whole cells it spans
/// along an axis and `cells_to_extent` maps a cell count back to a length,
/// without any arena offset.
pub trait CellSpace {
    /// Cell containing a world position.
    fn cell_of(&self, position: Vec3) -> CellCoord;

    /// Whole cells spanned by `length` along `axis`.
    fn extent_to_cells(&self, axis: usize, length: f32) -> i32;

    /// Length of `cells` cells along `axis`.
    fn cells_to_extent(&self, axis: usize, cells: i32) -> f32;

    /// First and last cell (inclusive) that can hold entries. `None` for
    /// unbounded layouts.
    fn cell_range(&self) -> Option<(CellCoord, CellCoord)> {
        None
    }
}

/// Per-tick cell index holding references of type `T`.
pub trait CellIndex<T>: CellSpace {
    /// Register `item` in a cell. Returns `false` when the write was dropped.
    fn update_cell(&mut self, coord: CellCoord, item: T) -> bool;

    /// Start a new generation; previous memberships are discarded.
    fn begin_update(&mut self);
}
