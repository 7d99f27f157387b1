//! Beacon Core
//!
//! Spatial indexing for range-and-bearing (RAB) communication entities:
//! - Uniform 3D grid and unbounded space hash over world space
//! - Sphere-to-cells rasterization of communication ranges
//! - Per-tick update driver that rebuilds cell membership
//! - The small entity, anchor and configuration services the driver needs

pub mod anchor;
pub mod config;
pub mod entity;
pub mod error;
pub mod grid;
pub mod link;
pub mod math;
pub mod medium;
pub mod proximity;
pub mod rab;
pub mod raster;
pub mod time;

pub use glam;

pub use anchor::{Anchor, AnchorHandle, AnchorTable, ORIGIN_ANCHOR};
pub use config::ConfigNode;
pub use entity::{EntityId, EntityState, EntityTree};
pub use error::{ConfigError, EntityError, EntityUpdateError, SweepError};
pub use grid::{CellCoord, CellIndex, CellSpace, Grid, GridConfig, GridGeometry, SpaceHash};
pub use link::{Link, LinkEquipped, LinkGeometry};
pub use medium::{Coverage, RabMedium, SweepStats};
pub use proximity::{ProximitySensor, ProximitySensorEquipped};
pub use rab::{GridEntityUpdater, RabEquipped, SpaceHashEntityUpdater};
pub use time::SimulationTime;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
