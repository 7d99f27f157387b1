//! RAB medium: owns the arena grid and rebuilds it once per tick.
//!
//! Each sweep starts a new grid generation, refreshes every enabled
//! device from its anchor and registers it in the cells its range reaches.
//! A device that cannot be refreshed is reported and skipped; the rest of
//! the sweep still runs. Devices whose entity has been destroyed are
//! dropped from the medium.

use crate::anchor::AnchorTable;
use crate::entity::{EntityId, EntityState, EntityTree};
use crate::error::{ConfigError, EntityError, EntityUpdateError, SweepError};
use crate::grid::{CellIndex, Grid, GridConfig};
use crate::math::Vec3;
use crate::rab::{GridEntityUpdater, RabEquipped};
use beacon_metrics::{Counter, SweepTimer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which cells a device is registered in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coverage {
    /// Cells inside the range sphere.
    #[default]
    Sphere,
    /// Every cell of the range cube.
    Box,
}

/// Outcome of one sweep.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub entities_registered: usize,
    /// Devices that are not enabled this tick.
    pub entities_skipped: usize,
    pub entities_failed: usize,
    /// Devices dropped because their entity was destroyed.
    pub entities_removed: usize,
    pub cells_updated: usize,
    pub cells_out_of_bounds: usize,
}

pub struct RabMedium {
    grid: Grid<EntityId>,
    coverage: Coverage,
    devices: BTreeMap<EntityId, RabEquipped>,
    /// Devices registered this generation whose position lies outside the arena.
    outside: Vec<EntityId>,
    counters: Counter,
    timer: SweepTimer,
}

impl RabMedium {
    pub fn new(config: &GridConfig, coverage: Coverage) -> Result<Self, ConfigError> {
        Ok(Self {
            grid: Grid::new(config)?,
            coverage,
            devices: BTreeMap::new(),
            outside: Vec::new(),
            counters: Counter::new(),
            timer: SweepTimer::default(),
        })
    }

    pub fn grid(&self) -> &Grid<EntityId> {
        &self.grid
    }

    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    pub fn set_coverage(&mut self, coverage: Coverage) {
        self.coverage = coverage;
    }

    /// Start tracking a device. A device already tracked under the same
    /// entity is replaced and returned.
    pub fn add_entity(&mut self, rab: RabEquipped) -> Option<RabEquipped> {
        tracing::info!(entity = rab.entity().to_bits(), range = rab.range(), "RAB entity added");
        self.devices.insert(rab.entity(), rab)
    }

    /// Stop tracking a device and drop it from every live cell right away.
    pub fn remove_entity(&mut self, entity: EntityId) -> Option<RabEquipped> {
        let removed = self.devices.remove(&entity)?;
        self.outside.retain(|&e| e != entity);
        let cells = self.grid.remove_everywhere(entity);
        tracing::info!(entity = entity.to_bits(), cells, "RAB entity removed");
        Some(removed)
    }

    /// Destroy `entity` and its subtree, removing every device inside it.
    ///
    /// Returns how many devices were removed.
    pub fn destroy_entity(&mut self, tree: &mut EntityTree, entity: EntityId) -> Result<usize, EntityError> {
        let destroyed = tree.destroy(entity)?;
        Ok(destroyed
            .into_iter()
            .filter(|&id| self.remove_entity(id).is_some())
            .count())
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.devices.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn rab(&self, entity: EntityId) -> Option<&RabEquipped> {
        self.devices.get(&entity)
    }

    pub fn rab_mut(&mut self, entity: EntityId) -> Option<&mut RabEquipped> {
        self.devices.get_mut(&entity)
    }

    /// Tracked devices in entity order.
    pub fn devices(&self) -> impl Iterator<Item = &RabEquipped> {
        self.devices.values()
    }

    /// Rebuild the grid for this tick.
    pub fn update(&mut self, tree: &EntityTree, anchors: &AnchorTable) -> Result<SweepStats, SweepError> {
        self.timer.begin();
        self.grid.begin_update();
        self.outside.clear();

        let mut stats = SweepStats::default();
        let mut failures = Vec::new();
        let mut departed = Vec::new();
        let geometry = *self.grid.geometry();
        let mut updater = GridEntityUpdater::new(&mut self.grid, self.coverage);
        for (&entity, rab) in self.devices.iter_mut() {
            let outcome = match tree.state(entity) {
                EntityState::Enabled => rab.update(anchors),
                EntityState::Destroyed => {
                    departed.push(entity);
                    continue;
                }
                _ => {
                    stats.entities_skipped += 1;
                    continue;
                }
            };
            if let Err(source) = outcome {
                let path = tree.describe(entity);
                tracing::warn!(%path, error = %source, "skipping RAB entity for this sweep");
                failures.push(EntityUpdateError { path, source });
                continue;
            }
            updater.register(rab);
            if !geometry.contains(geometry.cell_of(rab.position())) {
                self.outside.push(entity);
            }
            stats.entities_registered += 1;
        }

        for entity in departed {
            if self.remove_entity(entity).is_some() {
                tracing::info!(entity = entity.to_bits(), "dropping destroyed RAB entity");
                stats.entities_removed += 1;
            }
        }

        let grid_stats = self.grid.stats();
        stats.entities_failed = failures.len();
        stats.cells_updated = grid_stats.cells_updated;
        stats.cells_out_of_bounds = grid_stats.cells_out_of_bounds;

        self.timer.end();
        beacon_metrics::metrics! {
            self.counters.increment("sweeps", 1);
            self.counters.set("entities_registered", stats.entities_registered);
            self.counters.set("cells_updated", stats.cells_updated);
            self.counters.increment("cells_out_of_bounds", stats.cells_out_of_bounds);
            self.counters.increment("entities_failed", stats.entities_failed);
            self.counters.increment("entities_removed", stats.entities_removed);
        }

        tracing::debug!(
            generation = self.grid.generation(),
            registered = stats.entities_registered,
            skipped = stats.entities_skipped,
            failed = stats.entities_failed,
            removed = stats.entities_removed,
            cells_updated = stats.cells_updated,
            cells_out_of_bounds = stats.cells_out_of_bounds,
            "RAB sweep complete"
        );

        if failures.is_empty() {
            Ok(stats)
        } else {
            Err(SweepError { failures, stats })
        }
    }

    /// Zero every payload and empty the grid.
    pub fn reset(&mut self) {
        for rab in self.devices.values_mut() {
            rab.reset();
        }
        self.grid.begin_update();
        self.outside.clear();
    }

    /// Devices registered this sweep whose range covers `point`, sorted.
    ///
    /// Candidates come from the point's cell and its 26 neighbours: a sphere
    /// that covers a point always reaches, within its footprint, a cell at
    /// most one step from the point's cell. Devices outside the arena have
    /// no such cell and are checked directly. Points outside the arena have
    /// no senders.
    pub fn senders_reaching(&self, point: Vec3) -> Vec<EntityId> {
        let geometry = self.grid.geometry();
        let coord = geometry.cell_of(point);
        if !geometry.contains(coord) {
            return Vec::new();
        }
        let mut senders = self.outside.clone();
        for di in -1..=1 {
            for dj in -1..=1 {
                for dk in -1..=1 {
                    senders.extend_from_slice(self.grid.cell(coord.offset(di, dj, dk)));
                }
            }
        }
        senders.sort_unstable();
        senders.dedup();
        senders.retain(|id| self.devices.get(id).is_some_and(|rab| rab.covers(point)));
        senders
    }

    pub fn counters(&self) -> &Counter {
        &self.counters
    }

    pub fn sweep_timer(&self) -> &SweepTimer {
        &self.timer
    }
}
