//! Settings management

use crate::error::{read_json, ServiceError};
use beacon_core::glam::Vec3;
use beacon_core::{Coverage, GridConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Simulation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub simulation: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub cells: [u32; 3],
    pub coverage: Coverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub ticks_per_second: u32,
    /// Number of ticks to run.
    pub ticks: u64,
    /// Angular speed of every body around the arena center.
    pub orbit_degrees_per_second: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        let arena = GridConfig::default();
        Self {
            min: arena.min,
            max: arena.max,
            cells: arena.cells,
            coverage: Coverage::default(),
        }
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            ticks_per_second: beacon_core::time::DEFAULT_TICKS_PER_SECOND,
            ticks: 50,
            orbit_degrees_per_second: 30.0,
        }
    }
}

impl GridSettings {
    pub fn arena(&self) -> GridConfig {
        GridConfig {
            min: self.min,
            max: self.max,
            cells: self.cells,
        }
    }

    pub fn center(&self) -> Vec3 {
        (Vec3::from_array(self.min) + Vec3::from_array(self.max)) * 0.5
    }
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, ServiceError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let settings: Settings = read_json(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "settings loaded");
        Ok(settings)
    }
}
