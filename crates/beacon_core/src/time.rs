//! Deterministic time system
//!
//! Fixed tick rate; one grid sweep per tick

use std::time::Duration;

/// Default simulation tick rate (10 Hz, the usual robot control step)
pub const DEFAULT_TICKS_PER_SECOND: u32 = 10;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_count: u64,
    tick_duration: Duration,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::with_rate(DEFAULT_TICKS_PER_SECOND)
    }

    /// Tracker advancing `ticks_per_second` times per simulated second.
    pub fn with_rate(ticks_per_second: u32) -> Self {
        let rate = ticks_per_second.max(1);
        Self {
            tick_count: 0,
            tick_duration: Duration::from_secs(1) / rate,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }

    pub fn reset(&mut self) {
        self.tick_count = 0;
        self.accumulated_time = Duration::ZERO;
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
