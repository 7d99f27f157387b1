//! Wall-clock timing of index sweeps

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct SweepTimer {
    sweep_start: Instant,
    sweep_times: RingBuffer<Duration>,
}

impl SweepTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            sweep_start: Instant::now(),
            sweep_times: RingBuffer::new(capacity),
        }
    }

    pub fn begin(&mut self) {
        self.sweep_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.sweep_times.push(self.sweep_start.elapsed());
    }

    /// Rolling average over the retained sweeps.
    pub fn sweep_time_ms(&self) -> f64 {
        self.sweep_times.average().as_secs_f64() * 1000.0
    }

    pub fn sweep_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.sweep_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }

    pub fn samples(&self) -> usize {
        self.sweep_times.len()
    }
}

impl Default for SweepTimer {
    fn default() -> Self {
        Self::new(60)
    }
}
