//! Named counters for sweep events (cells updated, writes dropped, ...)

use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct Counter {
    counters: BTreeMap<String, usize>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: BTreeMap::new(),
        }
    }

    pub fn increment(&mut self, name: &str, value: usize) {
        *self.counters.entry(name.to_string()).or_insert(0) += value;
    }

    pub fn set(&mut self, name: &str, value: usize) {
        self.counters.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    /// Counters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &usize)> {
        self.counters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate_per_name() {
        let mut counter = Counter::new();
        counter.increment("cells_updated", 7);
        counter.increment("cells_updated", 3);
        counter.increment("cells_out_of_bounds", 1);

        assert_eq!(counter.get("cells_updated"), 10);
        assert_eq!(counter.get("cells_out_of_bounds"), 1);
        assert_eq!(counter.get("missing"), 0);

        let names: Vec<&str> = counter.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["cells_out_of_bounds", "cells_updated"]);

        counter.reset_all();
        assert_eq!(counter.get("cells_updated"), 0);
    }
}
