//! Per-section sliding windows of readings.
//!
//! The store is only mutated by the aggregation worker. Readers borrow it
//! through a read lock and copy out what they need.

use crate::reading::{Reading, duration_millis};
use std::collections::{HashMap, VecDeque};

/// Bounded FIFO window for one section
#[derive(Debug, Clone)]
pub struct SectionWindow {
    readings: VecDeque<Reading>,
    capacity: usize,
    /// Every reading ever ingested, evicted or not
    total: u64,
}

impl SectionWindow {
    pub fn new(capacity: usize) -> Self {
        SectionWindow {
            readings: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            total: 0,
        }
    }

    /// Append a reading, evicting the oldest one first when full.
    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() >= self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        self.total += 1;
    }

    /// Change the capacity, trimming oldest readings if the window is now too long.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.readings.len() > capacity {
            self.readings.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Oldest first
    pub fn readings(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn millis(&self) -> Vec<f64> {
        self.readings
            .iter()
            .map(|r| duration_millis(r.duration))
            .collect()
    }
}

/// All section windows of one aggregator
#[derive(Debug)]
pub struct SampleStore {
    sections: HashMap<String, SectionWindow>,
    default_capacity: usize,
}

impl SampleStore {
    pub fn new(default_capacity: usize) -> Self {
        SampleStore {
            sections: HashMap::new(),
            default_capacity,
        }
    }

    /// Record a reading, creating the section on first use
    pub fn ingest(&mut self, section: &str, reading: Reading) {
        if let Some(window) = self.sections.get_mut(section) {
            window.push(reading);
            return;
        }
        let mut window = SectionWindow::new(self.default_capacity);
        window.push(reading);
        self.sections.insert(section.to_string(), window);
    }

    /// Set the capacity of a section, creating it empty if unknown
    pub fn configure(&mut self, section: &str, capacity: usize) {
        match self.sections.get_mut(section) {
            Some(window) => window.set_capacity(capacity),
            None => {
                self.sections
                    .insert(section.to_string(), SectionWindow::new(capacity));
            }
        }
    }

    pub fn get(&self, section: &str) -> Option<&SectionWindow> {
        self.sections.get(section)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &SectionWindow)> {
        self.sections.iter()
    }

    pub fn default_capacity(&self) -> usize {
        self.default_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn ms(v: u64) -> Reading {
        Reading::new(Duration::from_millis(v), Utc::now())
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut w = SectionWindow::new(3);
        for i in 0..10 {
            w.push(ms(i));
            assert!(w.len() <= 3);
        }
        assert_eq!(w.total(), 10);
    }

    #[test]
    fn test_fifo_eviction_keeps_latest_in_order() {
        let mut w = SectionWindow::new(4);
        for i in 0..9 {
            w.push(ms(i));
        }
        assert_eq!(w.millis(), vec![5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_shrinking_capacity_trims_oldest() {
        let mut w = SectionWindow::new(10);
        for i in 0..6 {
            w.push(ms(i));
        }
        w.set_capacity(2);
        assert_eq!(w.millis(), vec![4.0, 5.0]);
        assert_eq!(w.total(), 6);

        w.push(ms(6));
        assert_eq!(w.millis(), vec![5.0, 6.0]);
    }

    #[test]
    fn test_store_uses_default_capacity() {
        let mut store = SampleStore::new(2);
        for i in 0..5 {
            store.ingest("db", ms(i));
        }
        let w = store.get("db").unwrap();
        assert_eq!(w.capacity(), 2);
        assert_eq!(w.millis(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_configure_before_ingest() {
        let mut store = SampleStore::new(5000);
        store.configure("http", 3);
        assert!(store.get("http").unwrap().is_empty());

        for i in 0..5 {
            store.ingest("http", ms(i));
        }
        assert_eq!(store.get("http").unwrap().millis(), vec![2.0, 3.0, 4.0]);
        assert!(store.get("other").is_none());
    }
}
