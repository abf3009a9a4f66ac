//! Point-in-time statistics over a section window.

use crate::window::{SampleStore, SectionWindow};
use std::collections::BTreeMap;

/// Sorted snapshot of a window, in milliseconds.
///
/// Evaluates any percentile without re-sorting. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Percentiles {
    sorted: Vec<f64>,
}

impl Percentiles {
    /// Returns `None` for an empty sample set
    pub fn new(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        Some(Percentiles { sorted: values })
    }

    /// Interpolated value at percentile `p`.
    ///
    /// `p` is clamped into `[0, 100]`; NaN counts as 0. The rank is
    /// `p/100 * (len + 1)`: rank 0 yields the minimum, a rank at or past the
    /// last index yields the maximum, anything between interpolates linearly
    /// between neighbouring values.
    pub fn percentile(&self, p: f64) -> f64 {
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        let len = self.sorted.len();

        let n = (p / 100.0) * (len + 1) as f64;
        let k = n.floor() as usize;
        if k == 0 {
            return self.sorted[0];
        }
        if k >= len - 1 {
            return self.sorted[len - 1];
        }

        let d = n - k as f64;
        let (lo, hi) = (self.sorted[k], self.sorted[k + 1]);
        (lo + d * (hi - lo)).min(hi)
    }

    pub fn min(&self) -> f64 {
        self.sorted[0]
    }

    pub fn max(&self) -> f64 {
        self.sorted[self.sorted.len() - 1]
    }

    pub fn p50(&self) -> f64 {
        self.percentile(50.0)
    }

    pub fn p95(&self) -> f64 {
        self.percentile(95.0)
    }

    pub fn p99(&self) -> f64 {
        self.percentile(99.0)
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Ascending values
    pub fn values(&self) -> &[f64] {
        &self.sorted
    }
}

/// Aggregated timing information about a section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionStats {
    /// Samples currently retained in the window
    pub count: usize,
    /// Samples ever ingested, including evicted ones
    pub total: u64,
    /// Mean of retained samples, in milliseconds
    pub mean: f64,
    pub percentiles: Percentiles,
}

impl SectionStats {
    pub fn percentile(&self, p: f64) -> f64 {
        self.percentiles.percentile(p)
    }
}

/// Raw data copied out of a window while the read lock is held
pub(crate) struct WindowSnapshot {
    values: Vec<f64>,
    total: u64,
}

impl WindowSnapshot {
    pub(crate) fn capture(window: &SectionWindow) -> Self {
        WindowSnapshot {
            values: window.millis(),
            total: window.total(),
        }
    }

    /// Sorting happens here, outside the lock
    pub(crate) fn into_stats(self) -> Option<SectionStats> {
        let count = self.values.len();
        if count == 0 {
            return None;
        }
        let mean = self.values.iter().sum::<f64>() / count as f64;
        let percentiles = Percentiles::new(self.values)?;
        Some(SectionStats {
            count,
            total: self.total,
            mean,
            percentiles,
        })
    }
}

/// Snapshot every non-empty section of a store
pub(crate) fn capture_all(store: &SampleStore) -> Vec<(String, WindowSnapshot)> {
    store
        .sections()
        .filter(|(_, w)| !w.is_empty())
        .map(|(name, w)| (name.clone(), WindowSnapshot::capture(w)))
        .collect()
}

pub(crate) fn build_map(snapshots: Vec<(String, WindowSnapshot)>) -> BTreeMap<String, SectionStats> {
    snapshots
        .into_iter()
        .filter_map(|(name, snap)| snap.into_stats().map(|s| (name, s)))
        .collect()
}
