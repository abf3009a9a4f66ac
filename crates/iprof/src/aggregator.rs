//! Public handle over the ingestion channel, the worker and the sample store.

use crate::config::{AggregatorConfig, Backpressure};
use crate::error::{Error, Result};
use crate::reading::Reading;
use crate::stats::{self, SectionStats, WindowSnapshot};
use crate::window::SampleStore;
use crate::worker::{Command, Worker};
use chrono::{DateTime, Utc};
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Handle to one aggregation engine.
///
/// Cloning is cheap and every clone feeds the same worker. The worker stops
/// when [`Aggregator::shutdown`] is called or the last clone is dropped.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Inner>,
}

struct Inner {
    tx: Sender<Command>,
    store: Arc<RwLock<SampleStore>>,
    config: AggregatorConfig,
    processed: Arc<AtomicU64>,
    dropped: AtomicU64,
    /// Set by `shutdown` or when the worker is found gone; later submissions
    /// are refused and the loss is logged once
    closed: AtomicBool,
    /// Held shared around every enqueue and exclusively by `shutdown`, so no
    /// command can land behind `Command::Shutdown`
    gate: RwLock<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.worker.get_mut().take()
            && handle.join().is_err()
        {
            tracing::warn!("aggregation worker panicked");
        }
    }
}

impl Aggregator {
    /// Start a new aggregator and its worker thread
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = crossbeam_channel::bounded(config.queue_depth);
        let store = Arc::new(RwLock::new(SampleStore::new(config.default_window)));
        let processed = Arc::new(AtomicU64::new(0));
        let handle = Worker::new(rx, store.clone(), processed.clone()).spawn()?;

        tracing::debug!(
            default_window = config.default_window,
            queue_depth = config.queue_depth,
            backpressure = ?config.backpressure,
            "aggregator started"
        );

        Ok(Aggregator {
            inner: Arc::new(Inner {
                tx,
                store,
                config,
                processed,
                dropped: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                gate: RwLock::new(()),
                worker: Mutex::new(Some(handle)),
            }),
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.inner.config
    }

    /// Mark the start of a timed section
    pub fn begin(&self, section: impl Into<String>) -> SectionTimer {
        SectionTimer {
            aggregator: self.clone(),
            section: section.into(),
            started: Instant::now(),
        }
    }

    /// Run `f` as one reading of `section`
    pub fn time<T>(&self, section: &str, f: impl FnOnce() -> T) -> Result<T> {
        let timer = self.begin(section);
        let out = f();
        timer.end()?;
        Ok(out)
    }

    /// Submit a reading measured elsewhere
    pub fn record(&self, section: &str, duration: Duration, end: DateTime<Utc>) -> Result<()> {
        let command = Command::Record {
            section: section.to_string(),
            reading: Reading::new(duration, end),
        };

        match self.inner.config.backpressure {
            Backpressure::Block => self.send(command),
            Backpressure::Drop => self.enqueue(|tx| match tx.try_send(command) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(section, "ingestion queue full, reading dropped");
                    Ok(())
                }
                Err(TrySendError::Disconnected(_)) => Err(self.closed()),
            }),
        }
    }

    /// Set how many readings `section` retains.
    ///
    /// Takes effect for readings the worker receives after this request. A
    /// window already longer than `capacity` loses its oldest readings.
    pub fn configure_window(&self, section: &str, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(Error::InvalidWindow {
                section: section.to_string(),
            });
        }
        self.send(Command::Configure {
            section: section.to_string(),
            capacity,
        })
    }

    /// Block until everything submitted before this call has been applied
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.send(Command::Flush(ack_tx))?;
        ack_rx.recv().map_err(|_| self.closed())
    }

    /// Stop the worker after it drains what is already queued.
    ///
    /// Later submissions fail with [`Error::AggregatorClosed`]; queries keep
    /// answering from the final state. Calling this twice is harmless.
    pub fn shutdown(&self) {
        {
            // Waits for in-flight sends; the worker keeps draining meanwhile
            let _gate = self.inner.gate.write();
            if !self.inner.closed.swap(true, Ordering::SeqCst) {
                let _ = self.inner.tx.send(Command::Shutdown);
            }
        }
        if let Some(handle) = self.inner.worker.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("aggregation worker panicked");
            }
            tracing::debug!("aggregator shut down");
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.enqueue(|tx| tx.send(command).map_err(|_| self.closed()))
    }

    /// Run `op` against the channel unless the aggregator is already closed
    fn enqueue(&self, op: impl FnOnce(&Sender<Command>) -> Result<()>) -> Result<()> {
        let _gate = self.inner.gate.read();
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(Error::AggregatorClosed);
        }
        op(&self.inner.tx)
    }

    fn closed(&self) -> Error {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            tracing::error!("aggregation worker is gone; readings can no longer be recorded");
        }
        Error::AggregatorClosed
    }

    /// Statistics for one section, `None` when it holds no samples
    pub fn stat(&self, section: &str) -> Option<SectionStats> {
        let snapshot = {
            let store = self.inner.store.read();
            WindowSnapshot::capture(store.get(section)?)
        };
        snapshot.into_stats()
    }

    /// Statistics for every section holding samples, taken under one lock
    pub fn stats(&self) -> BTreeMap<String, SectionStats> {
        let snapshots = {
            let store = self.inner.store.read();
            stats::capture_all(&store)
        };
        stats::build_map(snapshots)
    }

    /// Retained samples for a section, 0 when unknown
    pub fn count(&self, section: &str) -> usize {
        self.inner
            .store
            .read()
            .get(section)
            .map(|w| w.len())
            .unwrap_or(0)
    }

    /// Window capacity that applies to `section`
    pub fn capacity(&self, section: &str) -> usize {
        let store = self.inner.store.read();
        store
            .get(section)
            .map(|w| w.capacity())
            .unwrap_or_else(|| store.default_capacity())
    }

    /// Retained readings of a section, oldest first
    pub fn readings(&self, section: &str) -> Vec<Reading> {
        self.inner
            .store
            .read()
            .get(section)
            .map(|w| w.readings().copied().collect())
            .unwrap_or_default()
    }

    /// Known section names, sorted
    pub fn sections(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .store
            .read()
            .sections()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Readings applied by the worker so far
    pub fn processed(&self) -> u64 {
        self.inner.processed.load(Ordering::Relaxed)
    }

    /// Readings discarded under [`Backpressure::Drop`]
    pub fn dropped(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }
}

/// Start instant of a section, returned by [`Aggregator::begin`]
pub struct SectionTimer {
    aggregator: Aggregator,
    section: String,
    started: Instant,
}

impl SectionTimer {
    /// Submit the time elapsed since `begin` and return it.
    ///
    /// Each call submits another reading measured from the same start.
    pub fn end(&self) -> Result<Duration> {
        let elapsed = self.started.elapsed();
        self.aggregator
            .record(&self.section, elapsed, Utc::now())?;
        Ok(elapsed)
    }

    pub fn section(&self) -> &str {
        &self.section
    }

    pub fn started(&self) -> Instant {
        self.started
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_config() {
        let cfg = AggregatorConfig::default().with_queue_depth(0);
        assert!(matches!(
            Aggregator::new(cfg),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let agg = Aggregator::new(AggregatorConfig::default()).unwrap();
        let err = agg.configure_window("db", 0).unwrap_err();
        assert!(matches!(err, Error::InvalidWindow { section } if section == "db"));
    }

    #[test]
    fn test_timer_end_twice_records_twice() {
        let agg = Aggregator::new(AggregatorConfig::default()).unwrap();
        let timer = agg.begin("twice");
        assert_eq!(timer.section(), "twice");
        let first = timer.end().unwrap();
        let second = timer.end().unwrap();
        assert!(second >= first);
        assert!(timer.started().elapsed() >= second);
        agg.flush().unwrap();
        assert_eq!(agg.count("twice"), 2);
    }

    #[test]
    fn test_time_returns_closure_value() {
        let agg = Aggregator::new(AggregatorConfig::default()).unwrap();
        let v = agg.time("calc", || 6 * 7).unwrap();
        assert_eq!(v, 42);
        agg.flush().unwrap();
        assert_eq!(agg.stat("calc").unwrap().count, 1);
    }

    #[test]
    fn test_capacity_falls_back_to_default() {
        let agg =
            Aggregator::new(AggregatorConfig::default().with_default_window(64)).unwrap();
        agg.configure_window("small", 8).unwrap();
        agg.flush().unwrap();
        assert_eq!(agg.capacity("small"), 8);
        assert_eq!(agg.capacity("unknown"), 64);
    }
}
