//! The aggregation worker: sole writer of the sample store.
//!
//! It blocks on the ingestion channel (idle), applies one command under the
//! store's write lock (processing), and goes back to waiting. It stops on
//! `Command::Shutdown` or once every sender is gone.

use crate::error::{Error, Result};
use crate::reading::Reading;
use crate::window::SampleStore;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

pub(crate) const WORKER_THREAD_NAME: &str = "iprof-aggregator";

/// Message on the ingestion channel
pub(crate) enum Command {
    Record { section: String, reading: Reading },
    Configure { section: String, capacity: usize },
    /// Acknowledged once every earlier command has been applied
    Flush(Sender<()>),
    Shutdown,
}

pub(crate) struct Worker {
    rx: Receiver<Command>,
    store: Arc<RwLock<SampleStore>>,
    processed: Arc<AtomicU64>,
}

impl Worker {
    pub(crate) fn new(
        rx: Receiver<Command>,
        store: Arc<RwLock<SampleStore>>,
        processed: Arc<AtomicU64>,
    ) -> Self {
        Worker {
            rx,
            store,
            processed,
        }
    }

    pub(crate) fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(Error::WorkerSpawn)
    }

    fn run(self) {
        tracing::debug!(thread = WORKER_THREAD_NAME, "aggregation worker started");

        while let Ok(command) = self.rx.recv() {
            match command {
                Command::Record { section, reading } => {
                    self.store.write().ingest(&section, reading);
                    self.processed.fetch_add(1, Ordering::Relaxed);
                }
                Command::Configure { section, capacity } => {
                    tracing::debug!(section = %section, capacity, "window configured");
                    self.store.write().configure(&section, capacity);
                }
                Command::Flush(ack) => {
                    // Caller may have given up waiting
                    let _ = ack.send(());
                }
                Command::Shutdown => {
                    tracing::debug!("aggregation worker received shutdown");
                    break;
                }
            }
        }

        tracing::debug!(
            processed = self.processed.load(Ordering::Relaxed),
            "aggregation worker stopped"
        );
    }
}
