//! Synthetic producers used by the `demo` and `watch` commands.

use crate::aggregator::Aggregator;
use crate::error::{Error, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Section timing each producer's batch of submissions
pub const BATCH_SECTION: &str = "iprof.submit_batch";

const BATCH_SIZE: u64 = 100;

/// Chance that a reading lands in the slow tail
const TAIL_PROBABILITY: f64 = 0.02;

#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub sections: Vec<String>,
    pub producers: usize,
    /// Readings per producer; `None` runs until stopped
    pub iterations: Option<u64>,
    /// Pause between readings
    pub pace: Option<Duration>,
    pub seed: Option<u64>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        WorkloadConfig {
            sections: vec![
                "db.query".to_string(),
                "cache.lookup".to_string(),
                "http.handler".to_string(),
            ],
            producers: 4,
            iterations: Some(10_000),
            pace: None,
            seed: None,
        }
    }
}

/// Latency shape of a synthetic section
#[derive(Debug, Clone, PartialEq)]
pub struct SectionProfile {
    pub name: String,
    pub base_ms: f64,
}

impl SectionProfile {
    /// Derive a stable base latency (1..=50ms) from the section name
    pub fn for_name(name: &str) -> Self {
        let hash = name
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
                (acc ^ b as u64).wrapping_mul(0x100000001b3)
            });
        SectionProfile {
            name: name.to_string(),
            base_ms: 1.0 + (hash % 50) as f64,
        }
    }

    fn sample(&self, rng: &mut impl Rng) -> Duration {
        let mut ms = self.base_ms * (1.0 + rng.gen_range(-0.3..0.3));
        if rng.gen_bool(TAIL_PROBABILITY) {
            ms *= rng.gen_range(5.0..10.0);
        }
        Duration::from_secs_f64(ms.max(0.0) / 1000.0)
    }
}

/// Running set of producer threads
pub struct Workload {
    handles: Vec<JoinHandle<Result<u64>>>,
    running: Arc<AtomicBool>,
    submitted: Arc<AtomicU64>,
}

impl Workload {
    pub fn start(aggregator: &Aggregator, config: &WorkloadConfig) -> Result<Self> {
        if config.sections.is_empty() {
            return Err(Error::InvalidArgument(
                "workload needs at least one section".to_string(),
            ));
        }
        if config.producers == 0 {
            return Err(Error::InvalidArgument(
                "workload needs at least one producer".to_string(),
            ));
        }

        let profiles: Arc<Vec<SectionProfile>> = Arc::new(
            config
                .sections
                .iter()
                .map(|s| SectionProfile::for_name(s))
                .collect(),
        );
        let running = Arc::new(AtomicBool::new(true));
        let submitted = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(config.producers);
        for id in 0..config.producers {
            let agg = aggregator.clone();
            let profiles = profiles.clone();
            let running = running.clone();
            let submitted = submitted.clone();
            let iterations = config.iterations;
            let pace = config.pace;
            let rng = match config.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
                None => StdRng::from_entropy(),
            };

            let handle = thread::Builder::new()
                .name(format!("iprof-producer-{id}"))
                .spawn(move || {
                    produce(&agg, &profiles, rng, iterations, pace, &running, &submitted)
                })?;
            handles.push(handle);
        }

        tracing::debug!(
            producers = config.producers,
            sections = config.sections.len(),
            "workload started"
        );

        Ok(Workload {
            handles,
            running,
            submitted,
        })
    }

    /// Ask producers to stop after their current reading
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handles.iter().all(|h| h.is_finished())
    }

    /// Readings submitted so far across all producers
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Wait for all producers; returns the number of readings they submitted
    pub fn join(self) -> Result<u64> {
        let mut total = 0;
        for handle in self.handles {
            match handle.join() {
                Ok(result) => total += result?,
                Err(_) => {
                    return Err(Error::Workload("producer thread panicked".to_string()));
                }
            }
        }
        Ok(total)
    }
}

fn produce(
    agg: &Aggregator,
    profiles: &[SectionProfile],
    mut rng: StdRng,
    iterations: Option<u64>,
    pace: Option<Duration>,
    running: &AtomicBool,
    submitted: &AtomicU64,
) -> Result<u64> {
    let mut count = 0u64;
    let mut batch = agg.begin(BATCH_SECTION);

    while running.load(Ordering::Relaxed) {
        if let Some(limit) = iterations
            && count >= limit
        {
            break;
        }

        let profile = &profiles[rng.gen_range(0..profiles.len())];
        agg.record(&profile.name, profile.sample(&mut rng), Utc::now())?;
        count += 1;
        submitted.fetch_add(1, Ordering::Relaxed);

        if count.is_multiple_of(BATCH_SIZE) {
            batch.end()?;
            batch = agg.begin(BATCH_SECTION);
        }

        if let Some(pause) = pace {
            thread::sleep(pause);
        }
    }

    Ok(count)
}
