//! In-process instrumented profiling.
//!
//! Mark the start and end of named sections (or log durations measured
//! elsewhere) and query count, mean and percentiles over a bounded window of
//! the most recent readings per section.
//!
//! ```rust,ignore
//! let agg = iprof::Aggregator::new(iprof::AggregatorConfig::default())?;
//! let timer = agg.begin("db.query");
//! run_query();
//! timer.end()?;
//!
//! if let Some(s) = agg.stat("db.query") {
//!     println!("{} samples, mean {:.2}ms, p99 {:.2}ms", s.count, s.mean, s.percentile(99.0));
//! }
//! ```
//!
//! All mutation happens on a single worker thread fed through a bounded
//! channel; queries copy a section under a read lock and never block ingestion
//! for longer than that copy.

pub mod aggregator;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod global;
pub mod reading;
pub mod stats;
pub mod tui;
pub mod window;
pub mod workload;

mod worker;

pub use aggregator::{Aggregator, SectionTimer};
pub use config::{AggregatorConfig, Backpressure, DEFAULT_WINDOW};
pub use error::{Error, Result};
pub use reading::Reading;
pub use stats::{Percentiles, SectionStats};
