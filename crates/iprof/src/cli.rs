use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use crate::config::{AggregatorConfig, Backpressure, DEFAULT_QUEUE_DEPTH, DEFAULT_WINDOW};
use crate::workload::WorkloadConfig;

#[derive(Parser, Debug)]
#[command(name = "iprof")]
#[command(about = "In-process instrumented profiling with sliding-window percentiles")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a synthetic workload and print per-section statistics
    Demo {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Stop after this long even if iterations remain (default: run to completion)
        #[arg(long, short = 'd', value_parser = parse_duration)]
        duration: Option<Duration>,

        /// Percentiles to report
        #[arg(long, short = 'P', value_delimiter = ',', default_value = "50,95,99")]
        percentiles: Vec<f64>,

        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,

        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Live view of a synthetic workload
    Watch {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Refresh interval
        #[arg(long, short = 'i', default_value = "250ms", value_parser = parse_duration)]
        interval: Duration,

        /// Pause between readings of each producer
        #[arg(long, default_value = "1ms", value_parser = parse_duration)]
        pace: Duration,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct WorkloadArgs {
    /// Section names to generate readings for
    #[arg(
        long,
        short = 's',
        value_delimiter = ',',
        default_value = "db.query,cache.lookup,http.handler"
    )]
    pub sections: Vec<String>,

    /// Number of producer threads
    #[arg(long, short = 'p', default_value = "4")]
    pub producers: usize,

    /// Readings per producer (demo only; watch runs until quit)
    #[arg(long, short = 'n', default_value = "10000")]
    pub iterations: u64,

    /// Window capacity per section
    #[arg(long, short = 'w', default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Ingestion queue depth
    #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,

    /// Drop readings instead of blocking when the queue is full
    #[arg(long)]
    pub drop_when_full: bool,

    /// Seed for reproducible synthetic latencies
    #[arg(long)]
    pub seed: Option<u64>,
}

impl WorkloadArgs {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        let backpressure = if self.drop_when_full {
            Backpressure::Drop
        } else {
            Backpressure::Block
        };
        AggregatorConfig::default()
            .with_default_window(self.window)
            .with_queue_depth(self.queue_depth)
            .with_backpressure(backpressure)
    }

    pub fn workload_config(&self, iterations: Option<u64>, pace: Option<Duration>) -> WorkloadConfig {
        WorkloadConfig {
            sections: self.sections.clone(),
            producers: self.producers,
            iterations,
            pace,
            seed: self.seed,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.sections.iter().any(|s| s.trim().is_empty()) {
            return Err("Section names must not be empty".to_string());
        }
        if self.producers == 0 || self.producers > 1024 {
            return Err(format!(
                "Producers must be between 1 and 1024, got {}",
                self.producers
            ));
        }
        if self.window == 0 {
            return Err("Window must be at least 1 sample".to_string());
        }
        if self.queue_depth == 0 {
            return Err("Queue depth must be at least 1".to_string());
        }
        Ok(())
    }
}

pub fn parse_duration(s: &str) -> Result<Duration, String> {
    // Try humantime first
    if let Ok(d) = humantime::parse_duration(s) {
        return Ok(d);
    }

    // Try bare number as seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    Err(format!(
        "Invalid duration '{}'. Examples: 250ms, 30s, 5m, 1h30m, 90",
        s
    ))
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Demo {
                workload,
                percentiles,
                ..
            } => {
                workload.validate()?;
                if let Some(p) = percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
                    return Err(format!("Percentiles must be between 0 and 100, got {}", p));
                }
                Ok(())
            }
            Command::Watch {
                workload, interval, ..
            } => {
                workload.validate()?;
                if interval.is_zero() {
                    return Err("Refresh interval must be greater than zero".to_string());
                }
                Ok(())
            }
            Command::Completions { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_demo_defaults() {
        let cli = Cli::try_parse_from(["iprof", "demo"]).unwrap();
        let Command::Demo {
            workload,
            percentiles,
            json,
            csv,
            ..
        } = cli.command
        else {
            panic!("expected demo");
        };
        assert_eq!(workload.sections.len(), 3);
        assert_eq!(workload.window, DEFAULT_WINDOW);
        assert_eq!(percentiles, vec![50.0, 95.0, 99.0]);
        assert!(!json && !csv);
        assert_eq!(workload.aggregator_config().backpressure, Backpressure::Block);
    }

    #[test]
    fn test_rejects_bad_percentile() {
        let cli = Cli::try_parse_from(["iprof", "demo", "-P", "50,101"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_producers() {
        let cli = Cli::try_parse_from(["iprof", "watch", "--producers", "0"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_drop_when_full() {
        let cli = Cli::try_parse_from(["iprof", "demo", "--drop-when-full", "-w", "10"]).unwrap();
        let Command::Demo { workload, .. } = cli.command else {
            panic!("expected demo");
        };
        let cfg = workload.aggregator_config();
        assert_eq!(cfg.backpressure, Backpressure::Drop);
        assert_eq!(cfg.default_window, 10);
    }
}
