//! Process-wide default aggregator.
//!
//! Convenience for code that does not want to thread an [`Aggregator`]
//! through its call graph. The instance is created on first use and lives
//! until the process exits.

use crate::aggregator::{Aggregator, SectionTimer};
use crate::config::AggregatorConfig;
use crate::error::{Error, Result};
use crate::stats::SectionStats;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::time::Duration;

static GLOBAL: OnceCell<Aggregator> = OnceCell::new();

/// Create the default aggregator with a custom config.
///
/// Must run before any other function in this module touches it.
pub fn init(config: AggregatorConfig) -> Result<&'static Aggregator> {
    let mut created = false;
    let agg = GLOBAL.get_or_try_init(|| {
        created = true;
        Aggregator::new(config)
    })?;
    if created {
        Ok(agg)
    } else {
        Err(Error::AlreadyInitialized)
    }
}

/// The default aggregator, created with default settings if needed
pub fn global() -> Result<&'static Aggregator> {
    GLOBAL.get_or_try_init(|| Aggregator::new(AggregatorConfig::default()))
}

pub fn start(section: &str) -> Result<SectionTimer> {
    Ok(global()?.begin(section))
}

pub fn log(section: &str, duration: Duration, end: DateTime<Utc>) -> Result<()> {
    global()?.record(section, duration, end)
}

/// Should be called before the first reading of `section`
pub fn set_window(section: &str, capacity: usize) -> Result<()> {
    global()?.configure_window(section, capacity)
}

pub fn stat(section: &str) -> Result<Option<SectionStats>> {
    Ok(global()?.stat(section))
}

pub fn stats() -> Result<BTreeMap<String, SectionStats>> {
    Ok(global()?.stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_round_trip() {
        set_window("global.test", 3).unwrap();
        for i in 0..5 {
            log("global.test", Duration::from_millis(i * 10), Utc::now()).unwrap();
        }
        global().unwrap().flush().unwrap();

        let s = stat("global.test").unwrap().unwrap();
        assert_eq!(s.count, 3);
        assert_eq!(s.total, 5);
        assert_eq!(s.mean, 30.0);
        assert!(stats().unwrap().contains_key("global.test"));

        assert!(matches!(
            init(AggregatorConfig::default()),
            Err(Error::AlreadyInitialized)
        ));
    }
}
