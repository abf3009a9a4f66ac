use crate::error::{Error, Result};

/// Readings retained per section unless overridden
pub const DEFAULT_WINDOW: usize = 5000;

/// Commands the ingestion queue holds before producers feel backpressure
pub const DEFAULT_QUEUE_DEPTH: usize = 4096;

/// What a producer does when the ingestion queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backpressure {
    /// Wait for the worker to make room
    #[default]
    Block,
    /// Discard the reading and count it in `Aggregator::dropped`
    Drop,
}

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Window capacity for sections without an explicit override
    pub default_window: usize,
    /// Bound of the ingestion channel
    pub queue_depth: usize,
    pub backpressure: Backpressure,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        AggregatorConfig {
            default_window: DEFAULT_WINDOW,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            backpressure: Backpressure::Block,
        }
    }
}

impl AggregatorConfig {
    pub fn with_default_window(mut self, window: usize) -> Self {
        self.default_window = window;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth;
        self
    }

    pub fn with_backpressure(mut self, backpressure: Backpressure) -> Self {
        self.backpressure = backpressure;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_window == 0 {
            return Err(Error::InvalidConfig(
                "default window must be at least 1 sample".to_string(),
            ));
        }
        if self.queue_depth == 0 {
            return Err(Error::InvalidConfig(
                "queue depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
