use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Aggregator is closed; the worker thread is no longer accepting readings")]
    AggregatorClosed,

    #[error("Window capacity for section '{section}' must be at least 1")]
    InvalidWindow { section: String },

    #[error("Invalid aggregator configuration: {0}")]
    InvalidConfig(String),

    #[error("Global aggregator is already initialized")]
    AlreadyInitialized,

    #[error("Failed to spawn aggregation worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Workload error: {0}")]
    Workload(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const AGGREGATOR_CLOSED: i32 = 3;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::InvalidWindow { .. } => exit_code::INVALID_ARGUMENTS,
            Error::AggregatorClosed => exit_code::AGGREGATOR_CLOSED,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            Error::InvalidArgument("x".into()).exit_code(),
            exit_code::INVALID_ARGUMENTS
        );
        assert_eq!(
            Error::AggregatorClosed.exit_code(),
            exit_code::AGGREGATOR_CLOSED
        );
        assert_eq!(
            Error::AlreadyInitialized.exit_code(),
            exit_code::GENERAL_ERROR
        );
    }
}
