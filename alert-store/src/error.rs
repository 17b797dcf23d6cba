//! Error types for the alert store

use crate::types::{AlertEvent, AlertStatus};
use thiserror::Error;

/// Result type for alert store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Alert store errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Alert not found
    #[error("Alert not found: {0}")]
    AlertNotFound(String),

    /// Requested event is not legal from the current status
    #[error("Invalid transition: {event} from {from}")]
    InvalidTransition {
        /// Status the alert was in
        from: AlertStatus,
        /// Event that was requested
        event: AlertEvent,
    },

    /// Event requires a human actor and none was given
    #[error("Event {0} requires an actor")]
    MissingActor(AlertEvent),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
