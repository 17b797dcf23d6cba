//! Error types for the risk engine

use thiserror::Error;

/// Result type for risk engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Risk engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid threshold configuration
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(String),
}
