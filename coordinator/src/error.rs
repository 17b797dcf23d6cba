//! Error types for the coordinator

use thiserror::Error;
use uuid::Uuid;

/// Result type for coordinator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coordinator errors
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed submission; rejected before lock acquisition, not retried
    #[error("Validation error: {0}")]
    Validation(String),

    /// Another process run holds the lease for this submission; retry
    /// after a short delay
    #[error("Processing already in flight for submission {0}")]
    LockHeld(Uuid),

    /// Ledger failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger_core::Error),

    /// Alert store failure
    #[error("Alert store error: {0}")]
    Alerts(#[from] alert_store::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures the calling infrastructure should retry
    /// (redelivery plus idempotency makes the retry safe)
    ///
    /// `Validation` and invalid alert transitions are terminal and go back
    /// to the caller; storage unavailability and held leases are the
    /// recoverable class.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::LockHeld(_) => true,
            Error::Ledger(ledger_core::Error::Storage(_)) => true,
            Error::Ledger(ledger_core::Error::Io(_)) => true,
            Error::Alerts(alert_store::Error::Storage(_)) => true,
            Error::Alerts(alert_store::Error::Io(_)) => true,
            _ => false,
        }
    }
}
