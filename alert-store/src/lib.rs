//! TriageRail Alert Store
//!
//! Persistent clinical alert records with a validated lifecycle state
//! machine and SLA deadlines.
//!
//! # Invariants
//!
//! - One submission has at most one live (non-terminal) alert
//! - Status changes only happen through defined transitions; illegal
//!   transitions fail with `InvalidTransition`, never silently coerce
//! - Terminal alerts are retained for audit, never deleted

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod state;
pub mod store;
pub mod types;

// Re-exports
pub use config::{Config, SlaConfig};
pub use error::{Error, Result};
pub use store::AlertStore;
pub use types::{Alert, AlertEvent, AlertPriority, AlertStatus};
