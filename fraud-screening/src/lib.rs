//! TriageRail Fraud Screening
//!
//! Timing heuristics over ledger entry timestamps. Strictly advisory: a
//! raised flag feeds a human review queue and never blocks the reward or
//! alert path. The system optimizes for low friction with eventual human
//! review, so a false positive must never withhold earned rewards.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod heuristic;
pub mod types;

pub use heuristic::{FraudConfig, FraudHeuristic};
pub use types::{FraudEvidence, FraudFlag, FraudReason};
