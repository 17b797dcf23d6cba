//! Risk Engine for TriageRail
//!
//! Pure, deterministic risk evaluation of questionnaire responses.
//! Re-evaluating the same responses always yields the same result, so a
//! retried processing run can never produce a different alert priority
//! than the original run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod scoring;
pub mod types;

pub use error::{Error, Result};
pub use scoring::{RiskEvaluator, Scorer, WeightedScorer};
pub use types::{Responses, RiskCategory, RiskResult, RiskThresholds};
