//! Core types for risk evaluation

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Opaque questionnaire responses
///
/// `BTreeMap` keeps iteration order deterministic, which keeps scoring
/// deterministic for identical input.
pub type Responses = BTreeMap<String, serde_json::Value>;

/// Risk category derived from the numeric score and flags
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum RiskCategory {
    /// No alert required
    Low = 1,
    /// Routine follow-up
    Medium = 2,
    /// Elevated risk
    High = 3,
    /// Immediate clinical attention
    Critical = 4,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskCategory::Low => "low",
            RiskCategory::Medium => "medium",
            RiskCategory::High => "high",
            RiskCategory::Critical => "critical",
        };
        write!(f, "{}", name)
    }
}

/// Result of evaluating one set of responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Numeric score from the pluggable scoring function
    pub score: i64,

    /// Flags raised by the scoring function
    pub flags: BTreeSet<String>,

    /// Derived category
    pub category: RiskCategory,
}

/// Score band thresholds (documented defaults, externally configurable)
///
/// Boundary values map to the higher band: a score exactly at
/// `critical` is critical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Scores at or above this are critical
    pub critical: i64,

    /// Scores at or above this are high
    pub high: i64,

    /// Scores at or above this are medium
    pub medium: i64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical: 150,
            high: 100,
            medium: 50,
        }
    }
}

impl RiskThresholds {
    /// Map a numeric score to its band
    pub fn categorize(&self, score: i64) -> RiskCategory {
        if score >= self.critical {
            RiskCategory::Critical
        } else if score >= self.high {
            RiskCategory::High
        } else if score >= self.medium {
            RiskCategory::Medium
        } else {
            RiskCategory::Low
        }
    }

    /// Reject threshold tables that are not strictly ordered
    pub fn validate(&self) -> Result<()> {
        if self.medium < self.high && self.high < self.critical {
            Ok(())
        } else {
            Err(Error::InvalidThresholds(format!(
                "require medium < high < critical, got {} / {} / {}",
                self.medium, self.high, self.critical
            )))
        }
    }
}
