//! Core types for fraud screening

use chrono::{DateTime, Utc};
use ledger_core::SubjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why a flag was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FraudReason {
    /// Account creation to submission faster than plausible
    RapidProgression,
    /// Required approvals landed in an implausibly tight burst
    InstantApprovalChain,
    /// Questionnaire completed faster than a human plausibly reads it
    RushedCompletion,
    /// Catch-all for manually raised flags
    Other,
}

impl fmt::Display for FraudReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FraudReason::RapidProgression => "rapid_progression",
            FraudReason::InstantApprovalChain => "instant_approval_chain",
            FraudReason::RushedCompletion => "rushed_completion",
            FraudReason::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Timing features that triggered the flag, kept for the reviewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudEvidence {
    /// Seconds from account creation to the submission
    pub account_age_secs: i64,

    /// Seconds between the earliest and latest document approval
    pub approval_span_secs: i64,

    /// Seconds from the latest approval to the submission
    pub last_approval_to_submission_secs: i64,

    /// Number of document approvals considered
    pub approvals_considered: usize,

    /// Seconds the subject spent on the questionnaire (client-reported)
    pub client_elapsed_secs: u32,

    /// Submission timestamp the features were computed against
    pub submitted_at: DateTime<Utc>,
}

/// Advisory fraud flag, consumed by the review-queue collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudFlag {
    /// Unique flag ID (UUIDv7)
    pub flag_id: Uuid,

    /// Subject the flag concerns
    pub subject_id: SubjectId,

    /// Submission that triggered the inspection
    pub submission_id: Uuid,

    /// Heuristic that fired
    pub reason: FraudReason,

    /// Supporting timing features
    pub evidence: FraudEvidence,

    /// Flag creation timestamp
    pub created_at: DateTime<Utc>,
}
