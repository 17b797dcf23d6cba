//! Core types for submission processing

use alert_store::Alert;
use chrono::{DateTime, Utc};
use fraud_screening::FraudFlag;
use ledger_core::{BadgeId, LedgerEntry, SubjectId};
use risk_engine::{Responses, RiskResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Completed risk-assessment submission, delivered by the intake
/// collaborator
///
/// Immutable input: created once by intake, referenced but never mutated
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    /// Unique submission ID
    pub submission_id: Uuid,

    /// Subject who submitted
    pub subject_id: SubjectId,

    /// Opaque questionnaire responses
    pub responses: Responses,

    /// When the subject submitted
    pub submitted_at: DateTime<Utc>,

    /// Time the subject spent on the questionnaire
    pub client_elapsed_seconds: u32,
}

/// Everything one processing run produced
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Risk evaluation for this submission
    pub risk: RiskResult,

    /// Whether this run applied the ledger award (false on a duplicate run)
    pub entry_applied: bool,

    /// Ledger entry standing for the award
    pub ledger_entry: LedgerEntry,

    /// Subject balance after the award
    pub balance_after: i64,

    /// Badges the subject qualifies for after the award
    pub badges: BTreeSet<BadgeId>,

    /// Alert created (or pre-existing) for this submission, if any
    pub alert: Option<Alert>,

    /// Advisory fraud flag, if the heuristics fired
    pub fraud_flag: Option<FraudFlag>,
}
