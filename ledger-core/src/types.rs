//! Core types for the ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exactly-once accounting (idempotency keys over signed integer points)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Subject identifier (the user the points belong to)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create new subject ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty (rejected by validation)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Badge identifier from the badge catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BadgeId(String);

impl BadgeId {
    /// Create new badge ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BadgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rewardable action a ledger entry accounts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LedgerAction {
    /// Subject account was created
    AccountCreated = 1,
    /// A required document was approved
    DocumentApproved = 2,
    /// Subject profile completed
    ProfileCompleted = 3,
    /// Risk assessment (questionnaire) completed
    RiskAssessmentCompleted = 4,
    /// Reversal of a prior entry (negative points)
    Reversal = 5,
}

impl LedgerAction {
    /// Stable wire name, used in idempotency key derivation
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerAction::AccountCreated => "account_created",
            LedgerAction::DocumentApproved => "document_approved",
            LedgerAction::ProfileCompleted => "profile_completed",
            LedgerAction::RiskAssessmentCompleted => "risk_assessment_completed",
            LedgerAction::Reversal => "reversal",
        }
    }
}

impl fmt::Display for LedgerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic idempotency key: SHA-256 over subject, action and reference.
///
/// The same logical action for the same subject and reference always hashes
/// to the same key, regardless of which delivery pathway computes it.
pub fn idempotency_key(subject: &SubjectId, action: LedgerAction, reference_id: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(action.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(reference_id.as_bytes());
    hasher.finalize().into()
}

/// Immutable accounting record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry ID (UUIDv7 for time-ordering)
    pub entry_id: Uuid,

    /// Subject the points belong to
    pub subject_id: SubjectId,

    /// Deterministic key enforcing at-most-once application
    pub idempotency_key: [u8; 32],

    /// Action this entry accounts for
    pub action: LedgerAction,

    /// Signed points delta (negative = reversal)
    pub points: i64,

    /// Entry creation timestamp
    pub created_at: DateTime<Utc>,

    /// Human-readable reason
    pub reason: String,

    /// Original entry this one reverses, if any
    pub reverses: Option<Uuid>,
}

impl LedgerEntry {
    /// True for reversal entries
    pub fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }
}
