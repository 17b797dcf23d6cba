//! Timing-based fraud heuristics
//!
//! Thresholds are documented configuration, not hidden tuning:
//!
//! - `rapid_account_age_secs` (threshold A): a submission arriving within
//!   A of account creation, with every required document approved within
//!   `approval_window_secs` (threshold B) of the submission, raises
//!   `rapid_progression`
//! - `burst_gap_secs`: two or more approvals landing within this span of
//!   each other raise `instant_approval_chain` when the A-gate is not met
//! - `min_completion_secs`: a client-reported questionnaire time under
//!   this floor raises `rushed_completion` when no ledger-timing rule
//!   fired

use crate::types::{FraudEvidence, FraudFlag, FraudReason};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ledger_core::{Ledger, LedgerAction, SubjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Heuristic thresholds (documented defaults, externally configurable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudConfig {
    /// Threshold A: account age below which progression counts as rapid
    pub rapid_account_age_secs: i64,

    /// Threshold B: approvals must all sit within this window before the
    /// submission for the rapid-progression rule
    pub approval_window_secs: i64,

    /// Maximum span between approvals for the instant-chain rule
    pub burst_gap_secs: i64,

    /// Floor on client-reported questionnaire completion time
    pub min_completion_secs: u32,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            rapid_account_age_secs: 600,
            approval_window_secs: 120,
            burst_gap_secs: 10,
            min_completion_secs: 30,
        }
    }
}

/// Inspects submission timing against ledger entry timestamps
pub struct FraudHeuristic {
    config: FraudConfig,

    /// Append-only in-process flag registry; durable storage belongs to
    /// the review-queue collaborator
    flags: DashMap<SubjectId, Vec<FraudFlag>>,
}

impl FraudHeuristic {
    /// Create heuristic with thresholds
    pub fn new(config: FraudConfig) -> Self {
        Self {
            config,
            flags: DashMap::new(),
        }
    }

    /// Inspect a submission's timing features
    ///
    /// Advisory: a ledger read failure degrades to "no flag" with a
    /// warning rather than failing the processing run.
    pub fn inspect(
        &self,
        subject: &SubjectId,
        submission_id: Uuid,
        submitted_at: DateTime<Utc>,
        client_elapsed_seconds: u32,
        ledger: &Ledger,
    ) -> Option<FraudFlag> {
        let entries = match ledger.entries_for_subject(subject) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(subject_id = %subject, error = %e, "Fraud inspection skipped");
                return None;
            }
        };

        let account_created_at = entries
            .iter()
            .find(|e| e.action == LedgerAction::AccountCreated)
            .map(|e| e.created_at)?;

        let approvals: Vec<DateTime<Utc>> = entries
            .iter()
            .filter(|e| e.action == LedgerAction::DocumentApproved && !e.is_reversal())
            .map(|e| e.created_at)
            .collect();

        let account_age = submitted_at - account_created_at;
        let reason = self.classify(account_age, &approvals, submitted_at, client_elapsed_seconds)?;

        let (first, last) = match (approvals.iter().min(), approvals.iter().max()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (submitted_at, submitted_at),
        };

        let flag = FraudFlag {
            flag_id: Uuid::now_v7(),
            subject_id: subject.clone(),
            submission_id,
            reason,
            evidence: FraudEvidence {
                account_age_secs: account_age.num_seconds(),
                approval_span_secs: (last - first).num_seconds(),
                last_approval_to_submission_secs: (submitted_at - last).num_seconds(),
                approvals_considered: approvals.len(),
                client_elapsed_secs: client_elapsed_seconds,
                submitted_at,
            },
            created_at: Utc::now(),
        };

        tracing::warn!(
            flag_id = %flag.flag_id,
            subject_id = %subject,
            reason = %reason,
            account_age_secs = flag.evidence.account_age_secs,
            "Fraud flag raised"
        );

        self.flags
            .entry(subject.clone())
            .or_default()
            .push(flag.clone());

        Some(flag)
    }

    fn classify(
        &self,
        account_age: Duration,
        approvals: &[DateTime<Utc>],
        submitted_at: DateTime<Utc>,
        client_elapsed_seconds: u32,
    ) -> Option<FraudReason> {
        if !approvals.is_empty() {
            let window = Duration::seconds(self.config.approval_window_secs);
            let all_in_window = approvals
                .iter()
                .all(|t| *t <= submitted_at && submitted_at - *t <= window);

            if account_age >= Duration::zero()
                && account_age < Duration::seconds(self.config.rapid_account_age_secs)
                && all_in_window
            {
                return Some(FraudReason::RapidProgression);
            }

            if approvals.len() >= 2 {
                let first = approvals.iter().min()?;
                let last = approvals.iter().max()?;
                if *last - *first <= Duration::seconds(self.config.burst_gap_secs) {
                    return Some(FraudReason::InstantApprovalChain);
                }
            }
        }

        if client_elapsed_seconds < self.config.min_completion_secs {
            return Some(FraudReason::RushedCompletion);
        }

        None
    }

    /// Flags raised for a subject so far (review-queue hand-off)
    pub fn flags_for(&self, subject: &SubjectId) -> Vec<FraudFlag> {
        self.flags
            .get(subject)
            .map(|flags| flags.clone())
            .unwrap_or_default()
    }
}

impl Default for FraudHeuristic {
    fn default() -> Self {
        Self::new(FraudConfig::default())
    }
}
