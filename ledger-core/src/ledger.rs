//! Main ledger orchestration layer
//!
//! High-level API over storage for idempotent point awards, reversals,
//! balance reads and badge evaluation.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger, LedgerAction, SubjectId};
//!
//! fn main() -> ledger_core::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!
//!     let outcome = ledger.award(
//!         &SubjectId::new("U1"),
//!         LedgerAction::RiskAssessmentCompleted,
//!         "submission-1",
//!         150,
//!         "risk assessment completed",
//!     )?;
//!     assert!(outcome.applied);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    badges::BadgeCatalog,
    types::{idempotency_key, BadgeId, LedgerAction, LedgerEntry, SubjectId},
    Config, Error, Result, Storage,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

/// Result of an award attempt
#[derive(Debug, Clone)]
pub struct AwardOutcome {
    /// False when the idempotency key had already been applied
    pub applied: bool,

    /// The entry now standing for this key (new or pre-existing)
    pub entry: LedgerEntry,

    /// Subject balance after the attempt (consistent read)
    pub balance_after: i64,
}

/// Main ledger interface
pub struct Ledger {
    /// Storage backend
    storage: Arc<Storage>,

    /// Badge rule table (injected by the badge-catalog collaborator)
    catalog: BadgeCatalog,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        Ok(Self {
            storage,
            catalog: BadgeCatalog::default(),
        })
    }

    /// Set badge catalog
    pub fn with_catalog(mut self, catalog: BadgeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Award points for an action, at most once per (subject, action, reference)
    ///
    /// Safe under retries and duplicate deliveries: a repeated call returns
    /// `applied = false` and the original entry instead of double-crediting.
    pub fn award(
        &self,
        subject: &SubjectId,
        action: LedgerAction,
        reference_id: &str,
        points: i64,
        reason: impl Into<String>,
    ) -> Result<AwardOutcome> {
        if subject.is_empty() {
            return Err(Error::InvalidEntry("Subject ID must not be empty".to_string()));
        }
        if points <= 0 {
            return Err(Error::InvalidEntry("Award points must be positive".to_string()));
        }
        if action == LedgerAction::Reversal {
            return Err(Error::InvalidEntry(
                "Reversals go through Ledger::reverse".to_string(),
            ));
        }

        let key = idempotency_key(subject, action, reference_id);

        let entry = LedgerEntry {
            entry_id: Uuid::now_v7(),
            subject_id: subject.clone(),
            idempotency_key: key,
            action,
            points,
            created_at: Utc::now(),
            reason: reason.into(),
            reverses: None,
        };

        let applied = self.storage.insert_entry(&entry)?;

        let entry = if applied {
            tracing::info!(
                entry_id = %entry.entry_id,
                subject_id = %subject,
                action = %action,
                points,
                "Points awarded"
            );
            entry
        } else {
            // Duplicate delivery: hand back the entry that won
            self.storage
                .find_by_idempotency_key(&key)?
                .ok_or_else(|| Error::Storage("Idempotency key vanished".to_string()))?
        };

        let balance_after = self.storage.balance_of(subject)?;

        Ok(AwardOutcome {
            applied,
            entry,
            balance_after,
        })
    }

    /// Reverse a prior entry with a negative entry referencing it
    ///
    /// Fails with [`Error::AlreadyReversed`] when a reversal for the
    /// original already exists, and with [`Error::InvalidEntry`] when the
    /// original is itself a reversal.
    pub fn reverse(&self, original_entry_id: Uuid, reason: impl Into<String>) -> Result<LedgerEntry> {
        let original = self.storage.get_entry(original_entry_id)?;

        if original.is_reversal() {
            return Err(Error::InvalidEntry(
                "Cannot reverse a reversal entry".to_string(),
            ));
        }
        if self.storage.reversal_of(original_entry_id)?.is_some() {
            return Err(Error::AlreadyReversed(original_entry_id.to_string()));
        }

        let reference = original_entry_id.to_string();
        let reversal = LedgerEntry {
            entry_id: Uuid::now_v7(),
            subject_id: original.subject_id.clone(),
            idempotency_key: idempotency_key(
                &original.subject_id,
                LedgerAction::Reversal,
                &reference,
            ),
            action: LedgerAction::Reversal,
            points: -original.points,
            created_at: Utc::now(),
            reason: reason.into(),
            reverses: Some(original_entry_id),
        };

        // insert_entry re-checks the reversal index inside its critical
        // section, closing the race between two concurrent reverse calls
        let applied = self.storage.insert_entry(&reversal)?;
        if !applied {
            return Err(Error::AlreadyReversed(original_entry_id.to_string()));
        }

        tracing::info!(
            entry_id = %reversal.entry_id,
            original = %original_entry_id,
            subject_id = %reversal.subject_id,
            points = reversal.points,
            "Entry reversed"
        );

        Ok(reversal)
    }

    /// Subject balance: sum of all entries under one consistent read
    pub fn balance_of(&self, subject: &SubjectId) -> Result<i64> {
        self.storage.balance_of(subject)
    }

    /// All entries for a subject, oldest first
    pub fn entries_for_subject(&self, subject: &SubjectId) -> Result<Vec<LedgerEntry>> {
        self.storage.entries_for_subject(subject)
    }

    /// Get entry by ID
    pub fn get_entry(&self, entry_id: Uuid) -> Result<LedgerEntry> {
        self.storage.get_entry(entry_id)
    }

    /// Badges the subject currently qualifies for
    ///
    /// Recomputed over the entry set on every call; never cached.
    pub fn eligible_badges(&self, subject: &SubjectId) -> Result<BTreeSet<BadgeId>> {
        let entries = self.storage.entries_for_subject(subject)?;
        Ok(self.catalog.eligible_badges(&entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badges::BadgeRule;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_ledger() -> (Ledger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        (Ledger::open(config).unwrap(), temp_dir)
    }

    #[test]
    fn test_award_applies_once() {
        let (ledger, _temp) = test_ledger();
        let subject = SubjectId::new("U1");

        let first = ledger
            .award(&subject, LedgerAction::RiskAssessmentCompleted, "S1", 150, "done")
            .unwrap();
        assert!(first.applied);
        assert_eq!(first.balance_after, 150);

        let second = ledger
            .award(&subject, LedgerAction::RiskAssessmentCompleted, "S1", 150, "retry")
            .unwrap();
        assert!(!second.applied);
        assert_eq!(second.balance_after, 150);
        assert_eq!(second.entry.entry_id, first.entry.entry_id);
    }

    #[test]
    fn test_concurrent_awards_single_winner() {
        let (ledger, _temp) = test_ledger();
        let ledger = std::sync::Arc::new(ledger);
        let applied_count = std::sync::Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            let applied_count = applied_count.clone();
            handles.push(std::thread::spawn(move || {
                let outcome = ledger
                    .award(
                        &SubjectId::new("U1"),
                        LedgerAction::RiskAssessmentCompleted,
                        "S1",
                        150,
                        "race",
                    )
                    .unwrap();
                if outcome.applied {
                    applied_count.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(applied_count.load(Ordering::SeqCst), 1);
        assert_eq!(ledger.balance_of(&SubjectId::new("U1")).unwrap(), 150);
    }

    #[test]
    fn test_award_rejects_invalid_input() {
        let (ledger, _temp) = test_ledger();

        let err = ledger
            .award(&SubjectId::new(""), LedgerAction::AccountCreated, "r", 10, "x")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));

        let err = ledger
            .award(&SubjectId::new("U1"), LedgerAction::AccountCreated, "r", 0, "x")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));

        let err = ledger
            .award(&SubjectId::new("U1"), LedgerAction::Reversal, "r", 10, "x")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));
    }

    #[test]
    fn test_reverse_reduces_balance_exactly() {
        let (ledger, _temp) = test_ledger();
        let subject = SubjectId::new("U1");

        let outcome = ledger
            .award(&subject, LedgerAction::RiskAssessmentCompleted, "S1", 150, "done")
            .unwrap();
        ledger
            .award(&subject, LedgerAction::DocumentApproved, "D1", 25, "doc")
            .unwrap();
        assert_eq!(ledger.balance_of(&subject).unwrap(), 175);

        let reversal = ledger.reverse(outcome.entry.entry_id, "fraudulent").unwrap();
        assert_eq!(reversal.points, -150);
        assert_eq!(reversal.reverses, Some(outcome.entry.entry_id));
        assert_eq!(ledger.balance_of(&subject).unwrap(), 25);

        let err = ledger.reverse(outcome.entry.entry_id, "again").unwrap_err();
        assert!(matches!(err, Error::AlreadyReversed(_)));
    }

    #[test]
    fn test_reverse_of_reversal_rejected() {
        let (ledger, _temp) = test_ledger();
        let subject = SubjectId::new("U1");

        let outcome = ledger
            .award(&subject, LedgerAction::RiskAssessmentCompleted, "S1", 150, "done")
            .unwrap();
        let reversal = ledger.reverse(outcome.entry.entry_id, "oops").unwrap();

        let err = ledger.reverse(reversal.entry_id, "undo the undo").unwrap_err();
        assert!(matches!(err, Error::InvalidEntry(_)));
    }

    #[test]
    fn test_eligible_badges_recomputed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let ledger = Ledger::open(config).unwrap().with_catalog(BadgeCatalog::new(vec![
            BadgeRule {
                badge_id: BadgeId::new("points_150"),
                min_balance: Some(150),
                min_action_count: None,
            },
        ]));

        let subject = SubjectId::new("U1");
        assert!(ledger.eligible_badges(&subject).unwrap().is_empty());

        let outcome = ledger
            .award(&subject, LedgerAction::RiskAssessmentCompleted, "S1", 150, "done")
            .unwrap();
        assert!(ledger
            .eligible_badges(&subject)
            .unwrap()
            .contains(&BadgeId::new("points_150")));

        ledger.reverse(outcome.entry.entry_id, "reversed").unwrap();
        assert!(ledger.eligible_badges(&subject).unwrap().is_empty());
    }
}
