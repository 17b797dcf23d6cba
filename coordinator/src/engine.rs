//! Submission processing core
//!
//! `process` is the single authoritative code path for a completed
//! submission. The request-time caller and the deferred job worker both
//! call it; every mutation behind it is idempotent, so the outcomes
//! converge no matter which pathway runs first, runs twice, or never runs.

use crate::{
    config::Config,
    lock::SubmissionLocks,
    metrics,
    notify::{Notifier, NotifyEvent},
    types::{ProcessingOutcome, Submission},
    Error, Result,
};
use alert_store::{AlertPriority, AlertStore};
use chrono::{Duration, Utc};
use fraud_screening::FraudHeuristic;
use ledger_core::{BadgeCatalog, Ledger, LedgerAction};
use risk_engine::{RiskCategory, RiskEvaluator};
use std::sync::Arc;

/// Allowed clock skew on submission timestamps
const MAX_FUTURE_SKEW_SECS: i64 = 300;

/// Orchestration core
pub struct Coordinator {
    ledger: Arc<Ledger>,
    alerts: Arc<AlertStore>,
    evaluator: RiskEvaluator,
    fraud: FraudHeuristic,
    locks: SubmissionLocks,
    notifier: Arc<dyn Notifier>,
    config: Config,
}

impl Coordinator {
    /// Open coordinator with configuration and a notification collaborator
    pub fn open(config: Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        Self::open_with_catalog(config, notifier, BadgeCatalog::default())
    }

    /// Open coordinator with a badge catalog from the catalog collaborator
    pub fn open_with_catalog(
        config: Config,
        notifier: Arc<dyn Notifier>,
        catalog: BadgeCatalog,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = Arc::new(Ledger::open(config.ledger.clone())?.with_catalog(catalog));
        let alerts = Arc::new(AlertStore::open(config.alerts.clone())?);
        let evaluator = RiskEvaluator::new(config.thresholds.clone());
        let fraud = FraudHeuristic::new(config.fraud.clone());
        let locks = SubmissionLocks::new(std::time::Duration::from_secs(config.lock_ttl_secs));

        Ok(Self {
            ledger,
            alerts,
            evaluator,
            fraud,
            locks,
            notifier,
            config,
        })
    }

    /// Points ledger (balance and entry reads for collaborators)
    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Alert store (human transitions and dashboard listings)
    pub fn alerts(&self) -> &Arc<AlertStore> {
        &self.alerts
    }

    /// Process one completed submission
    ///
    /// Failure semantics: the steps behind the lease are independently
    /// retryable. A crash between alert creation and the ledger award is
    /// recovered by re-invoking `process` for the same submission; alert
    /// creation becomes a no-op and the award proceeds. Notification
    /// failures never roll anything back.
    pub async fn process(&self, submission: &Submission) -> Result<ProcessingOutcome> {
        self.validate(submission)?;

        let _lease = self
            .locks
            .try_acquire(submission.submission_id)
            .ok_or(Error::LockHeld(submission.submission_id))?;
        let timer = metrics::PROCESS_DURATION.start_timer();

        let risk = self.evaluator.evaluate(&submission.responses);

        let alert = match Self::priority_for(risk.category) {
            Some(priority) => Some(self.alerts.create(
                submission.submission_id,
                submission.subject_id.clone(),
                risk.category,
                priority,
                risk.score,
            )?),
            None => None,
        };

        // The reward is keyed by submission identity, not wall-clock
        // order, so it is safe regardless of which pathway gets here first
        let award = self.ledger.award(
            &submission.subject_id,
            LedgerAction::RiskAssessmentCompleted,
            &submission.submission_id.to_string(),
            self.config.award_points,
            "risk assessment completed",
        )?;

        let badges = self.ledger.eligible_badges(&submission.subject_id)?;

        let fraud_flag = self.fraud.inspect(
            &submission.subject_id,
            submission.submission_id,
            submission.submitted_at,
            submission.client_elapsed_seconds,
            &self.ledger,
        );

        if award.applied {
            if let Some(alert) = &alert {
                metrics::ALERTS_CREATED_TOTAL
                    .with_label_values(&[&alert.priority.to_string()])
                    .inc();
            }
        }
        if let Some(flag) = &fraud_flag {
            metrics::FRAUD_FLAGS_TOTAL
                .with_label_values(&[&flag.reason.to_string()])
                .inc();
        }
        let status = if award.applied { "applied" } else { "duplicate" };
        metrics::SUBMISSIONS_PROCESSED_TOTAL
            .with_label_values(&[status])
            .inc();
        timer.observe_duration();

        tracing::info!(
            submission_id = %submission.submission_id,
            subject_id = %submission.subject_id,
            score = risk.score,
            category = %risk.category,
            applied = award.applied,
            alert = alert.as_ref().map(|a| a.alert_id.to_string()).unwrap_or_default(),
            "Submission processed"
        );

        // At-least-once outward delivery; receivers dedup on alert/flag ID
        if let Some(alert) = &alert {
            self.emit(NotifyEvent::alert_created(alert)).await;
        }
        if let Some(flag) = &fraud_flag {
            self.emit(NotifyEvent::fraud_flagged(flag)).await;
        }

        Ok(ProcessingOutcome {
            risk,
            entry_applied: award.applied,
            ledger_entry: award.entry,
            balance_after: award.balance_after,
            badges,
            alert,
            fraud_flag,
        })
    }

    /// Best-effort notification with an independent timeout
    async fn emit(&self, event: NotifyEvent) {
        let timeout = std::time::Duration::from_millis(self.config.notify_timeout_ms);
        match tokio::time::timeout(timeout, self.notifier.notify(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Notification delivery failed"),
            Err(_) => tracing::warn!(timeout_ms = self.config.notify_timeout_ms, "Notification timed out"),
        }
    }

    fn priority_for(category: RiskCategory) -> Option<AlertPriority> {
        match category {
            RiskCategory::Critical => Some(AlertPriority::Emergency),
            RiskCategory::High => Some(AlertPriority::Urgent),
            RiskCategory::Medium => Some(AlertPriority::High),
            RiskCategory::Low => None,
        }
    }

    /// Reject malformed submissions before any lock or mutation
    fn validate(&self, submission: &Submission) -> Result<()> {
        if submission.submission_id.is_nil() {
            return Err(Error::Validation("submission_id must be set".to_string()));
        }
        if submission.subject_id.is_empty() {
            return Err(Error::Validation("subject_id must not be empty".to_string()));
        }
        if submission.responses.is_empty() {
            return Err(Error::Validation("responses must not be empty".to_string()));
        }
        if submission.submitted_at > Utc::now() + Duration::seconds(MAX_FUTURE_SKEW_SECS) {
            return Err(Error::Validation(
                "submitted_at is in the future".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::test_support::RecordingNotifier;
    use alert_store::AlertStatus;
    use ledger_core::SubjectId;
    use serde_json::json;
    use uuid::Uuid;

    fn test_coordinator(notifier: Arc<RecordingNotifier>) -> (Coordinator, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.ledger.data_dir = temp_dir.path().join("ledger");
        config.alerts.data_dir = temp_dir.path().join("alerts");
        let coordinator = Coordinator::open(config, notifier).unwrap();
        (coordinator, temp_dir)
    }

    fn submission(subject: &str, responses: &[(&str, serde_json::Value)]) -> Submission {
        Submission {
            submission_id: Uuid::now_v7(),
            subject_id: SubjectId::new(subject),
            responses: responses
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            submitted_at: Utc::now(),
            client_elapsed_seconds: 240,
        }
    }

    #[tokio::test]
    async fn test_emergency_end_to_end() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier.clone());

        let submission = submission(
            "U1",
            &[("phq9_total", json!(160)), ("flags", json!(["suicide_risk"]))],
        );
        let outcome = coordinator.process(&submission).await.unwrap();

        assert_eq!(outcome.risk.category, RiskCategory::Critical);
        assert!(outcome.entry_applied);
        assert_eq!(outcome.ledger_entry.points, 150);
        assert_eq!(outcome.balance_after, 150);
        assert!(outcome.fraud_flag.is_none());

        let alert = outcome.alert.unwrap();
        assert_eq!(alert.priority, AlertPriority::Emergency);
        assert_eq!(alert.status, AlertStatus::Pending);
        assert_eq!(alert.sla_deadline, alert.created_at + Duration::hours(1));

        assert_eq!(
            coordinator
                .ledger()
                .balance_of(&SubjectId::new("U1"))
                .unwrap(),
            150
        );
        assert_eq!(notifier.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_category_creates_no_alert_but_awards() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier.clone());

        let submission = submission("U1", &[("phq9_total", json!(10))]);
        let outcome = coordinator.process(&submission).await.unwrap();

        assert_eq!(outcome.risk.category, RiskCategory::Low);
        assert!(outcome.alert.is_none());
        assert!(outcome.entry_applied);
        assert!(notifier.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reprocessing_is_idempotent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier);

        let submission = submission("U1", &[("phq9_total", json!(120))]);

        let first = coordinator.process(&submission).await.unwrap();
        let second = coordinator.process(&submission).await.unwrap();

        assert!(first.entry_applied);
        assert!(!second.entry_applied);
        assert_eq!(second.balance_after, first.balance_after);
        assert_eq!(
            first.alert.as_ref().unwrap().alert_id,
            second.alert.as_ref().unwrap().alert_id
        );
        // Re-evaluation produced the identical risk result
        assert_eq!(first.risk, second.risk);
    }

    #[tokio::test]
    async fn test_concurrent_processing_single_award() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier);
        let coordinator = Arc::new(coordinator);

        let submission = submission("U1", &[("phq9_total", json!(120))]);

        let mut handles = Vec::new();
        for _ in 0..6 {
            let coordinator = coordinator.clone();
            let submission = submission.clone();
            handles.push(tokio::spawn(async move {
                coordinator.process(&submission).await
            }));
        }

        let mut applied = 0;
        let mut lock_held = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => {
                    if outcome.entry_applied {
                        applied += 1;
                    }
                }
                Err(Error::LockHeld(_)) => lock_held += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        // Exactly one run applied the award; losers either saw the
        // duplicate or bounced off the lease
        assert_eq!(applied, 1);
        assert!(lock_held <= 5);
        assert_eq!(
            coordinator
                .ledger()
                .balance_of(&SubjectId::new("U1"))
                .unwrap(),
            150
        );
    }

    #[tokio::test]
    async fn test_validation_rejected_before_lock() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier);

        let mut bad = submission("", &[("phq9_total", json!(10))]);
        let err = coordinator.process(&bad).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(!err.is_transient());

        bad = submission("U1", &[]);
        assert!(matches!(
            coordinator.process(&bad).await.unwrap_err(),
            Error::Validation(_)
        ));

        bad = submission("U1", &[("phq9_total", json!(10))]);
        bad.submitted_at = Utc::now() + Duration::hours(2);
        assert!(matches!(
            coordinator.process(&bad).await.unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_rapid_progression_flag_does_not_block_award() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier.clone());
        let subject = SubjectId::new("U1");

        // Account created and three documents approved seconds before the
        // submission arrives
        coordinator
            .ledger()
            .award(&subject, LedgerAction::AccountCreated, "signup", 10, "account created")
            .unwrap();
        for i in 0..3 {
            coordinator
                .ledger()
                .award(
                    &subject,
                    LedgerAction::DocumentApproved,
                    &format!("doc-{}", i),
                    25,
                    "document approved",
                )
                .unwrap();
        }

        let submission = submission("U1", &[("phq9_total", json!(120))]);
        let outcome = coordinator.process(&submission).await.unwrap();

        let flag = outcome.fraud_flag.expect("flag expected");
        assert_eq!(flag.reason, fraud_screening::FraudReason::RapidProgression);

        // Award unaffected by the advisory flag
        assert!(outcome.entry_applied);
        assert_eq!(outcome.balance_after, 10 + 3 * 25 + 150);

        // alert_created + fraud_flagged
        assert_eq!(notifier.events.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rushed_completion_uses_client_elapsed_time() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (coordinator, _temp) = test_coordinator(notifier);
        coordinator
            .ledger()
            .award(
                &SubjectId::new("U1"),
                LedgerAction::AccountCreated,
                "signup",
                10,
                "account created",
            )
            .unwrap();

        let mut submission = submission("U1", &[("phq9_total", json!(10))]);
        submission.client_elapsed_seconds = 4;
        let outcome = coordinator.process(&submission).await.unwrap();

        let flag = outcome.fraud_flag.expect("flag expected");
        assert_eq!(flag.reason, fraud_screening::FraudReason::RushedCompletion);
        assert_eq!(flag.evidence.client_elapsed_secs, 4);
        assert!(outcome.entry_applied);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_processing() {
        let notifier = Arc::new(RecordingNotifier::default());
        notifier.fail.store(true, std::sync::atomic::Ordering::SeqCst);
        let (coordinator, _temp) = test_coordinator(notifier);

        let submission = submission("U1", &[("phq9_total", json!(160))]);
        let outcome = coordinator.process(&submission).await.unwrap();

        assert!(outcome.alert.is_some());
        assert!(outcome.entry_applied);
    }
}
