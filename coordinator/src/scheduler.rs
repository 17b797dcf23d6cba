//! Periodic SLA escalation sweep
//!
//! Any number of sweepers may run against the same alert store; the
//! store decides, under its own write lock, which sweeper actually
//! escalates a given alert. A sweep that reports zero escalations is a
//! normal outcome, not an error.

use crate::{
    metrics,
    notify::{Notifier, NotifyEvent},
    Result,
};
use alert_store::{Alert, AlertStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Background sweeper that escalates alerts past their SLA deadline
pub struct EscalationScheduler {
    alerts: Arc<AlertStore>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    notify_timeout: Duration,
}

impl EscalationScheduler {
    /// Create scheduler over an alert store
    pub fn new(
        alerts: Arc<AlertStore>,
        notifier: Arc<dyn Notifier>,
        interval: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            alerts,
            notifier,
            interval,
            notify_timeout,
        }
    }

    /// One sweep: escalate every open alert whose deadline has passed
    ///
    /// Returns the alerts this sweep escalated. Alerts another sweeper
    /// got to first, or that reached a terminal state between the scan
    /// and the escalation, are skipped silently.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        let overdue = self.alerts.find_overdue(now)?;
        let mut escalated = Vec::new();

        for candidate in overdue {
            match self.alerts.escalate(candidate.alert_id)? {
                Some(alert) => {
                    metrics::ALERTS_ESCALATED_TOTAL
                        .with_label_values(&[&alert.priority.to_string()])
                        .inc();
                    tracing::warn!(
                        alert_id = %alert.alert_id,
                        subject_id = %alert.subject_id,
                        priority = %alert.priority,
                        escalation_count = alert.escalation_count,
                        "Alert escalated past SLA deadline"
                    );
                    self.emit(NotifyEvent::alert_escalated(&alert)).await;
                    escalated.push(alert);
                }
                None => {
                    tracing::debug!(
                        alert_id = %candidate.alert_id,
                        "Overdue alert already handled, skipping"
                    );
                }
            }
        }

        Ok(escalated)
    }

    /// Run sweeps forever at the configured interval
    ///
    /// A failed sweep is logged and the loop continues; the next tick
    /// retries from a fresh scan.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Escalation scheduler started");

        loop {
            ticker.tick().await;
            match self.sweep(Utc::now()).await {
                Ok(escalated) if !escalated.is_empty() => {
                    tracing::info!(count = escalated.len(), "Escalation sweep completed");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Escalation sweep failed");
                }
            }
        }
    }

    async fn emit(&self, event: NotifyEvent) {
        match tokio::time::timeout(self.notify_timeout, self.notifier.notify(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Escalation notification failed"),
            Err(_) => tracing::warn!("Escalation notification timed out"),
        }
    }
}
