//! Outward notification seam
//!
//! Delivery is at-least-once and best-effort: a notification failure never
//! rolls back ledger or alert mutations. Payloads carry the alert/flag ID
//! so the receiving side can deduplicate.

use alert_store::Alert;
use async_trait::async_trait;
use fraud_screening::FraudFlag;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Notification delivery failure
///
/// Never propagated into the processing result; callers log and move on.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Transport rejected or dropped the event
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Event could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Notification event emitted by the processing core
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A clinical alert was created
    AlertCreated {
        /// Dedup key for the receiver
        alert_id: Uuid,
        /// Subject the alert concerns
        subject_id: String,
        /// Alert priority
        priority: String,
        /// SLA deadline (RFC 3339)
        sla_deadline: String,
    },
    /// An alert breached its SLA and was escalated
    AlertEscalated {
        /// Dedup key for the receiver
        alert_id: Uuid,
        /// Subject the alert concerns
        subject_id: String,
        /// Times this alert has been escalated
        escalation_count: u32,
    },
    /// An advisory fraud flag was raised
    FraudFlagged {
        /// Dedup key for the receiver
        flag_id: Uuid,
        /// Subject the flag concerns
        subject_id: String,
        /// Heuristic that fired
        reason: String,
    },
}

impl NotifyEvent {
    /// Build an alert-created event
    pub fn alert_created(alert: &Alert) -> Self {
        NotifyEvent::AlertCreated {
            alert_id: alert.alert_id,
            subject_id: alert.subject_id.to_string(),
            priority: alert.priority.to_string(),
            sla_deadline: alert.sla_deadline.to_rfc3339(),
        }
    }

    /// Build an alert-escalated event
    pub fn alert_escalated(alert: &Alert) -> Self {
        NotifyEvent::AlertEscalated {
            alert_id: alert.alert_id,
            subject_id: alert.subject_id.to_string(),
            escalation_count: alert.escalation_count,
        }
    }

    /// Build a fraud-flagged event
    pub fn fraud_flagged(flag: &FraudFlag) -> Self {
        NotifyEvent::FraudFlagged {
            flag_id: flag.flag_id,
            subject_id: flag.subject_id.to_string(),
            reason: flag.reason.to_string(),
        }
    }
}

/// Outward notification collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event (at-least-once semantics on the receiving side)
    async fn notify(&self, event: NotifyEvent) -> std::result::Result<(), NotifyError>;
}

/// Notifier that logs events via tracing
///
/// Stands in for a transport-backed notifier in tests and single-process
/// deployments.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: NotifyEvent) -> std::result::Result<(), NotifyError> {
        let payload = serde_json::to_string(&event)?;
        tracing::info!(payload = %payload, "Notification emitted");
        Ok(())
    }
}
