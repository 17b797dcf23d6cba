//! Core types for alerts

use chrono::{DateTime, Utc};
use ledger_core::SubjectId;
use risk_engine::RiskCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Alert priority, drives the SLA deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlertPriority {
    /// Requires disposition within the tightest SLA
    Emergency = 1,
    /// Urgent clinical follow-up
    Urgent = 2,
    /// Same-day attention
    High = 3,
    /// Routine follow-up
    Medium = 4,
    /// Informational
    Low = 5,
}

impl fmt::Display for AlertPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertPriority::Emergency => "emergency",
            AlertPriority::Urgent => "urgent",
            AlertPriority::High => "high",
            AlertPriority::Medium => "medium",
            AlertPriority::Low => "low",
        };
        write!(f, "{}", name)
    }
}

/// Alert lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AlertStatus {
    /// Created, awaiting acknowledgement
    Pending = 1,
    /// A clinician has acknowledged the alert
    Acknowledged = 2,
    /// Being worked
    InProgress = 3,
    /// Resolved (terminal)
    Resolved = 4,
    /// Dismissed as not actionable (terminal)
    Dismissed = 5,
    /// SLA breached or manually escalated; awaits human disposition
    Escalated = 6,
}

impl AlertStatus {
    /// Terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::InProgress => "in_progress",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Dismissed => "dismissed",
            AlertStatus::Escalated => "escalated",
        };
        write!(f, "{}", name)
    }
}

/// Lifecycle event applied to an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertEvent {
    /// Clinician acknowledges the alert
    Acknowledge,
    /// Work on the alert begins
    Start,
    /// Alert resolved
    Resolve,
    /// Alert dismissed as not actionable
    Dismiss,
    /// SLA breach or manual escalation (system-initiated)
    Escalate,
}

impl AlertEvent {
    /// Human dispositions require an actor; escalation is system-driven
    pub fn requires_actor(&self) -> bool {
        !matches!(self, AlertEvent::Escalate)
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertEvent::Acknowledge => "acknowledge",
            AlertEvent::Start => "start",
            AlertEvent::Resolve => "resolve",
            AlertEvent::Dismiss => "dismiss",
            AlertEvent::Escalate => "escalate",
        };
        write!(f, "{}", name)
    }
}

/// Clinical alert record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Unique alert ID (UUIDv7)
    pub alert_id: Uuid,

    /// Subject the alert concerns
    pub subject_id: SubjectId,

    /// Submission that produced the alert
    pub submission_id: Uuid,

    /// Risk category at creation time
    pub category: RiskCategory,

    /// Priority, fixed at creation
    pub priority: AlertPriority,

    /// Numeric risk score at creation time
    pub risk_score: i64,

    /// Current lifecycle status
    pub status: AlertStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Deadline for human disposition before automatic escalation
    pub sla_deadline: DateTime<Utc>,

    /// When the alert was acknowledged
    pub acknowledged_at: Option<DateTime<Utc>>,

    /// Who acknowledged the alert
    pub acknowledged_by: Option<String>,

    /// When the alert reached a resolved state
    pub resolved_at: Option<DateTime<Utc>>,

    /// Number of times the alert has been escalated
    pub escalation_count: u32,
}

impl Alert {
    /// True once the alert reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// True when the SLA deadline has passed and the alert is not terminal
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_terminal() && self.sla_deadline < now
    }
}
