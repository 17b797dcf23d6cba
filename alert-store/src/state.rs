//! Alert lifecycle state machine
//!
//! Adjacency list:
//!
//! ```text
//! pending      --acknowledge--> acknowledged
//! acknowledged --start-------> in_progress
//! in_progress  --resolve-----> resolved        (terminal)
//! escalated    --resolve-----> resolved        (terminal)
//! pending      --dismiss-----> dismissed       (terminal)
//! acknowledged --dismiss-----> dismissed       (terminal)
//! escalated    --dismiss-----> dismissed       (terminal)
//! pending      --escalate----> escalated
//! acknowledged --escalate----> escalated
//! in_progress  --escalate----> escalated
//! ```
//!
//! `escalated` is non-terminal: it requires a human disposition into
//! `resolved` or `dismissed`.

use crate::types::{AlertEvent, AlertStatus};

/// Next status for `(current, event)`, or `None` when the transition is
/// not in the adjacency list
pub fn next_status(current: AlertStatus, event: AlertEvent) -> Option<AlertStatus> {
    use AlertEvent::*;
    use AlertStatus::*;

    match (current, event) {
        (Pending, Acknowledge) => Some(Acknowledged),
        (Acknowledged, Start) => Some(InProgress),
        (InProgress, Resolve) | (Escalated, Resolve) => Some(Resolved),
        (Pending, Dismiss) | (Acknowledged, Dismiss) | (Escalated, Dismiss) => Some(Dismissed),
        (Pending, Escalate) | (Acknowledged, Escalate) | (InProgress, Escalate) => Some(Escalated),
        _ => None,
    }
}
