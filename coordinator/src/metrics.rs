//! Prometheus metrics for submission processing

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram, CounterVec, Histogram};

lazy_static! {
    /// Total submissions processed, by outcome
    pub static ref SUBMISSIONS_PROCESSED_TOTAL: CounterVec = register_counter_vec!(
        "coordinator_submissions_processed_total",
        "Total submissions processed",
        &["status"]
    )
    .unwrap();

    /// Processing duration
    pub static ref PROCESS_DURATION: Histogram = register_histogram!(
        "coordinator_process_duration_seconds",
        "Submission processing duration in seconds"
    )
    .unwrap();

    /// Alerts created, by priority
    pub static ref ALERTS_CREATED_TOTAL: CounterVec = register_counter_vec!(
        "coordinator_alerts_created_total",
        "Total alerts created",
        &["priority"]
    )
    .unwrap();

    /// Alerts escalated by the SLA sweep
    pub static ref ALERTS_ESCALATED_TOTAL: CounterVec = register_counter_vec!(
        "coordinator_alerts_escalated_total",
        "Total alerts escalated on SLA breach",
        &["priority"]
    )
    .unwrap();

    /// Fraud flags raised, by reason
    pub static ref FRAUD_FLAGS_TOTAL: CounterVec = register_counter_vec!(
        "coordinator_fraud_flags_total",
        "Total advisory fraud flags raised",
        &["reason"]
    )
    .unwrap();
}
