//! TriageRail Coordinator
//!
//! Orchestration core for risk-assessment processing. One authoritative
//! code path handles a completed submission end to end:
//!
//! ```text
//! submission ──> Coordinator::process
//!                  ├─ validate
//!                  ├─ per-submission lease lock
//!                  ├─ RiskEvaluator::evaluate          (pure)
//!                  ├─ AlertStore::create               (idempotent)
//!                  ├─ Ledger::award                    (idempotent)
//!                  ├─ FraudHeuristic::inspect          (advisory)
//!                  └─ notifications                    (best-effort)
//! ```
//!
//! The synchronous request-time caller and the deferred job worker both
//! invoke the same `process`; because every mutation is idempotent, the
//! design is correct whichever pathway arrives first, arrives twice, or
//! never arrives at all. The [`scheduler::EscalationScheduler`] sweeps the
//! alert store for SLA breaches in the background.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod config;
pub mod engine;
pub mod error;
pub mod lock;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod types;

// Re-exports
pub use config::Config;
pub use engine::Coordinator;
pub use error::{Error, Result};
pub use notify::{Notifier, NotifyError, NotifyEvent, TracingNotifier};
pub use scheduler::EscalationScheduler;
pub use types::{ProcessingOutcome, Submission};
