//! TriageRail Ledger Core
//!
//! Append-only points/badges accounting ledger with idempotency keys.
//!
//! # Architecture
//!
//! - **Append-only**: Entries are never updated or deleted; corrections
//!   are new negative entries referencing the original
//! - **Idempotent**: At most one entry per idempotency key, so retries and
//!   duplicate deliveries are safe
//! - **Derived balances**: Balances are computed from the entry set under
//!   one storage snapshot, never stored as mutable state
//! - **Single writer**: Award/reverse check-then-write sections are
//!   serialized, eliminating duplicate-insert races

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod badges;
pub mod config;
pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

// Re-exports
pub use badges::{BadgeCatalog, BadgeRule};
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::{AwardOutcome, Ledger};
pub use storage::Storage;
pub use types::{idempotency_key, BadgeId, LedgerAction, LedgerEntry, SubjectId};
