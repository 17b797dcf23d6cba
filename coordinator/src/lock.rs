//! Per-submission lease locks
//!
//! Serializes concurrent process runs for the same submission; different
//! submissions never contend. The lease carries a TTL: a holder that dies
//! mid-run stops blocking the submission once the TTL passes. The lease is
//! an optimization to avoid duplicate work, not the correctness mechanism;
//! idempotent mutations remain the backstop when a TTL expires under a
//! still-running holder.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Lease {
    token: Uuid,
    acquired_at: Instant,
}

/// Lease registry keyed by submission ID
#[derive(Clone)]
pub struct SubmissionLocks {
    leases: Arc<DashMap<Uuid, Lease>>,
    ttl: Duration,
}

impl SubmissionLocks {
    /// Create registry with the given lease TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            leases: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Acquire the lease for a submission
    ///
    /// Returns `None` while another holder's unexpired lease stands.
    /// Expired leases are reclaimed. The returned guard releases the lease
    /// on drop.
    pub fn try_acquire(&self, submission_id: Uuid) -> Option<LeaseGuard> {
        let token = Uuid::new_v4();
        let now = Instant::now();

        match self.leases.entry(submission_id) {
            Entry::Occupied(mut occupied) => {
                if now.duration_since(occupied.get().acquired_at) < self.ttl {
                    return None;
                }
                tracing::warn!(
                    submission_id = %submission_id,
                    "Reclaiming expired submission lease"
                );
                occupied.insert(Lease {
                    token,
                    acquired_at: now,
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Lease {
                    token,
                    acquired_at: now,
                });
            }
        }

        Some(LeaseGuard {
            leases: self.leases.clone(),
            submission_id,
            token,
        })
    }

    /// Number of leases currently held (expired ones included until
    /// reclaimed)
    pub fn held(&self) -> usize {
        self.leases.len()
    }
}

/// Releases the lease on drop
pub struct LeaseGuard {
    leases: Arc<DashMap<Uuid, Lease>>,
    submission_id: Uuid,
    token: Uuid,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        // Only release a lease this guard still owns; a reclaimed lease
        // belongs to the new holder
        self.leases
            .remove_if(&self.submission_id, |_, lease| lease.token == self.token);
    }
}
