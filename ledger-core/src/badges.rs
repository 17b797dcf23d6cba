//! Badge evaluation over the ledger entry set
//!
//! The badge catalog (rule table) is owned by a collaborator and injected;
//! the ledger only evaluates it. Eligibility is recomputed from the entry
//! set on every evaluation rather than cached, so a reversal immediately
//! revokes a balance-threshold badge.

use crate::types::{BadgeId, LedgerAction, LedgerEntry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single threshold-to-badge rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeRule {
    /// Badge awarded when the rule matches
    pub badge_id: BadgeId,

    /// Minimum net balance required, if any
    pub min_balance: Option<i64>,

    /// Required action count: at least `1` non-reversed entry of this kind
    /// per `count`
    pub min_action_count: Option<(LedgerAction, usize)>,
}

impl BadgeRule {
    fn matches(&self, entries: &[LedgerEntry]) -> bool {
        if let Some(min) = self.min_balance {
            let balance: i64 = entries.iter().map(|e| e.points).sum();
            if balance < min {
                return false;
            }
        }

        if let Some((action, min_count)) = &self.min_action_count {
            let count = entries
                .iter()
                .filter(|e| e.action == *action && !e.is_reversal())
                .count();
            if count < *min_count {
                return false;
            }
        }

        self.min_balance.is_some() || self.min_action_count.is_some()
    }
}

/// Rule table supplied by the badge-catalog collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BadgeCatalog {
    rules: Vec<BadgeRule>,
}

impl BadgeCatalog {
    /// Build a catalog from a rule table
    pub fn new(rules: Vec<BadgeRule>) -> Self {
        Self { rules }
    }

    /// Badges the given entry set qualifies for (pure function)
    pub fn eligible_badges(&self, entries: &[LedgerEntry]) -> BTreeSet<BadgeId> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(entries))
            .map(|rule| rule.badge_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{idempotency_key, SubjectId};
    use chrono::Utc;
    use uuid::Uuid;

    fn entry(action: LedgerAction, points: i64, reverses: Option<Uuid>) -> LedgerEntry {
        let subject_id = SubjectId::new("U1");
        let reference = Uuid::new_v4().to_string();
        LedgerEntry {
            entry_id: Uuid::now_v7(),
            idempotency_key: idempotency_key(&subject_id, action, &reference),
            subject_id,
            action,
            points,
            created_at: Utc::now(),
            reason: "test".to_string(),
            reverses,
        }
    }

    fn catalog() -> BadgeCatalog {
        BadgeCatalog::new(vec![
            BadgeRule {
                badge_id: BadgeId::new("first_assessment"),
                min_balance: None,
                min_action_count: Some((LedgerAction::RiskAssessmentCompleted, 1)),
            },
            BadgeRule {
                badge_id: BadgeId::new("points_300"),
                min_balance: Some(300),
                min_action_count: None,
            },
        ])
    }

    #[test]
    fn test_action_count_badge() {
        let entries = vec![entry(LedgerAction::RiskAssessmentCompleted, 150, None)];
        let badges = catalog().eligible_badges(&entries);
        assert!(badges.contains(&BadgeId::new("first_assessment")));
        assert!(!badges.contains(&BadgeId::new("points_300")));
    }

    #[test]
    fn test_balance_badge_revoked_by_reversal() {
        let first = entry(LedgerAction::RiskAssessmentCompleted, 150, None);
        let second = entry(LedgerAction::RiskAssessmentCompleted, 150, None);
        let mut entries = vec![first.clone(), second];
        assert!(catalog()
            .eligible_badges(&entries)
            .contains(&BadgeId::new("points_300")));

        entries.push(entry(LedgerAction::Reversal, -150, Some(first.entry_id)));
        assert!(!catalog()
            .eligible_badges(&entries)
            .contains(&BadgeId::new("points_300")));
    }

    #[test]
    fn test_empty_rule_never_matches() {
        let rule = BadgeRule {
            badge_id: BadgeId::new("vacuous"),
            min_balance: None,
            min_action_count: None,
        };
        let entries = vec![entry(LedgerAction::AccountCreated, 10, None)];
        assert!(BadgeCatalog::new(vec![rule]).eligible_badges(&entries).is_empty());
    }
}
