//! Risk scoring engine
//!
//! The scoring formula itself is pluggable behind the [`Scorer`] trait;
//! the evaluator owns the threshold policy and the critical-flag safety
//! override.

use crate::types::{Responses, RiskCategory, RiskResult, RiskThresholds};
use std::collections::BTreeSet;

/// Pluggable scoring function: responses -> (score, flags)
///
/// Implementations must be pure and deterministic for identical input.
pub trait Scorer: Send + Sync {
    /// Compute the numeric score and raised flags for a response set
    fn score(&self, responses: &Responses) -> (i64, BTreeSet<String>);
}

/// Default scorer
///
/// - numeric answers add their value to the score
/// - boolean `true` answers raise a flag named after the question key
/// - a `"flags"` array of strings raises each string as a flag
#[derive(Debug, Clone, Default)]
pub struct WeightedScorer;

impl Scorer for WeightedScorer {
    fn score(&self, responses: &Responses) -> (i64, BTreeSet<String>) {
        let mut score = 0i64;
        let mut flags = BTreeSet::new();

        for (key, value) in responses {
            match value {
                serde_json::Value::Number(n) => {
                    score = score.saturating_add(n.as_i64().unwrap_or(0));
                }
                serde_json::Value::Bool(true) => {
                    flags.insert(key.clone());
                }
                serde_json::Value::Array(items) if key == "flags" => {
                    for item in items {
                        if let serde_json::Value::String(flag) = item {
                            flags.insert(flag.clone());
                        }
                    }
                }
                _ => {}
            }
        }

        (score, flags)
    }
}

/// Risk evaluator: scoring function + threshold policy + safety overrides
pub struct RiskEvaluator {
    scorer: Box<dyn Scorer>,
    thresholds: RiskThresholds,
    critical_flags: BTreeSet<String>,
}

impl RiskEvaluator {
    /// Flags that force a critical category regardless of numeric score
    pub const DEFAULT_CRITICAL_FLAGS: [&'static str; 2] =
        ["suicide_risk", "active_violence_exposure"];

    /// Create evaluator with the default scorer and critical flag set
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self::with_scorer(Box::new(WeightedScorer), thresholds)
    }

    /// Create evaluator with a custom scoring function
    pub fn with_scorer(scorer: Box<dyn Scorer>, thresholds: RiskThresholds) -> Self {
        Self {
            scorer,
            thresholds,
            critical_flags: Self::DEFAULT_CRITICAL_FLAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the set of flags that force a critical category
    pub fn with_critical_flags(mut self, flags: BTreeSet<String>) -> Self {
        self.critical_flags = flags;
        self
    }

    /// Evaluate responses into a risk result
    ///
    /// The critical-flag override is a safety mechanism, not a suggestion:
    /// it takes precedence over the numeric band mapping.
    pub fn evaluate(&self, responses: &Responses) -> RiskResult {
        let (score, flags) = self.scorer.score(responses);

        let mut category = self.thresholds.categorize(score);
        if flags.iter().any(|f| self.critical_flags.contains(f)) {
            category = RiskCategory::Critical;
        }

        tracing::debug!(score, %category, flag_count = flags.len(), "Risk evaluated");

        RiskResult {
            score,
            flags,
            category,
        }
    }
}

impl Default for RiskEvaluator {
    fn default() -> Self {
        Self::new(RiskThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn responses(pairs: &[(&str, serde_json::Value)]) -> Responses {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_numeric_scoring_bands() {
        let evaluator = RiskEvaluator::default();

        let result = evaluator.evaluate(&responses(&[
            ("phq9_total", json!(20)),
            ("gad7_total", json!(15)),
        ]));
        assert_eq!(result.score, 35);
        assert_eq!(result.category, RiskCategory::Low);

        let result = evaluator.evaluate(&responses(&[("phq9_total", json!(160))]));
        assert_eq!(result.category, RiskCategory::Critical);
    }

    #[test]
    fn test_safety_override_beats_low_score() {
        let evaluator = RiskEvaluator::default();

        let result = evaluator.evaluate(&responses(&[
            ("phq9_total", json!(10)),
            ("suicide_risk", json!(true)),
        ]));
        assert_eq!(result.score, 10);
        assert_eq!(result.category, RiskCategory::Critical);
        assert!(result.flags.contains("suicide_risk"));
    }

    #[test]
    fn test_flags_array_raises_each_flag() {
        let evaluator = RiskEvaluator::default();

        let result = evaluator.evaluate(&responses(&[
            ("phq9_total", json!(10)),
            ("flags", json!(["active_violence_exposure", "housing_insecure"])),
        ]));
        assert_eq!(result.category, RiskCategory::Critical);
        assert!(result.flags.contains("housing_insecure"));
    }

    #[test]
    fn test_non_critical_flag_does_not_override() {
        let evaluator = RiskEvaluator::default();

        let result = evaluator.evaluate(&responses(&[
            ("phq9_total", json!(10)),
            ("housing_insecure", json!(true)),
        ]));
        assert_eq!(result.category, RiskCategory::Low);
    }

    #[test]
    fn test_deterministic_for_identical_input() {
        let evaluator = RiskEvaluator::default();
        let input = responses(&[
            ("a", json!(70)),
            ("b", json!(40)),
            ("suicide_risk", json!(false)),
        ]);

        let first = evaluator.evaluate(&input);
        let second = evaluator.evaluate(&input);
        assert_eq!(first, second);
        assert_eq!(first.category, RiskCategory::High);
    }
}
