use std::cmp::Ordering;

use crate::core::rules::RuleOutcome;
use crate::models::{FusionWeights, ScoreBreakdown};
use crate::services::Relevance;

/// Relevance substituted when the scorer fails for an entity
pub const NEUTRAL_RELEVANCE: f64 = 0.5;

/// Clamp a score into [0,1], treating non-finite values as 0
#[inline]
pub fn clamp_unit(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Combines vector, relevance and rule scores into one fused score
///
/// One fuser exists per entity type; weights come from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ScoreFuser {
    weights: FusionWeights,
}

impl ScoreFuser {
    pub fn new(weights: FusionWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Weighted combination of the three components
    ///
    /// fused = vector * w.vector + relevance * w.relevance + rule * w.rule
    #[inline]
    pub fn fuse(&self, vector: f64, relevance: f64, rule: f64) -> f64 {
        let fused = clamp_unit(vector) * self.weights.vector
            + clamp_unit(relevance) * self.weights.relevance
            + clamp_unit(rule) * self.weights.rule;

        clamp_unit(fused)
    }

    /// Build the immutable breakdown for one entity
    ///
    /// A missing relevance (scoring failed) is replaced by the neutral
    /// default and the breakdown is marked partial.
    pub fn breakdown(
        &self,
        vector: f64,
        relevance: Option<Relevance>,
        rule: RuleOutcome,
    ) -> ScoreBreakdown {
        let (relevance_score, scorer_evidence, partial) = match relevance {
            Some(r) => (clamp_unit(r.score), r.evidence, false),
            None => (NEUTRAL_RELEVANCE, Vec::new(), true),
        };

        let vector_score = clamp_unit(vector);
        let rule_score = clamp_unit(rule.score);

        ScoreBreakdown {
            vector_score,
            relevance_score,
            rule_score,
            fused_score: self.fuse(vector_score, relevance_score, rule_score),
            evidence: merge_evidence(rule.matched, scorer_evidence),
            partial,
        }
    }
}

/// Rule-matched skills first, then scorer evidence, without repeats
fn merge_evidence(matched: Vec<String>, scorer: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(matched.len() + scorer.len());
    let mut evidence = Vec::with_capacity(matched.len() + scorer.len());

    for item in matched.into_iter().chain(scorer) {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            evidence.push(trimmed.to_string());
        }
    }

    evidence
}

/// Ranking order: fused score descending, then id ascending
#[inline]
pub fn compare_ranked(a_score: f64, a_id: &str, b_score: f64, b_id: &str) -> Ordering {
    b_score.total_cmp(&a_score).then_with(|| a_id.cmp(b_id))
}
