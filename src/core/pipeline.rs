use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::core::rules::RuleOutcome;
use crate::core::scoring::{compare_ranked, ScoreFuser};
use crate::models::{CandidateProfile, CourseProfile, Pool, ScoreBreakdown, StructuredRequirement};
use crate::services::{
    Embedder, EmbeddingError, Relevance, RelevanceScorer, RepositoryError, RetrievalError,
    ScoringError, SimilarityHit,
};

/// Terminal errors that abort a matching run
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("retrieval unavailable for {pool} pool: {source}")]
    RetrievalUnavailable {
        pool: Pool,
        #[source]
        source: RetrievalError,
    },

    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbeddingError),

    #[error("embedding has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("profile repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("requirement text is empty")]
    EmptyRequirement,

    #[error("run deadline reached during {0}")]
    DeadlineExceeded(&'static str),
}

/// An entity that can flow through the scoring pipeline
pub trait PoolEntity: Clone + Send + Sync + 'static {
    fn entity_id(&self) -> &str;

    /// Text handed to the relevance scorer
    fn scoring_text(&self) -> String;
}

impl PoolEntity for CandidateProfile {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn scoring_text(&self) -> String {
        CandidateProfile::scoring_text(self)
    }
}

impl PoolEntity for CourseProfile {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn scoring_text(&self) -> String {
        CourseProfile::scoring_text(self)
    }
}

/// An entity with its fused breakdown
#[derive(Debug, Clone)]
pub struct Scored<E> {
    pub entity: E,
    pub breakdown: ScoreBreakdown,
}

/// Result of scoring one pool
#[derive(Debug)]
pub struct ScoredPool<E> {
    /// Ranked by fused score descending, then id ascending
    pub scored: Vec<Scored<E>>,
    /// Some entities were dropped (run deadline or task failure)
    pub incomplete: bool,
}

/// Bounded concurrent scoring of retrieved entities
///
/// Each entity's relevance and rule scores are computed in its own task.
/// Clones share one limiter, so at most `concurrency` relevance calls are
/// in flight across every pool scored through them. All results are
/// collected before ranking, so the order never depends on completion
/// order. Entities still pending at the run deadline are excluded and the
/// pool is flagged incomplete.
#[derive(Debug, Clone)]
pub struct FanOut {
    limiter: Arc<Semaphore>,
    scoring_timeout: Duration,
}

impl FanOut {
    pub fn new(concurrency: usize, scoring_timeout: Duration) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(concurrency.max(1))),
            scoring_timeout,
        }
    }

    pub async fn score_all<E, R>(
        &self,
        entities: Vec<(E, f64)>,
        requirement: Arc<StructuredRequirement>,
        scorer: Arc<dyn RelevanceScorer>,
        fuser: ScoreFuser,
        rule: R,
        deadline: Instant,
    ) -> ScoredPool<E>
    where
        E: PoolEntity,
        R: Fn(&E) -> RuleOutcome + Send + Sync + 'static,
    {
        let total = entities.len();
        let rule = Arc::new(rule);
        let timeout = self.scoring_timeout;
        let mut tasks = JoinSet::new();

        for (entity, similarity) in entities {
            let semaphore = self.limiter.clone();
            let requirement = requirement.clone();
            let scorer = scorer.clone();
            let rule = rule.clone();

            tasks.spawn(async move {
                let relevance = {
                    let _permit = semaphore.acquire_owned().await.ok();
                    score_relevance(scorer.as_ref(), &requirement, &entity, timeout).await
                };
                let breakdown = fuser.breakdown(similarity, relevance, (*rule)(&entity));
                Scored { entity, breakdown }
            });
        }

        let mut scored = Vec::with_capacity(total);
        let mut incomplete = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(item))) => scored.push(item),
                Ok(Some(Err(e))) => {
                    tracing::warn!("Scoring task failed, entity dropped: {}", e);
                    incomplete = true;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Run deadline reached with {} of {} entities still scoring",
                        total - scored.len(),
                        total
                    );
                    tasks.abort_all();
                    incomplete = true;
                    break;
                }
            }
        }

        rank(&mut scored);
        ScoredPool { scored, incomplete }
    }
}

/// Sort scored entities into ranking order
pub fn rank<E: PoolEntity>(scored: &mut [Scored<E>]) {
    scored.sort_by(|a, b| {
        compare_ranked(
            a.breakdown.fused_score,
            a.entity.entity_id(),
            b.breakdown.fused_score,
            b.entity.entity_id(),
        )
    });
}

/// Await `future` unless the run deadline passes first
pub async fn before_deadline<F: Future>(
    deadline: Instant,
    stage: &'static str,
    future: F,
) -> Result<F::Output, MatchError> {
    tokio::time::timeout_at(deadline, future)
        .await
        .map_err(|_| MatchError::DeadlineExceeded(stage))
}

/// Embed query text, checking the embedding's dimensionality
pub async fn embed_query(
    embedder: &dyn Embedder,
    text: &str,
    expected_dim: usize,
) -> Result<Vec<f32>, MatchError> {
    let embedding = embedder.embed(text).await?;
    if embedding.len() != expected_dim {
        return Err(MatchError::DimensionMismatch {
            expected: expected_dim,
            got: embedding.len(),
        });
    }
    Ok(embedding)
}

/// Pair retrieved hits with their loaded profiles, in hit order
///
/// Hits whose profile the repository did not return are skipped.
pub fn join_hits<E: PoolEntity>(hits: &[SimilarityHit], profiles: Vec<E>) -> Vec<(E, f64)> {
    let mut by_id: HashMap<String, E> = profiles
        .into_iter()
        .map(|p| (p.entity_id().to_string(), p))
        .collect();

    hits.iter()
        .filter_map(|hit| match by_id.remove(&hit.id) {
            Some(profile) => Some((profile, hit.similarity)),
            None => {
                tracing::warn!("Retrieved id {} has no profile, skipping", hit.id);
                None
            }
        })
        .collect()
}

/// Run the relevance scorer for one entity, absorbing failures
async fn score_relevance<E: PoolEntity>(
    scorer: &dyn RelevanceScorer,
    requirement: &StructuredRequirement,
    entity: &E,
    timeout: Duration,
) -> Option<Relevance> {
    let text = entity.scoring_text();
    let result = match tokio::time::timeout(timeout, scorer.score(requirement, &text)).await {
        Ok(result) => result,
        Err(_) => Err(ScoringError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    };

    match result {
        Ok(relevance) if relevance.score.is_finite() => Some(relevance),
        Ok(relevance) => {
            tracing::warn!(
                "Relevance score for {} is not a number ({}), using neutral score",
                entity.entity_id(),
                relevance.score
            );
            None
        }
        Err(e) => {
            tracing::warn!("Relevance scoring failed for {}, using neutral score: {}", entity.entity_id(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FusionWeights, Seniority};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores by a per-id table; ids listed in `slow` sleep past any timeout
    struct TableScorer {
        scores: Vec<(&'static str, f64)>,
        slow: Vec<&'static str>,
    }

    #[async_trait]
    impl RelevanceScorer for TableScorer {
        async fn score(
            &self,
            _requirement: &StructuredRequirement,
            entity_text: &str,
        ) -> Result<Relevance, ScoringError> {
            for id in &self.slow {
                if entity_text.contains(&format!("Name: {}\n", id)) {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
            }
            let score = self
                .scores
                .iter()
                .find(|(id, _)| entity_text.contains(&format!("Name: {}\n", id)))
                .map(|(_, s)| *s)
                .ok_or_else(|| ScoringError::Malformed("unknown entity".to_string()))?;
            Ok(Relevance { score, evidence: vec![] })
        }
    }

    fn candidate(id: &'static str) -> CandidateProfile {
        CandidateProfile {
            id: id.to_string(),
            name: id.to_string(),
            skills: BTreeMap::new(),
            domain_tags: vec![],
            raw_text: String::new(),
            experience_summary: None,
            embedding: vec![],
        }
    }

    fn requirement() -> Arc<StructuredRequirement> {
        Arc::new(StructuredRequirement {
            skills: vec![],
            domain_tags: vec![],
            seniority: Seniority::Mid,
            origin_text: "test".to_string(),
            degraded: false,
        })
    }

    fn flat_rule(_: &CandidateProfile) -> RuleOutcome {
        RuleOutcome { score: 0.5, matched: vec![] }
    }

    /// Records the largest number of overlapping calls
    #[derive(Default)]
    struct PeakScorer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl RelevanceScorer for PeakScorer {
        async fn score(&self, _r: &StructuredRequirement, _text: &str) -> Result<Relevance, ScoringError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Relevance { score: 0.5, evidence: vec![] })
        }
    }

    #[test]
    fn test_join_hits_keeps_hit_order_and_skips_missing() {
        let hits = vec![
            SimilarityHit { id: "b".to_string(), similarity: 0.9 },
            SimilarityHit { id: "x".to_string(), similarity: 0.8 },
            SimilarityHit { id: "a".to_string(), similarity: 0.7 },
        ];
        let joined = join_hits(&hits, vec![candidate("a"), candidate("b")]);
        let ids: Vec<(&str, f64)> = joined.iter().map(|(c, s)| (c.id.as_str(), *s)).collect();
        assert_eq!(ids, vec![("b", 0.9), ("a", 0.7)]);
    }

    #[tokio::test]
    async fn test_scores_are_ranked_and_complete() {
        let scorer = Arc::new(TableScorer {
            scores: vec![("a", 0.2), ("b", 0.9), ("c", 0.9)],
            slow: vec![],
        });
        let fanout = FanOut::new(2, Duration::from_secs(5));
        let entities = vec![(candidate("a"), 0.5), (candidate("c"), 0.5), (candidate("b"), 0.5)];

        let pool = fanout
            .score_all(
                entities,
                requirement(),
                scorer,
                ScoreFuser::new(FusionWeights::CANDIDATE),
                flat_rule,
                Instant::now() + Duration::from_secs(10),
            )
            .await;

        let ids: Vec<&str> = pool.scored.iter().map(|s| s.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(!pool.incomplete);
        assert!(pool.scored.iter().all(|s| !s.breakdown.partial));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_entity_timeout_is_neutral_partial() {
        let scorer = Arc::new(TableScorer {
            scores: vec![("a", 0.8), ("b", 0.8)],
            slow: vec!["b"],
        });
        let fanout = FanOut::new(4, Duration::from_secs(1));

        let pool = fanout
            .score_all(
                vec![(candidate("a"), 0.5), (candidate("b"), 0.5)],
                requirement(),
                scorer,
                ScoreFuser::new(FusionWeights::CANDIDATE),
                flat_rule,
                Instant::now() + Duration::from_secs(60),
            )
            .await;

        assert!(!pool.incomplete);
        let b = pool.scored.iter().find(|s| s.entity.id == "b").unwrap();
        assert!(b.breakdown.partial);
        assert_eq!(b.breakdown.relevance_score, 0.5);
        let a = pool.scored.iter().find(|s| s.entity.id == "a").unwrap();
        assert!(!a.breakdown.partial);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline_excludes_pending_entities() {
        let scorer = Arc::new(TableScorer {
            scores: vec![("a", 0.8), ("b", 0.8)],
            slow: vec!["b"],
        });
        // per-entity timeout longer than the run deadline
        let fanout = FanOut::new(4, Duration::from_secs(600));

        let pool = fanout
            .score_all(
                vec![(candidate("a"), 0.5), (candidate("b"), 0.5)],
                requirement(),
                scorer,
                ScoreFuser::new(FusionWeights::CANDIDATE),
                flat_rule,
                Instant::now() + Duration::from_secs(5),
            )
            .await;

        assert!(pool.incomplete);
        assert_eq!(pool.scored.len(), 1);
        assert_eq!(pool.scored[0].entity.id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cloned_fanouts_share_concurrency_cap() {
        let scorer = Arc::new(PeakScorer::default());
        let fanout = FanOut::new(1, Duration::from_secs(5));
        let deadline = Instant::now() + Duration::from_secs(60);
        let fuser = ScoreFuser::new(FusionWeights::CANDIDATE);

        let first = fanout.clone();
        let second = fanout.clone();
        let (a, b) = tokio::join!(
            first.score_all(
                vec![(candidate("a"), 0.5), (candidate("b"), 0.5)],
                requirement(),
                scorer.clone(),
                fuser,
                flat_rule,
                deadline,
            ),
            second.score_all(
                vec![(candidate("c"), 0.5), (candidate("d"), 0.5)],
                requirement(),
                scorer.clone(),
                fuser,
                flat_rule,
                deadline,
            ),
        );

        assert_eq!(a.scored.len() + b.scored.len(), 4);
        assert_eq!(scorer.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_before_deadline_names_the_stage() {
        let deadline = Instant::now() + Duration::from_secs(5);
        let slow = tokio::time::sleep(Duration::from_secs(3600));

        let err = before_deadline(deadline, "retrieval", slow).await.unwrap_err();
        assert!(matches!(err, MatchError::DeadlineExceeded("retrieval")));

        let ok = before_deadline(deadline, "embedding", async { 7 }).await.unwrap();
        assert_eq!(ok, 7);
    }
}
