use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::time::Instant;

use crate::core::courses::{CourseRecommender, CourseSettings};
use crate::core::gaps::detect_gaps;
use crate::core::parser::{degraded, RequirementParser};
use crate::core::pipeline::{before_deadline, embed_query, join_hits, FanOut, MatchError, Scored};
use crate::core::retriever::VectorRetriever;
use crate::core::rules::candidate_rule_score;
use crate::core::scoring::ScoreFuser;
use crate::models::{CandidateProfile, FusionWeights, MatchResult, MatchRun, Pool, StructuredRequirement};
use crate::services::{
    Embedder, ProfileRepository, RelevanceScorer, RequirementExtractor, SimilarityQuery, SimilaritySearch,
};

/// External capabilities the engine runs against
#[derive(Clone)]
pub struct EngineServices {
    pub extractor: Arc<dyn RequirementExtractor>,
    pub embedder: Arc<dyn Embedder>,
    pub search: Arc<dyn SimilaritySearch>,
    pub scorer: Arc<dyn RelevanceScorer>,
    pub repository: Arc<dyn ProfileRepository>,
}

/// Tunable parameters of a matching run
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub vector_threshold: f64,
    pub candidate_limit: usize,
    pub course_limit: usize,
    pub top_candidates: usize,
    pub top_courses: usize,
    pub min_fused_score: f64,
    pub embedding_dim: usize,
    pub domain_bonus: f64,
    pub scoring_concurrency: usize,
    pub scoring_timeout: Duration,
    pub run_timeout: Duration,
    pub retrieval_backoff: Duration,
    pub candidate_weights: FusionWeights,
    pub course_weights: FusionWeights,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            vector_threshold: 0.3,
            candidate_limit: 30,
            course_limit: 10,
            top_candidates: 3,
            top_courses: 3,
            min_fused_score: 0.0,
            embedding_dim: 768,
            domain_bonus: 0.10,
            scoring_concurrency: 8,
            scoring_timeout: Duration::from_secs(20),
            run_timeout: Duration::from_secs(90),
            retrieval_backoff: Duration::from_millis(250),
            candidate_weights: FusionWeights::CANDIDATE,
            course_weights: FusionWeights::COURSE,
        }
    }
}

/// Main matching orchestrator
///
/// # Pipeline Stages
/// 1. Requirement parsing (keyword fallback when extraction fails)
/// 2. Vector retrieval over the candidate pool
/// 3. Concurrent relevance + rule scoring, fused and ranked
/// 4. Top-K cut and gap detection
/// 5. Course recommendation per surviving candidate
#[derive(Clone)]
pub struct Matcher {
    parser: RequirementParser,
    embedder: Arc<dyn Embedder>,
    retriever: VectorRetriever,
    repository: Arc<dyn ProfileRepository>,
    scorer: Arc<dyn RelevanceScorer>,
    fuser: ScoreFuser,
    fanout: FanOut,
    courses: CourseRecommender,
    settings: MatchSettings,
}

impl Matcher {
    pub fn new(services: EngineServices, settings: MatchSettings) -> Self {
        let retriever = VectorRetriever::new(services.search.clone(), settings.retrieval_backoff);
        let fanout = FanOut::new(settings.scoring_concurrency, settings.scoring_timeout);

        let courses = CourseRecommender::new(
            services.embedder.clone(),
            retriever.clone(),
            services.repository.clone(),
            services.scorer.clone(),
            ScoreFuser::new(settings.course_weights),
            fanout.clone(),
            CourseSettings {
                threshold: settings.vector_threshold,
                limit: settings.course_limit,
                top_n: settings.top_courses,
                embedding_dim: settings.embedding_dim,
            },
        );

        Self {
            parser: RequirementParser::new(services.extractor),
            embedder: services.embedder,
            retriever,
            repository: services.repository,
            scorer: services.scorer,
            fuser: ScoreFuser::new(settings.candidate_weights),
            fanout,
            courses,
            settings,
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Parse requirement text without running a match
    pub async fn parse(&self, text: &str) -> Result<StructuredRequirement, MatchError> {
        self.parser.parse(text).await
    }

    /// Full run: parse the requirement text, then match it
    ///
    /// Parsing counts against the run timeout; extraction still pending at
    /// the deadline falls back to keyword parsing.
    pub async fn run(&self, text: &str) -> Result<MatchRun, MatchError> {
        let started_at = chrono::Utc::now();
        let deadline = Instant::now() + self.settings.run_timeout;

        let requirement = match tokio::time::timeout_at(deadline, self.parser.parse(text)).await {
            Ok(parsed) => parsed?,
            Err(_) => {
                tracing::warn!("Requirement extraction hit the run deadline, using keywords");
                degraded(text.trim())
            }
        };

        self.execute(requirement, started_at, deadline).await
    }

    /// Match an already structured requirement
    pub async fn match_requirement(&self, requirement: StructuredRequirement) -> Result<MatchRun, MatchError> {
        let started_at = chrono::Utc::now();
        let deadline = Instant::now() + self.settings.run_timeout;
        self.execute(requirement, started_at, deadline).await
    }

    async fn execute(
        &self,
        requirement: StructuredRequirement,
        started_at: chrono::DateTime<chrono::Utc>,
        deadline: Instant,
    ) -> Result<MatchRun, MatchError> {
        let run_id = uuid::Uuid::new_v4();
        tracing::info!(
            "Run {} started: {} skills (degraded: {})",
            run_id,
            requirement.skills.len(),
            requirement.degraded
        );
        tracing::debug!("Run {} requirement: {}", run_id, requirement.summary());

        let requirement = Arc::new(requirement);
        let embedding = before_deadline(
            deadline,
            "requirement embedding",
            embed_query(self.embedder.as_ref(), &requirement.origin_text, self.settings.embedding_dim),
        )
        .await??;

        let query = SimilarityQuery {
            embedding,
            pool: Pool::Candidates,
            threshold: self.settings.vector_threshold,
            limit: self.settings.candidate_limit,
        };
        let hits = before_deadline(deadline, "candidate retrieval", self.retriever.retrieve(&query))
            .await?
            .map_err(|source| MatchError::RetrievalUnavailable {
                pool: Pool::Candidates,
                source,
            })?;

        if hits.is_empty() {
            tracing::info!("Run {}: no candidates above similarity threshold", run_id);
            return Ok(finish(run_id, &requirement, Vec::new(), 0, false, started_at));
        }

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let profiles = before_deadline(deadline, "candidate loading", self.repository.candidates(&ids)).await??;
        let entities = join_hits(&hits, profiles);
        let considered = entities.len();

        let rule_requirement = requirement.clone();
        let domain_bonus = self.settings.domain_bonus;
        let rule = move |candidate: &CandidateProfile| {
            candidate_rule_score(&rule_requirement, candidate, domain_bonus)
        };

        let pool = self
            .fanout
            .score_all(
                entities,
                requirement.clone(),
                self.scorer.clone(),
                self.fuser,
                rule,
                deadline,
            )
            .await;
        let mut incomplete = pool.incomplete;

        let top: Vec<Scored<CandidateProfile>> = pool
            .scored
            .into_iter()
            .take(self.settings.top_candidates)
            .filter(|s| s.breakdown.fused_score >= self.settings.min_fused_score)
            .collect();

        tracing::debug!(
            "Run {}: {} scored, {} kept after top-{} cut",
            run_id,
            considered,
            top.len(),
            self.settings.top_candidates
        );

        let recommendations = try_join_all(top.iter().map(|scored| {
            let gaps = detect_gaps(&requirement, &scored.entity);
            let requirement = requirement.clone();
            async move {
                let courses = self
                    .courses
                    .recommend(&scored.entity, &gaps, &requirement, deadline)
                    .await?;
                Ok::<_, MatchError>((gaps, courses))
            }
        }))
        .await?;

        let results: Vec<MatchResult> = top
            .into_iter()
            .zip(recommendations)
            .map(|(scored, (gaps, recommendation))| {
                incomplete |= recommendation.incomplete;
                MatchResult {
                    candidate_id: scored.entity.id,
                    name: scored.entity.name,
                    breakdown: scored.breakdown,
                    gaps,
                    courses: recommendation.courses,
                }
            })
            .collect();

        let run = finish(run_id, &requirement, results, considered, incomplete, started_at);
        tracing::info!(
            "Run {} finished: {} results from {} candidates in {}ms (degraded: {}, incomplete: {})",
            run.run_id,
            run.results.len(),
            run.candidates_considered,
            (run.finished_at - run.started_at).num_milliseconds(),
            run.degraded,
            run.incomplete
        );
        Ok(run)
    }
}

fn finish(
    run_id: uuid::Uuid,
    requirement: &StructuredRequirement,
    results: Vec<MatchResult>,
    candidates_considered: usize,
    incomplete: bool,
    started_at: chrono::DateTime<chrono::Utc>,
) -> MatchRun {
    MatchRun {
        run_id,
        requirement: requirement.clone(),
        results,
        candidates_considered,
        degraded: requirement.degraded,
        incomplete,
        started_at,
        finished_at: chrono::Utc::now(),
    }
}
