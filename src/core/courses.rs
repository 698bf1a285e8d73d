use std::sync::Arc;

use tokio::time::Instant;

use crate::core::pipeline::{embed_query, join_hits, FanOut, MatchError};
use crate::core::retriever::VectorRetriever;
use crate::core::rules::course_rule_score;
use crate::core::scoring::ScoreFuser;
use crate::models::{
    CandidateProfile, CourseMatch, CourseProfile, Pool, SkillGap, SkillRequirement, StructuredRequirement,
};
use crate::services::{Embedder, ProfileRepository, RelevanceScorer, SimilarityQuery};

/// Retrieval and selection limits for course recommendation
#[derive(Debug, Clone, Copy)]
pub struct CourseSettings {
    pub threshold: f64,
    /// Courses retrieved per gap query
    pub limit: usize,
    /// Courses kept per candidate
    pub top_n: usize,
    pub embedding_dim: usize,
}

impl Default for CourseSettings {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            limit: 10,
            top_n: 3,
            embedding_dim: 768,
        }
    }
}

/// Courses recommended for one candidate
#[derive(Debug, Clone, Default)]
pub struct CourseRecommendation {
    pub courses: Vec<CourseMatch>,
    /// Some courses were still scoring at the run deadline
    pub incomplete: bool,
}

/// Recommends courses that close a candidate's skill gaps
///
/// Runs the retrieval and fusion pipeline over the course pool with the
/// course weighting. Unmet prerequisites lower a course's rule score but
/// never exclude it.
#[derive(Clone)]
pub struct CourseRecommender {
    embedder: Arc<dyn Embedder>,
    retriever: VectorRetriever,
    repository: Arc<dyn ProfileRepository>,
    scorer: Arc<dyn RelevanceScorer>,
    fuser: ScoreFuser,
    fanout: FanOut,
    settings: CourseSettings,
}

impl CourseRecommender {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: VectorRetriever,
        repository: Arc<dyn ProfileRepository>,
        scorer: Arc<dyn RelevanceScorer>,
        fuser: ScoreFuser,
        fanout: FanOut,
        settings: CourseSettings,
    ) -> Self {
        Self {
            embedder,
            retriever,
            repository,
            scorer,
            fuser,
            fanout,
            settings,
        }
    }

    /// Recommend up to `top_n` courses for the given gaps
    ///
    /// An empty gap list returns no courses without any external call.
    /// `context` supplies the domain and seniority of the matched
    /// requirement to the relevance scorer. Reaching the run deadline before
    /// any course is scored yields no courses, flagged incomplete.
    pub async fn recommend(
        &self,
        candidate: &CandidateProfile,
        gaps: &[SkillGap],
        context: &StructuredRequirement,
        deadline: Instant,
    ) -> Result<CourseRecommendation, MatchError> {
        if gaps.is_empty() {
            return Ok(CourseRecommendation::default());
        }

        let query_text = gap_query(gaps);
        let entities = match tokio::time::timeout_at(deadline, self.load_courses(&query_text)).await {
            Ok(loaded) => loaded?,
            Err(_) => {
                tracing::warn!("Run deadline reached before courses for {} were retrieved", candidate.id);
                return Ok(CourseRecommendation {
                    courses: Vec::new(),
                    incomplete: true,
                });
            }
        };

        if entities.is_empty() {
            tracing::debug!("No courses retrieved for {} gaps of {}", gaps.len(), candidate.id);
            return Ok(CourseRecommendation::default());
        }

        let gap_list = Arc::new(gaps.to_vec());
        let holder = Arc::new(candidate.clone());
        let rule = move |course: &CourseProfile| course_rule_score(&gap_list, course, &holder);

        let pool = self
            .fanout
            .score_all(
                entities,
                Arc::new(gap_requirement(gaps, context, query_text)),
                self.scorer.clone(),
                self.fuser,
                rule,
                deadline,
            )
            .await;

        let courses = pool
            .scored
            .into_iter()
            .take(self.settings.top_n)
            .map(|scored| CourseMatch {
                gaps_addressed: addressed_gaps(gaps, &scored.breakdown.evidence),
                course: scored.entity,
                breakdown: scored.breakdown,
            })
            .collect();

        Ok(CourseRecommendation {
            courses,
            incomplete: pool.incomplete,
        })
    }

    /// Embed the gap query, retrieve course hits and load their profiles
    async fn load_courses(&self, query_text: &str) -> Result<Vec<(CourseProfile, f64)>, MatchError> {
        let embedding = embed_query(self.embedder.as_ref(), query_text, self.settings.embedding_dim).await?;

        let query = SimilarityQuery {
            embedding,
            pool: Pool::Courses,
            threshold: self.settings.threshold,
            limit: self.settings.limit,
        };
        let hits = self
            .retriever
            .retrieve(&query)
            .await
            .map_err(|source| MatchError::RetrievalUnavailable {
                pool: Pool::Courses,
                source,
            })?;

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
        let courses = self.repository.courses(&ids).await?;
        Ok(join_hits(&hits, courses))
    }
}

/// Synthetic retrieval query: the gap skill names in gap order
fn gap_query(gaps: &[SkillGap]) -> String {
    gaps.iter().map(|g| g.skill.as_str()).collect::<Vec<_>>().join(", ")
}

/// Requirement handed to the relevance scorer when scoring courses
fn gap_requirement(gaps: &[SkillGap], context: &StructuredRequirement, query_text: String) -> StructuredRequirement {
    StructuredRequirement {
        skills: gaps
            .iter()
            .map(|g| SkillRequirement {
                skill: g.skill.clone(),
                min_years: g.required_years,
                required: true,
            })
            .collect(),
        domain_tags: context.domain_tags.clone(),
        seniority: context.seniority,
        origin_text: format!("Close skill gaps: {}", query_text),
        degraded: context.degraded,
    }
}

fn addressed_gaps(gaps: &[SkillGap], evidence: &[String]) -> Vec<String> {
    gaps.iter()
        .filter(|g| evidence.iter().any(|e| e.eq_ignore_ascii_case(&g.skill)))
        .map(|g| g.skill.clone())
        .collect()
}
