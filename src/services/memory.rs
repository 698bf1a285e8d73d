use async_trait::async_trait;

use crate::core::similarity::{cosine_similarity, normalize_hits};
use crate::models::{CandidateProfile, CourseProfile, Pool};
use crate::services::{
    ProfileRepository, RepositoryError, RetrievalError, SimilarityHit, SimilarityQuery, SimilaritySearch,
};

/// In-process candidate and course pools
///
/// Serves both similarity search (exact cosine over stored embeddings) and
/// profile reads. Used for tests, benchmarks and local runs without a
/// database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPool {
    candidates: Vec<CandidateProfile>,
    courses: Vec<CourseProfile>,
}

impl InMemoryPool {
    pub fn new(candidates: Vec<CandidateProfile>, courses: Vec<CourseProfile>) -> Self {
        Self { candidates, courses }
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }
}

#[async_trait]
impl SimilaritySearch for InMemoryPool {
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityHit>, RetrievalError> {
        let hits: Vec<SimilarityHit> = match query.pool {
            Pool::Candidates => self
                .candidates
                .iter()
                .map(|c| SimilarityHit {
                    id: c.id.clone(),
                    similarity: cosine_similarity(&query.embedding, &c.embedding),
                })
                .collect(),
            Pool::Courses => self
                .courses
                .iter()
                .map(|c| SimilarityHit {
                    id: c.id.clone(),
                    similarity: cosine_similarity(&query.embedding, &c.embedding),
                })
                .collect(),
        };

        Ok(normalize_hits(hits, query.threshold, query.limit))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryPool {
    async fn candidates(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, RepositoryError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.candidates.iter().find(|c| &c.id == id))
            .cloned()
            .collect())
    }

    async fn courses(&self, ids: &[String]) -> Result<Vec<CourseProfile>, RepositoryError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.courses.iter().find(|c| &c.id == id))
            .cloned()
            .collect())
    }
}
