// Service exports
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod text_service;

pub use cache::CachedEmbedder;
pub use memory::InMemoryPool;
pub use postgres::{PostgresError, PostgresStore};
pub use text_service::{TextServiceClient, TextServiceError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{CandidateProfile, CourseProfile, Pool, StructuredRequirement};

/// Errors from the requirement extraction capability
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed extraction response: {0}")]
    Malformed(String),
}

/// Errors from the embedding capability
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

/// Errors from the similarity search backend
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("similarity search unreachable: {0}")]
    Unreachable(String),

    #[error("similarity search failed: {0}")]
    Backend(String),
}

/// Errors from the relevance scoring capability
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("relevance scoring timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("relevance scoring unavailable: {0}")]
    Unavailable(String),

    #[error("malformed scoring response: {0}")]
    Malformed(String),
}

/// Errors from the candidate/course repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    #[error("invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// Requirement fields as returned by the text-understanding capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedRequirement {
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub preferred_skills: Vec<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub domain_tags: Vec<String>,
    #[serde(default)]
    pub min_years_per_skill: HashMap<String, f64>,
    #[serde(default)]
    pub seniority: Option<String>,
}

/// Relevance judgement for one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    /// Score in [0,1]
    pub score: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// A similarity search request
#[derive(Debug, Clone)]
pub struct SimilarityQuery {
    pub embedding: Vec<f32>,
    pub pool: Pool,
    pub threshold: f64,
    pub limit: usize,
}

/// One similarity search result, `similarity = 1 - cosine_distance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub id: String,
    pub similarity: f64,
}

/// Turns free text into requirement fields
#[async_trait]
pub trait RequirementExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<ExtractedRequirement, ExtractionError>;
}

/// Computes text embeddings
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Ranked nearest-neighbour search over a pool
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityHit>, RetrievalError>;
}

/// Scores how well an entity text fits a requirement.
///
/// Output may vary between calls for the same input.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(
        &self,
        requirement: &StructuredRequirement,
        entity_text: &str,
    ) -> Result<Relevance, ScoringError>;
}

/// Read-only access to candidate and course records
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn candidates(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, RepositoryError>;

    async fn courses(&self, ids: &[String]) -> Result<Vec<CourseProfile>, RepositoryError>;
}
