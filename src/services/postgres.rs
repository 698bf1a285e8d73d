use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::core::skills::normalize_skill_map;
use crate::models::{CandidateProfile, CourseLevel, CourseProfile, Pool};
use crate::services::{
    ProfileRepository, RepositoryError, RetrievalError, SimilarityHit, SimilarityQuery, SimilaritySearch,
};

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Invalid record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

impl From<PostgresError> for RepositoryError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::InvalidRecord { id, reason } => RepositoryError::InvalidRecord { id, reason },
            other => RepositoryError::Unavailable(other.to_string()),
        }
    }
}

impl From<PostgresError> for RetrievalError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::SqlxError(
                e @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => RetrievalError::Unreachable(e.to_string()),
            other => RetrievalError::Backend(other.to_string()),
        }
    }
}

/// pgvector-backed profile store
///
/// Candidates and courses live in the `candidates` and `courses` tables,
/// each with an `embedding vector(N)` column. The engine only reads; the
/// schema is owned by the ingestion side.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL at {}", redact_url(url));

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    async fn nearest(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityHit>, PostgresError> {
        // cosine distance operator; similarity = 1 - distance
        let sql = format!(
            r#"
            SELECT id::text AS id, 1 - (embedding <=> $1::vector) AS similarity
            FROM {}
            WHERE embedding IS NOT NULL
              AND 1 - (embedding <=> $1::vector) > $2
            ORDER BY similarity DESC, id ASC
            LIMIT $3
            "#,
            table_for(query.pool)
        );

        let rows = sqlx::query(&sql)
            .bind(format_vector(&query.embedding))
            .bind(query.threshold)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<SimilarityHit, PostgresError> {
                Ok(SimilarityHit {
                    id: row.try_get("id")?,
                    similarity: row.try_get("similarity")?,
                })
            })
            .collect()
    }

    async fn load_candidates(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, PostgresError> {
        let query = r#"
            SELECT id::text AS id, name, skills, domain_tags, raw_text, experience_summary
            FROM candidates
            WHERE id::text = ANY($1)
        "#;

        let rows = sqlx::query(query).bind(ids).fetch_all(&self.pool).await?;
        let candidates = rows.iter().map(candidate_from_row).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} of {} candidates", candidates.len(), ids.len());
        Ok(candidates)
    }

    async fn load_courses(&self, ids: &[String]) -> Result<Vec<CourseProfile>, PostgresError> {
        let query = r#"
            SELECT id::text AS id, title, description, level, prerequisites, url
            FROM courses
            WHERE id::text = ANY($1)
        "#;

        let rows = sqlx::query(query).bind(ids).fetch_all(&self.pool).await?;
        let courses = rows.iter().map(course_from_row).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} of {} courses", courses.len(), ids.len());
        Ok(courses)
    }
}

#[async_trait]
impl SimilaritySearch for PostgresStore {
    async fn search(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityHit>, RetrievalError> {
        self.nearest(query).await.map_err(Into::into)
    }
}

#[async_trait]
impl ProfileRepository for PostgresStore {
    async fn candidates(&self, ids: &[String]) -> Result<Vec<CandidateProfile>, RepositoryError> {
        self.load_candidates(ids).await.map_err(Into::into)
    }

    async fn courses(&self, ids: &[String]) -> Result<Vec<CourseProfile>, RepositoryError> {
        self.load_courses(ids).await.map_err(Into::into)
    }
}

fn table_for(pool: Pool) -> &'static str {
    match pool {
        Pool::Candidates => "candidates",
        Pool::Courses => "courses",
    }
}

/// pgvector text literal, e.g. `[0.1,0.2]`
fn format_vector(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|v| v.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => format!("{}://***{}", &url[..scheme], &url[at..]),
        _ => url.to_string(),
    }
}

fn invalid(id: &str, column: &str, err: sqlx::Error) -> PostgresError {
    PostgresError::InvalidRecord {
        id: id.to_string(),
        reason: format!("{}: {}", column, err),
    }
}

fn candidate_from_row(row: &PgRow) -> Result<CandidateProfile, PostgresError> {
    let id: String = row.try_get("id")?;
    let skills: Json<HashMap<String, f64>> = row.try_get("skills").map_err(|e| invalid(&id, "skills", e))?;
    let domain_tags: Option<Json<Vec<String>>> =
        row.try_get("domain_tags").map_err(|e| invalid(&id, "domain_tags", e))?;

    Ok(CandidateProfile {
        name: row.try_get("name")?,
        skills: normalize_skill_map(skills.0.iter().map(|(k, v)| (k.as_str(), *v))),
        domain_tags: domain_tags.map(|t| t.0).unwrap_or_default(),
        raw_text: row.try_get::<Option<String>, _>("raw_text")?.unwrap_or_default(),
        experience_summary: row.try_get("experience_summary")?,
        embedding: Vec::new(),
        id,
    })
}

fn course_from_row(row: &PgRow) -> Result<CourseProfile, PostgresError> {
    let id: String = row.try_get("id")?;
    let prerequisites: Option<Json<Vec<String>>> =
        row.try_get("prerequisites").map_err(|e| invalid(&id, "prerequisites", e))?;
    let level: Option<String> = row.try_get("level")?;

    Ok(CourseProfile {
        title: row.try_get("title")?,
        description: row.try_get::<Option<String>, _>("description")?.unwrap_or_default(),
        level: level.as_deref().map(CourseLevel::parse).unwrap_or_default(),
        prerequisites: prerequisites.map(|p| p.0).unwrap_or_default(),
        url: row.try_get("url")?,
        embedding: Vec::new(),
        id,
    })
}
