use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::StructuredRequirement;
use crate::services::{
    Embedder, EmbeddingError, ExtractedRequirement, ExtractionError, Relevance, RelevanceScorer,
    RequirementExtractor, ScoringError,
};

/// Errors that can occur when calling the text-understanding service
#[derive(Debug, Error)]
pub enum TextServiceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

impl TextServiceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TextServiceError::RequestError(e) if e.is_timeout())
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, TextServiceError::InvalidResponse(_))
    }
}

#[derive(Debug, Serialize)]
struct TextPayload<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ScorePayload<'a> {
    requirement: &'a StructuredRequirement,
    requirement_summary: String,
    entity_text: &'a str,
}

/// Scorer response; `relevance_score` is a 0-100 percentage
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    relevance_score: f64,
    #[serde(default)]
    evidence: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Client for the text-understanding service
///
/// One HTTP backend serves three capabilities:
/// - requirement extraction (`POST /v1/extract`)
/// - relevance scoring of an entity text (`POST /v1/score`)
/// - text embeddings (`POST /v1/embed`)
#[derive(Clone)]
pub struct TextServiceClient {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: Client,
}

impl TextServiceClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, TextServiceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client,
        })
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, TextServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TextServiceError::Unauthorized);
        }

        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!("Text service {} failed: {} - {}", path, status, text);
            return Err(TextServiceError::ApiError {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| TextServiceError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl RequirementExtractor for TextServiceClient {
    async fn extract(&self, text: &str) -> Result<ExtractedRequirement, ExtractionError> {
        self.post("/v1/extract", &TextPayload { text })
            .await
            .map_err(|e| {
                if e.is_malformed() {
                    ExtractionError::Malformed(e.to_string())
                } else {
                    ExtractionError::Unavailable(e.to_string())
                }
            })
    }
}

#[async_trait]
impl RelevanceScorer for TextServiceClient {
    async fn score(
        &self,
        requirement: &StructuredRequirement,
        entity_text: &str,
    ) -> Result<Relevance, ScoringError> {
        let payload = ScorePayload {
            requirement,
            requirement_summary: requirement.summary(),
            entity_text,
        };

        let response: ScoreResponse = self.post("/v1/score", &payload).await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                }
            } else if e.is_malformed() {
                ScoringError::Malformed(e.to_string())
            } else {
                ScoringError::Unavailable(e.to_string())
            }
        })?;

        if !response.relevance_score.is_finite() || !(0.0..=100.0).contains(&response.relevance_score) {
            return Err(ScoringError::Malformed(format!(
                "relevance_score {} outside 0-100",
                response.relevance_score
            )));
        }

        Ok(Relevance {
            score: response.relevance_score / 100.0,
            evidence: response.evidence,
        })
    }
}

#[async_trait]
impl Embedder for TextServiceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response: EmbedResponse = self
            .post("/v1/embed", &TextPayload { text })
            .await
            .map_err(|e| {
                if e.is_malformed() {
                    EmbeddingError::Malformed(e.to_string())
                } else {
                    EmbeddingError::Unavailable(e.to_string())
                }
            })?;

        if response.embedding.is_empty() {
            return Err(EmbeddingError::Malformed("empty embedding".to_string()));
        }
        Ok(response.embedding)
    }
}
