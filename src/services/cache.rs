use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::services::{Embedder, EmbeddingError};

/// Embedding cache in front of any `Embedder`
///
/// Requirement texts and gap queries repeat across runs (the same gap set
/// shows up for many candidates), so embeddings are kept in a moka cache
/// keyed by the exact text. Failures are never cached.
#[derive(Clone)]
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: moka::future::Cache<String, Arc<Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, max_entries: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, cache }
    }

    /// Number of cached embeddings (approximate until pending tasks run)
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(hit) = self.cache.get(text).await {
            tracing::trace!("Embedding cache hit ({} chars)", text.len());
            return Ok(hit.as_ref().clone());
        }

        let embedding = self.inner.embed(text).await?;
        self.cache
            .insert(text.to_string(), Arc::new(embedding.clone()))
            .await;

        tracing::trace!("Embedding cached ({} chars)", text.len());
        Ok(embedding)
    }
}
