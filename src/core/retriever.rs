use std::sync::Arc;
use std::time::Duration;

use crate::core::similarity::normalize_hits;
use crate::services::{RetrievalError, SimilarityHit, SimilarityQuery, SimilaritySearch};

/// Thin adapter over the similarity search service
///
/// Retries a failed search once after `backoff` and enforces the result
/// contract: similarity above threshold, no duplicate ids, similarity
/// descending with ties broken by ascending id, at most `limit` hits.
#[derive(Clone)]
pub struct VectorRetriever {
    search: Arc<dyn SimilaritySearch>,
    backoff: Duration,
}

impl VectorRetriever {
    pub fn new(search: Arc<dyn SimilaritySearch>, backoff: Duration) -> Self {
        Self { search, backoff }
    }

    pub async fn retrieve(&self, query: &SimilarityQuery) -> Result<Vec<SimilarityHit>, RetrievalError> {
        let hits = match self.search.search(query).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(
                    "Similarity search on {} failed ({}), retrying in {:?}",
                    query.pool,
                    e,
                    self.backoff
                );
                tokio::time::sleep(self.backoff).await;
                self.search.search(query).await?
            }
        };

        let hits = normalize_hits(hits, query.threshold, query.limit);
        tracing::debug!("Retrieved {} hits from {} pool", hits.len(), query.pool);
        Ok(hits)
    }
}
