use std::cmp::Ordering;
use std::collections::HashMap;

use crate::services::SimilarityHit;

/// Cosine similarity between two embeddings
///
/// # Returns
/// Similarity in [-1, 1], or 0.0 when the vectors differ in length or
/// either one has zero magnitude.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Order two hits: similarity descending, then id ascending
#[inline]
pub fn compare_hits(a: &SimilarityHit, b: &SimilarityHit) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| a.id.cmp(&b.id))
}

/// Enforce the retrieval contract on raw search output
///
/// Drops non-finite similarities and anything at or below `threshold`,
/// keeps the best similarity per id, orders deterministically and caps the
/// list at `limit`.
pub fn normalize_hits(hits: Vec<SimilarityHit>, threshold: f64, limit: usize) -> Vec<SimilarityHit> {
    let mut best: HashMap<String, f64> = HashMap::with_capacity(hits.len());

    for hit in hits {
        if !hit.similarity.is_finite() || hit.similarity <= threshold {
            continue;
        }
        best.entry(hit.id)
            .and_modify(|s| *s = s.max(hit.similarity))
            .or_insert(hit.similarity);
    }

    let mut ordered: Vec<SimilarityHit> = best
        .into_iter()
        .map(|(id, similarity)| SimilarityHit { id, similarity })
        .collect();

    ordered.sort_by(compare_hits);
    ordered.truncate(limit);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, similarity: f64) -> SimilarityHit {
        SimilarityHit {
            id: id.to_string(),
            similarity,
        }
    }

    #[test]
    fn test_cosine_identical_and_opposite() {
        let v = [0.3_f32, -1.2, 4.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();

        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&v, &neg) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_orthogonal_and_degenerate() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_normalize_hits_threshold_dedup_and_order() {
        let hits = vec![
            hit("b", 0.8),
            hit("a", 0.8),
            hit("c", 0.3),
            hit("d", 0.95),
            hit("b", 0.5),
            hit("e", f64::NAN),
            hit("f", 0.31),
        ];

        let result = normalize_hits(hits, 0.3, 10);
        let ids: Vec<&str> = result.iter().map(|h| h.id.as_str()).collect();

        assert_eq!(ids, vec!["d", "a", "b", "f"]);
        assert_eq!(result[2].similarity, 0.8);
    }

    #[test]
    fn test_normalize_hits_respects_limit() {
        let hits = (0..50).map(|i| hit(&format!("id{:02}", i), 0.5 + i as f64 / 100.0)).collect();
        let result = normalize_hits(hits, 0.3, 30);
        assert_eq!(result.len(), 30);
        assert_eq!(result[0].id, "id49");
    }
}
