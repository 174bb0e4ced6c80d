//! Context-weighted score blending.
//!
//! Takes the raw inner-product candidates from the index and, when a session
//! context vector is available, nudges the ordering toward topical continuity.
//! The blend is deliberately asymmetric: a candidate that aligns with recent
//! context gets a small boost, but a candidate that contradicts it keeps its
//! raw relevance score — context only ever abstains from boosting, it never
//! penalizes.
//!
//! Both orderings are first-class outputs: [`Ranked::by_context`] for the
//! session-aware view and [`Ranked::by_relevance`] for the pure-relevance
//! view that downstream consumers (e.g. a "top papers" panel) still need.

use thiserror::Error;

/// Weight on the raw index score when blending.
pub const BASE_WEIGHT: f32 = 0.90;
/// Weight on the context alignment score when blending.
pub const CONTEXT_WEIGHT: f32 = 0.10;

/// Precondition violations raised during re-ranking.
#[derive(Debug, Error)]
pub enum RerankError {
    /// The context vector and a candidate vector disagree on dimension.
    /// Both must live in the same embedding space for the dot product to
    /// mean anything.
    #[error(
        "context vector has {context_dims} dims but candidate '{paper_id}' has {candidate_dims}"
    )]
    DimensionMismatch {
        paper_id: String,
        context_dims: usize,
        candidate_dims: usize,
    },
}

/// A candidate returned by the similarity index, before blending.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub paper_id: String,
    /// Raw similarity in the index's native scale (inner product of
    /// unit-normalized vectors, i.e. cosine).
    pub base_score: f32,
    /// The candidate's corpus embedding, unit-normalized.
    pub vector: Vec<f32>,
}

/// A candidate annotated with its blended score. `base_score` is always
/// preserved untouched.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub paper_id: String,
    pub base_score: f32,
    pub final_score: f32,
}

/// Re-ranked candidates, exposing both orderings.
#[derive(Debug)]
pub struct Ranked {
    /// In the order the index produced them; this is what makes the sorted
    /// views stable with respect to the underlying index query.
    items: Vec<ScoredCandidate>,
}

impl Ranked {
    /// Candidates sorted descending by blended score. Ties keep index order.
    pub fn by_context(&self) -> Vec<ScoredCandidate> {
        let mut sorted = self.items.clone();
        sorted.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    /// Candidates sorted descending by raw relevance. Ties keep index order.
    pub fn by_relevance(&self) -> Vec<ScoredCandidate> {
        let mut sorted = self.items.clone();
        sorted.sort_by(|a, b| {
            b.base_score
                .partial_cmp(&a.base_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Blend candidate scores with their alignment to the session context.
///
/// With no context (empty session history) every `final_score` equals its
/// `base_score` and re-ranking is a no-op. With a context vector, each
/// candidate's `context_score` is the dot product against its corpus vector:
///
/// - `context_score > 0` → `final = 0.90 * base + 0.10 * context`
/// - `context_score <= 0` → `final = base` (no penalty, only abstention)
pub fn rerank(candidates: &[Candidate], context: Option<&[f32]>) -> Result<Ranked, RerankError> {
    let items = candidates
        .iter()
        .map(|candidate| {
            let final_score = match context {
                None => candidate.base_score,
                Some(context_vec) => {
                    if context_vec.len() != candidate.vector.len() {
                        return Err(RerankError::DimensionMismatch {
                            paper_id: candidate.paper_id.clone(),
                            context_dims: context_vec.len(),
                            candidate_dims: candidate.vector.len(),
                        });
                    }
                    let context_score: f32 = context_vec
                        .iter()
                        .zip(candidate.vector.iter())
                        .map(|(c, v)| c * v)
                        .sum();

                    if context_score > 0.0 {
                        BASE_WEIGHT * candidate.base_score + CONTEXT_WEIGHT * context_score
                    } else {
                        candidate.base_score
                    }
                }
            };

            Ok(ScoredCandidate {
                paper_id: candidate.paper_id.clone(),
                base_score: candidate.base_score,
                final_score,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Ranked { items })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candidate(id: &str, base_score: f32, vector: Vec<f32>) -> Candidate {
        Candidate {
            paper_id: id.to_string(),
            base_score,
            vector,
        }
    }

    #[test]
    fn test_no_context_is_identity() {
        let candidates = vec![
            make_candidate("a", 0.9, vec![1.0, 0.0]),
            make_candidate("b", 0.5, vec![0.0, 1.0]),
        ];
        let ranked = rerank(&candidates, None).unwrap();
        for item in ranked.by_context() {
            assert_eq!(item.final_score, item.base_score);
        }
    }

    #[test]
    fn test_no_context_orderings_coincide() {
        let candidates = vec![
            make_candidate("a", 0.3, vec![1.0, 0.0]),
            make_candidate("b", 0.9, vec![0.0, 1.0]),
            make_candidate("c", 0.6, vec![1.0, 0.0]),
        ];
        let ranked = rerank(&candidates, None).unwrap();

        let contextual: Vec<String> = ranked.by_context().iter().map(|s| s.paper_id.clone()).collect();
        let relevance: Vec<String> = ranked.by_relevance().iter().map(|s| s.paper_id.clone()).collect();
        assert_eq!(contextual, relevance);
        assert_eq!(contextual, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_positive_alignment_blends() {
        // base 0.80, context_score 0.40 → 0.9*0.80 + 0.1*0.40 = 0.76
        let candidates = vec![make_candidate("a", 0.80, vec![0.40, 0.0])];
        let context = vec![1.0, 0.0];
        let ranked = rerank(&candidates, Some(&context)).unwrap();

        let item = &ranked.by_context()[0];
        assert!((item.final_score - 0.76).abs() < 1e-6);
        assert_eq!(item.base_score, 0.80);
    }

    #[test]
    fn test_negative_alignment_never_penalizes() {
        // base 0.80, context_score -0.10 → final stays exactly 0.80
        let candidates = vec![make_candidate("a", 0.80, vec![-0.10, 0.0])];
        let context = vec![1.0, 0.0];
        let ranked = rerank(&candidates, Some(&context)).unwrap();

        assert_eq!(ranked.by_context()[0].final_score, 0.80);
    }

    #[test]
    fn test_zero_alignment_never_penalizes() {
        // The threshold is strictly > 0: orthogonal candidates abstain too.
        let candidates = vec![make_candidate("a", 0.80, vec![0.0, 1.0])];
        let context = vec![1.0, 0.0];
        let ranked = rerank(&candidates, Some(&context)).unwrap();

        assert_eq!(ranked.by_context()[0].final_score, 0.80);
    }

    #[test]
    fn test_boost_is_convex_combination() {
        let candidates = vec![
            make_candidate("low", 0.2, vec![0.9, 0.0]),
            make_candidate("high", 0.9, vec![0.3, 0.0]),
        ];
        let context = vec![1.0, 0.0];
        let ranked = rerank(&candidates, Some(&context)).unwrap();

        for item in ranked.by_context() {
            let context_score = if item.paper_id == "low" { 0.9 } else { 0.3 };
            let lo = item.base_score.min(context_score);
            let hi = item.base_score.max(context_score);
            assert!(item.final_score >= lo && item.final_score <= hi);
        }
    }

    #[test]
    fn test_context_can_reorder_close_candidates() {
        // "b" trails "a" on raw score but aligns with the context; the
        // 10% boost is enough to flip a narrow gap.
        let candidates = vec![
            make_candidate("a", 0.80, vec![0.0, 1.0]),
            make_candidate("b", 0.79, vec![1.0, 0.0]),
        ];
        let context = vec![1.0, 0.0];
        let ranked = rerank(&candidates, Some(&context)).unwrap();

        let contextual: Vec<String> = ranked.by_context().iter().map(|s| s.paper_id.clone()).collect();
        assert_eq!(contextual, vec!["b", "a"]);

        // The pure-relevance view is unaffected.
        let relevance: Vec<String> = ranked.by_relevance().iter().map(|s| s.paper_id.clone()).collect();
        assert_eq!(relevance, vec!["a", "b"]);
    }

    #[test]
    fn test_ties_keep_index_order() {
        let candidates = vec![
            make_candidate("first", 0.5, vec![0.0, 1.0]),
            make_candidate("second", 0.5, vec![0.0, 1.0]),
            make_candidate("third", 0.5, vec![0.0, 1.0]),
        ];
        let ranked = rerank(&candidates, None).unwrap();

        let order: Vec<String> = ranked.by_context().iter().map(|s| s.paper_id.clone()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dimension_mismatch_fails_loudly() {
        let candidates = vec![make_candidate("a", 0.5, vec![1.0, 0.0, 0.0])];
        let context = vec![1.0, 0.0];
        let err = rerank(&candidates, Some(&context)).unwrap_err();

        match err {
            RerankError::DimensionMismatch {
                paper_id,
                context_dims,
                candidate_dims,
            } => {
                assert_eq!(paper_id, "a");
                assert_eq!(context_dims, 2);
                assert_eq!(candidate_dims, 3);
            }
        }
    }
}
