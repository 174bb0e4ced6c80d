//! In-memory flat inner-product index over the paper corpus.
//!
//! Loads every stored paper vector from SQLite, unit-normalizes it, and
//! answers top-k queries by an exact brute-force scan. No approximate
//! structures — the corpus is small enough that a linear pass with a sort
//! is both simpler and exactly correct.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, dot, normalize};
use crate::rerank::Candidate;

struct IndexEntry {
    paper_id: String,
    /// Unit-normalized corpus embedding.
    vector: Vec<f32>,
}

/// Exact inner-product index held entirely in memory.
///
/// Read-only after [`FlatIndex::load`]; safe to share across concurrent
/// searches.
pub struct FlatIndex {
    dims: usize,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Load all paper vectors from the database and normalize them for
    /// cosine-similarity semantics.
    ///
    /// Fails if any stored vector disagrees with `expected_dims` — a corpus
    /// with mixed dimensions would produce silently wrong scores.
    pub async fn load(pool: &SqlitePool, expected_dims: usize) -> Result<Self> {
        let rows = sqlx::query("SELECT paper_id, dims, embedding FROM paper_vectors")
            .fetch_all(pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let paper_id: String = row.get("paper_id");
            let dims: i64 = row.get("dims");
            if dims as usize != expected_dims {
                bail!(
                    "Stored vector for paper {} has {} dims, corpus is configured for {}",
                    paper_id,
                    dims,
                    expected_dims
                );
            }

            let blob: Vec<u8> = row.get("embedding");
            let mut vector = blob_to_vec(&blob);
            normalize(&mut vector);
            entries.push(IndexEntry { paper_id, vector });
        }

        Ok(Self {
            dims: expected_dims,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Return the top `k` candidates by inner product against `query`,
    /// sorted descending. Ties keep corpus order (stable sort).
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Candidate>> {
        if query.len() != self.dims {
            bail!(
                "Query vector has {} dims, index holds {}-dim vectors",
                query.len(),
                self.dims
            );
        }

        let mut candidates: Vec<Candidate> = self
            .entries
            .iter()
            .map(|entry| Candidate {
                paper_id: entry.paper_id.clone(),
                base_score: dot(query, &entry.vector),
                vector: entry.vector.clone(),
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.base_score
                .partial_cmp(&a.base_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k);

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_from(vectors: Vec<(&str, Vec<f32>)>) -> FlatIndex {
        let dims = vectors[0].1.len();
        let entries = vectors
            .into_iter()
            .map(|(id, mut vector)| {
                normalize(&mut vector);
                IndexEntry {
                    paper_id: id.to_string(),
                    vector,
                }
            })
            .collect();
        FlatIndex { dims, entries }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let index = index_from(vec![
            ("far", vec![0.0, 1.0]),
            ("near", vec![1.0, 0.1]),
            ("exact", vec![1.0, 0.0]),
        ]);

        let results = index.search(&[1.0, 0.0], 3).unwrap();
        assert_eq!(results[0].paper_id, "exact");
        assert_eq!(results[1].paper_id, "near");
        assert_eq!(results[2].paper_id, "far");
    }

    #[test]
    fn test_search_truncates_to_k() {
        let index = index_from(vec![
            ("a", vec![1.0, 0.0]),
            ("b", vec![0.9, 0.1]),
            ("c", vec![0.8, 0.2]),
        ]);

        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_rejects_dimension_mismatch() {
        let index = index_from(vec![("a", vec![1.0, 0.0])]);
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_empty_index_returns_no_candidates() {
        let index = FlatIndex {
            dims: 2,
            entries: Vec::new(),
        };
        let results = index.search(&[1.0, 0.0], 5).unwrap();
        assert!(results.is_empty());
    }
}
