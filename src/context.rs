//! Session context engine.
//!
//! Remembers the last few query embeddings for a conversation and collapses
//! them into a single "drift" vector describing the user's recent interest
//! trajectory. The newest query carries full weight and each older query is
//! discounted by one more factor of `alpha`, so a session that moves from
//! "transformers" to "protein folding" tilts toward the latter without
//! forgetting the former outright.
//!
//! One [`ContextEngine`] belongs to exactly one session. It has no interior
//! locking; callers that serve concurrent sessions give each session its own
//! instance (see [`crate::session`]).

use std::collections::VecDeque;
use thiserror::Error;

use crate::config::ContextConfig;

/// Precondition violations raised by the context engine.
#[derive(Debug, Error)]
pub enum ContextError {
    /// A query vector's dimensionality disagrees with the dimension
    /// established by the first vector added to this engine.
    #[error("query vector dimension mismatch: engine holds {expected}-dim vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Bounded FIFO of recent query embeddings with exponential decay weighting.
pub struct ContextEngine {
    max_history: usize,
    alpha: f32,
    history: VecDeque<Vec<f32>>,
}

impl ContextEngine {
    /// Create an engine that remembers at most `max_history` queries, with
    /// decay factor `alpha` in `(0, 1]`. Both are fixed for the engine's
    /// lifetime; config validation enforces the ranges.
    pub fn new(max_history: usize, alpha: f32) -> Self {
        Self {
            max_history,
            alpha,
            history: VecDeque::with_capacity(max_history),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.max_history, config.alpha)
    }

    /// Append a query embedding to the history, evicting the oldest entry
    /// once the buffer is full.
    ///
    /// The first vector added establishes the engine's dimension; later
    /// vectors of a different length are rejected rather than silently
    /// producing a wrong weighted sum.
    pub fn add_query(&mut self, vector: Vec<f32>) -> Result<(), ContextError> {
        if let Some(first) = self.history.front() {
            if first.len() != vector.len() {
                return Err(ContextError::DimensionMismatch {
                    expected: first.len(),
                    actual: vector.len(),
                });
            }
        }

        self.history.push_back(vector);
        if self.history.len() > self.max_history {
            self.history.pop_front();
        }

        Ok(())
    }

    /// Aggregate the current history into a single context vector.
    ///
    /// Returns `None` while the history is empty — "no context yet" is
    /// distinct from a context that happens to sum to zero. Otherwise the
    /// result is the convex combination of the history entries under
    /// normalized decay weights: recomputed on every call, pure in the
    /// current history and configuration.
    pub fn context_vector(&self) -> Option<Vec<f32>> {
        if self.history.is_empty() {
            return None;
        }

        let weights = self.decay_weights();
        let dims = self.history[0].len();

        let mut context = vec![0.0f32; dims];
        for (weight, embedding) in weights.iter().zip(self.history.iter()) {
            for (acc, value) in context.iter_mut().zip(embedding.iter()) {
                *acc += weight * value;
            }
        }

        Some(context)
    }

    /// Normalized weights for the current history, oldest first.
    ///
    /// The raw weight for position `i` of `n` is `alpha^(n - i - 1)`: the
    /// newest entry gets `alpha^0 = 1`. Normalization divides by the sum so
    /// the weights form a convex combination. `alpha = 1` degenerates to a
    /// uniform average.
    fn decay_weights(&self) -> Vec<f32> {
        let n = self.history.len();
        let mut weights: Vec<f32> = (0..n)
            .map(|i| self.alpha.powi((n - i - 1) as i32))
            .collect();

        let sum: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= sum;
        }

        weights
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}
