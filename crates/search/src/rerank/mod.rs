//! Passage reranking
//!
//! Reranking is a best-effort capability. `Reranking::select` never fails:
//! when the scorer is disabled, errors, or returns a malformed result, the
//! first `top_n` candidates in retrieval order are kept instead.

mod cross_encoder;
mod lexical;

pub use cross_encoder::HttpReranker;
pub use lexical::Bm25Reranker;

use crate::retrieval::RetrievedPassage;
use async_trait::async_trait;
use docqa_common::config::RerankerConfig;
use docqa_common::errors::{AppError, Result};
use docqa_common::metrics::record_rerank;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Relevance scorer for (query, passage) pairs
#[async_trait]
pub trait Reranker: Send + Sync {
    /// One score per passage, in the order given; higher is more relevant
    async fn score(&self, query: &str, passages: &[RetrievedPassage]) -> Result<Vec<f32>>;

    /// Name used in logs and metrics
    fn name(&self) -> &str;
}

/// How the context passages were chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Sorted by reranker score
    Reranked,
    /// Reranker failed; retrieval order kept
    Fallback,
    /// No reranker or nothing to rank; retrieval order kept
    Truncated,
}

impl SelectionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionStrategy::Reranked => "reranked",
            SelectionStrategy::Fallback => "fallback",
            SelectionStrategy::Truncated => "truncated",
        }
    }
}

impl fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Passages chosen as generation context
#[derive(Debug, Clone)]
pub struct Selection {
    pub passages: Vec<RetrievedPassage>,
    pub strategy: SelectionStrategy,
}

/// Reranking capability: present or absent
#[derive(Clone)]
pub enum Reranking {
    Enabled(Arc<dyn Reranker>),
    Disabled,
}

impl fmt::Debug for Reranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reranking::Enabled(reranker) => f.debug_tuple("Enabled").field(&reranker.name()).finish(),
            Reranking::Disabled => f.write_str("Disabled"),
        }
    }
}

impl Reranking {
    pub fn name(&self) -> &str {
        match self {
            Reranking::Enabled(reranker) => reranker.name(),
            Reranking::Disabled => "none",
        }
    }

    /// Keep the `top_n` most relevant candidates
    pub async fn select(
        &self,
        query: &str,
        mut candidates: Vec<RetrievedPassage>,
        top_n: usize,
    ) -> Selection {
        let reranker = match self {
            Reranking::Enabled(reranker) if !candidates.is_empty() => reranker,
            _ => {
                candidates.truncate(top_n);
                return self.finish(candidates, SelectionStrategy::Truncated);
            }
        };

        let scores = match reranker.score(query, &candidates).await {
            Ok(scores) if scores.len() != candidates.len() => {
                warn!(
                    reranker = reranker.name(),
                    expected = candidates.len(),
                    received = scores.len(),
                    "Reranker returned wrong number of scores, using retrieval order"
                );
                candidates.truncate(top_n);
                return self.finish(candidates, SelectionStrategy::Fallback);
            }
            Ok(scores) if scores.iter().any(|score| !score.is_finite()) => {
                warn!(
                    reranker = reranker.name(),
                    "Reranker returned non-finite scores, using retrieval order"
                );
                candidates.truncate(top_n);
                return self.finish(candidates, SelectionStrategy::Fallback);
            }
            Ok(scores) => scores,
            Err(e) => {
                warn!(
                    reranker = reranker.name(),
                    error = %e,
                    "Reranking failed, using retrieval order"
                );
                candidates.truncate(top_n);
                return self.finish(candidates, SelectionStrategy::Fallback);
            }
        };

        let mut scored: Vec<(f32, RetrievedPassage)> = scores.into_iter().zip(candidates).collect();
        // Stable: ties keep retrieval order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let passages = scored
            .into_iter()
            .take(top_n)
            .map(|(score, mut passage)| {
                passage.score = score;
                passage
            })
            .collect();

        self.finish(passages, SelectionStrategy::Reranked)
    }

    fn finish(&self, passages: Vec<RetrievedPassage>, strategy: SelectionStrategy) -> Selection {
        debug!(reranker = self.name(), %strategy, selected = passages.len(), "Passages selected");
        record_rerank(strategy.as_str(), self.name());
        Selection { passages, strategy }
    }
}

/// Build the reranking capability from configuration
pub fn create_reranker(config: &RerankerConfig) -> Result<Reranking> {
    match config.provider.as_str() {
        "lexical" => Ok(Reranking::Enabled(Arc::new(Bm25Reranker::default()))),
        "http" => Ok(Reranking::Enabled(Arc::new(HttpReranker::new(config)?))),
        "none" => Ok(Reranking::Disabled),
        other => Err(AppError::Configuration {
            message: format!("Unknown reranker provider: {}", other),
        }),
    }
}
