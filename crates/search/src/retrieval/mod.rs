//! Document-scoped passage retrieval
//!
//! A chunk store keeps passages partitioned by document identifier; a query
//! against one document never sees another document's passages.

mod vector;

pub use vector::{cosine_similarity, InMemoryVectorStore};

use async_trait::async_trait;
use docqa_common::errors::Result;
use docqa_common::Passage;
use serde::{Deserialize, Serialize};

/// Passage returned by a retrieval, with its owning document and score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// Document the passage was indexed under
    pub document_id: String,

    pub passage: Passage,

    /// Similarity to the query; higher is closer
    pub score: f32,
}

/// Index of passages keyed by document identifier
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Embed and index passages under `document_id`, returning the count stored
    ///
    /// Fails with `EmbeddingFailure` when the index cannot be written.
    async fn store(&self, document_id: &str, passages: Vec<Passage>) -> Result<usize>;

    /// Top `k` passages of `document_id` ranked by similarity to `query`
    ///
    /// Fails with `DocumentNotFound` when nothing was indexed under the id.
    /// An empty result is valid.
    async fn retrieve(&self, document_id: &str, query: &str, k: usize)
        -> Result<Vec<RetrievedPassage>>;

    /// Whether anything was indexed under `document_id`
    async fn contains(&self, document_id: &str) -> bool;

    /// Number of indexed documents
    fn document_count(&self) -> usize;
}
