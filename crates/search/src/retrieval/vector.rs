//! In-memory vector index
//!
//! Passages are embedded at store time and ranked by cosine similarity at
//! query time. Each document owns its own partition, so retrieval is scoped
//! by construction. Contents live for the lifetime of the process.

use super::{ChunkStore, RetrievedPassage};
use async_trait::async_trait;
use dashmap::DashMap;
use docqa_common::errors::{AppError, Result};
use docqa_common::metrics::record_embedding;
use docqa_common::{Embedder, Passage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

struct IndexedPassage {
    passage: Passage,
    embedding: Vec<f32>,
}

/// Vector index backed by a concurrent map of document partitions
pub struct InMemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    min_score: f32,
    documents: DashMap<String, Arc<Vec<IndexedPassage>>>,
}

impl InMemoryVectorStore {
    /// Create a store; hits scoring below `min_score` are dropped
    pub fn new(embedder: Arc<dyn Embedder>, batch_size: usize, min_score: f32) -> Self {
        Self {
            embedder,
            batch_size: batch_size.max(1),
            min_score,
            documents: DashMap::new(),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let result = self.embedder.embed_batch(texts).await;
        record_embedding(
            start.elapsed().as_secs_f64(),
            self.embedder.model_name(),
            texts.len(),
            result.is_ok(),
        );
        result.map_err(AppError::into_embedding_failure)
    }
}

#[async_trait]
impl ChunkStore for InMemoryVectorStore {
    #[instrument(skip(self, passages), fields(passages = passages.len()))]
    async fn store(&self, document_id: &str, passages: Vec<Passage>) -> Result<usize> {
        if passages.is_empty() {
            return Err(AppError::EmbeddingFailure {
                message: "No chunks provided to embed.".to_string(),
            });
        }

        let mut indexed = Vec::with_capacity(passages.len());
        for batch in passages.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            let embeddings = self.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AppError::EmbeddingFailure {
                    message: format!(
                        "Embedder returned {} vectors for {} passages",
                        embeddings.len(),
                        batch.len()
                    ),
                });
            }

            indexed.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(passage, embedding)| IndexedPassage { passage, embedding }),
            );
        }

        let count = indexed.len();
        self.documents
            .insert(document_id.to_string(), Arc::new(indexed));

        info!(count, model = self.embedder.model_name(), "Passages indexed");
        Ok(count)
    }

    #[instrument(skip(self, query))]
    async fn retrieve(
        &self,
        document_id: &str,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        // Clone the partition out so no map guard is held across the await
        let partition = self
            .documents
            .get(document_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })?;

        let query_embedding = self
            .embed_batch(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::EmbeddingFailure {
                message: "Empty response for query embedding".to_string(),
            })?;

        let mut hits: Vec<RetrievedPassage> = partition
            .iter()
            .map(|indexed| RetrievedPassage {
                document_id: document_id.to_string(),
                passage: indexed.passage.clone(),
                score: cosine_similarity(&query_embedding, &indexed.embedding),
            })
            .filter(|hit| hit.score >= self.min_score)
            .collect();

        // Stable: equal scores keep index order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);

        debug!(
            candidates = partition.len(),
            returned = hits.len(),
            "Similarity search complete"
        );
        Ok(hits)
    }

    async fn contains(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    fn document_count(&self) -> usize {
        self.documents.len()
    }
}

/// Cosine similarity; 0.0 when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
