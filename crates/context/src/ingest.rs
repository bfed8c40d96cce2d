//! Document ingestion into the chunk store
//!
//! Parsing runs on the blocking pool. A document that yields no passages is
//! rejected with `EmptyDocument` before anything reaches the index.

use crate::ids::IdGenerator;
use docqa_common::errors::{AppError, Result};
use docqa_common::metrics::record_ingestion;
use docqa_common::Passage;
use docqa_ingestion::DocumentProcessor;
use docqa_search::ChunkStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

/// Outcome of indexing one document
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub document_id: String,
    pub document_name: String,
    pub passages: usize,
}

pub struct DocumentIngestor {
    processor: Arc<DocumentProcessor>,
    store: Arc<dyn ChunkStore>,
    ids: Arc<dyn IdGenerator>,
}

impl DocumentIngestor {
    pub fn new(
        processor: Arc<DocumentProcessor>,
        store: Arc<dyn ChunkStore>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            processor,
            store,
            ids,
        }
    }

    /// Parse an uploaded file and index its passages under a fresh id
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn ingest(&self, document_name: &str, bytes: Vec<u8>) -> Result<IngestReceipt> {
        let start = Instant::now();
        let processor = Arc::clone(&self.processor);
        let name = document_name.to_string();

        let processed = tokio::task::spawn_blocking(move || processor.process(&name, &bytes))
            .await
            .map_err(|e| AppError::Internal {
                message: format!("Document processing task failed: {}", e),
            })??;

        let receipt = self.index_passages(document_name, processed.passages).await?;
        record_ingestion(
            start.elapsed().as_secs_f64(),
            receipt.passages,
            processed.format.as_str(),
        );
        Ok(receipt)
    }

    /// Index already-processed passages under a fresh id
    pub async fn index_passages(
        &self,
        document_name: &str,
        passages: Vec<Passage>,
    ) -> Result<IngestReceipt> {
        if passages.is_empty() {
            return Err(AppError::EmptyDocument);
        }

        let document_id = self.ids.document_id();
        let stored = self
            .store
            .store(&document_id, passages)
            .await
            .map_err(AppError::into_embedding_failure)?;

        info!(%document_id, document_name, passages = stored, "Document indexed");

        Ok(IngestReceipt {
            document_id,
            document_name: document_name.to_string(),
            passages: stored,
        })
    }
}
