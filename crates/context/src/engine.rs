//! Service wiring
//!
//! Builds the shared pipeline components from configuration. The chunk
//! store, conversation store and id generator are shared between the
//! ingestor and the orchestrator.

use crate::conversation::ConversationStore;
use crate::generator::{create_generator, Generator};
use crate::ids::{IdGenerator, RandomIdGenerator};
use crate::ingest::DocumentIngestor;
use crate::orchestrator::{QueryOptions, QueryOrchestrator};
use docqa_common::embeddings::create_embedder;
use docqa_common::errors::Result;
use docqa_common::AppConfig;
use docqa_ingestion::DocumentProcessor;
use docqa_search::{create_reranker, ChunkStore, InMemoryVectorStore, Reranking};
use std::sync::Arc;
use tracing::info;

/// Everything needed to ingest documents and answer questions about them
pub struct QaEngine {
    orchestrator: Arc<QueryOrchestrator>,
    ingestor: Arc<DocumentIngestor>,
    conversations: Arc<ConversationStore>,
    store: Arc<dyn ChunkStore>,
}

impl QaEngine {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let embedder = create_embedder(&config.embedding)?;
        let store: Arc<dyn ChunkStore> = Arc::new(InMemoryVectorStore::new(
            embedder.clone(),
            config.embedding.batch_size,
            config.retrieval.min_score,
        ));
        let processor = DocumentProcessor::from_config(&config.ingestion)?;
        let reranking = create_reranker(&config.reranker)?;
        let generator = create_generator(&config.generation)?;

        info!(
            embedder = embedder.model_name(),
            reranker = reranking.name(),
            generator = generator.model_name(),
            top_k = config.retrieval.top_k,
            top_n = config.retrieval.top_n,
            "QA engine configured"
        );

        Ok(Self::new(
            store,
            Arc::new(processor),
            reranking,
            generator,
            Arc::new(RandomIdGenerator),
            QueryOptions::from(config),
        ))
    }

    pub fn new(
        store: Arc<dyn ChunkStore>,
        processor: Arc<DocumentProcessor>,
        reranking: Reranking,
        generator: Arc<dyn Generator>,
        ids: Arc<dyn IdGenerator>,
        options: QueryOptions,
    ) -> Self {
        let conversations = Arc::new(ConversationStore::new());
        let ingestor = DocumentIngestor::new(processor, store.clone(), ids.clone());
        let orchestrator = QueryOrchestrator::new(
            store.clone(),
            reranking,
            generator,
            conversations.clone(),
            ids,
            options,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            ingestor: Arc::new(ingestor),
            conversations,
            store,
        }
    }

    pub fn orchestrator(&self) -> &Arc<QueryOrchestrator> {
        &self.orchestrator
    }

    pub fn ingestor(&self) -> &Arc<DocumentIngestor> {
        &self.ingestor
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    /// Number of indexed documents
    pub fn document_count(&self) -> usize {
        self.store.document_count()
    }

    /// Number of live conversations
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}
