//! Query orchestration
//!
//! Runs one question against one document:
//! 1. Lock the conversation (if one was supplied)
//! 2. Retrieve candidate passages scoped to the document
//! 3. Select context, reranking when available
//! 4. Build the prompt from history, context and question
//! 5. Generate under a timeout
//! 6. Derive citations from the context provenance
//! 7. Record the exchange in the conversation store
//!
//! Steps 1 to 6 have no side effects. Step 7 contains no await point, so a
//! dropped or failed query never leaves half an exchange behind.

use crate::citations::extract_citations;
use crate::conversation::{ConversationGuard, ConversationStore};
use crate::generator::Generator;
use crate::ids::IdGenerator;
use crate::prompt::Prompt;
use docqa_common::config::AppConfig;
use docqa_common::errors::{AppError, Result};
use docqa_common::metrics::{record_generation, record_query};
use docqa_common::{Citation, Passage, QueryResult, Turn};
use docqa_search::{ChunkStore, Reranking, SelectionStrategy};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// One question about one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub document_id: String,
    /// Existing conversation to continue; `None` starts a new one
    pub conversation_id: Option<String>,
    pub require_citations: bool,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, document_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            document_id: document_id.into(),
            conversation_id: None,
            require_citations: true,
        }
    }

    pub fn in_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_citations(mut self, require_citations: bool) -> Self {
        self.require_citations = require_citations;
        self
    }

    /// Supplied conversation id; an empty string counts as none
    fn conversation(&self) -> Option<&str> {
        self.conversation_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Pipeline limits
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Candidates fetched from the chunk store
    pub top_k: usize,
    /// Passages kept as context
    pub top_n: usize,
    /// Upper bound on one generator call
    pub generation_timeout: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            top_n: 3,
            generation_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&AppConfig> for QueryOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            top_k: config.retrieval.top_k,
            top_n: config.retrieval.top_n,
            generation_timeout: config.generation_timeout(),
        }
    }
}

/// What a successful run produced, before the exchange is recorded
struct Answered {
    answer: String,
    citations: Vec<Citation>,
    candidates: usize,
    strategy: SelectionStrategy,
}

/// Answers questions against indexed documents
pub struct QueryOrchestrator {
    store: Arc<dyn ChunkStore>,
    reranking: Reranking,
    generator: Arc<dyn Generator>,
    conversations: Arc<ConversationStore>,
    ids: Arc<dyn IdGenerator>,
    options: QueryOptions,
}

impl QueryOrchestrator {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        reranking: Reranking,
        generator: Arc<dyn Generator>,
        conversations: Arc<ConversationStore>,
        ids: Arc<dyn IdGenerator>,
        options: QueryOptions,
    ) -> Self {
        Self {
            store,
            reranking,
            generator,
            conversations,
            ids,
            options: QueryOptions {
                top_n: options.top_n.min(options.top_k),
                ..options
            },
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    /// Answer a question, returning the answer, its citations, and the
    /// conversation it was recorded under
    #[instrument(
        skip(self, request),
        fields(document_id = %request.document_id, conversation_id = ?request.conversation())
    )]
    pub async fn answer(&self, request: QueryRequest) -> Result<QueryResult> {
        let start = Instant::now();

        // Holding the guard for the whole run serialises queries per conversation
        let guard = match request.conversation() {
            Some(id) => Some(self.conversations.lock(id).await?),
            None => None,
        };

        let ran = self.run(&request, guard.as_ref()).await;
        let outcome = ran.and_then(|answered| self.record(&request, guard, answered));

        let elapsed = start.elapsed();
        match &outcome {
            Ok((result, candidates, strategy)) => {
                info!(
                    document_id = %request.document_id,
                    conversation_id = %result.conversation_id,
                    candidates,
                    %strategy,
                    citations = result.citations.len(),
                    latency_ms = elapsed.as_millis() as u64,
                    "Query answered"
                );
                record_query(elapsed.as_secs_f64(), "success", result.citations.len());
            }
            Err(e) => {
                warn!(
                    document_id = %request.document_id,
                    error = %e,
                    latency_ms = elapsed.as_millis() as u64,
                    "Query failed"
                );
                record_query(elapsed.as_secs_f64(), &format!("{:?}", e.code()), 0);
            }
        }

        outcome.map(|(result, _, _)| result)
    }

    /// Steps 2 to 6; reads only
    async fn run(
        &self,
        request: &QueryRequest,
        guard: Option<&ConversationGuard>,
    ) -> Result<Answered> {
        let candidates = self
            .store
            .retrieve(&request.document_id, &request.query, self.options.top_k)
            .await
            .map_err(|e| e.into_query_failure("Failed to retrieve passages"))?;
        let candidate_count = candidates.len();
        debug!(candidates = candidate_count, "Retrieved candidates");

        let selection = self
            .reranking
            .select(&request.query, candidates, self.options.top_n)
            .await;
        let context: Vec<Passage> = selection.passages.into_iter().map(|hit| hit.passage).collect();

        let history = guard.map(|g| g.history().to_vec()).unwrap_or_default();
        let prompt = Prompt::new(request.query.as_str(), history, context);

        let answer = self.generate(&prompt).await?;

        let citations = if request.require_citations {
            extract_citations(&prompt.context)
        } else {
            Vec::new()
        };

        Ok(Answered {
            answer,
            citations,
            candidates: candidate_count,
            strategy: selection.strategy,
        })
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let model = self.generator.model_name();
        let start = Instant::now();

        let result = match tokio::time::timeout(
            self.options.generation_timeout,
            self.generator.generate(prompt),
        )
        .await
        {
            Ok(result) => result.map_err(|e| e.into_query_failure("Failed to generate answer")),
            Err(_) => Err(AppError::QueryFailed {
                message: format!(
                    "Generation timed out after {}s",
                    self.options.generation_timeout.as_secs_f64()
                ),
            }),
        };

        record_generation(start.elapsed().as_secs_f64(), model, result.is_ok());
        result
    }

    /// Step 7: append the exchange without yielding
    fn record(
        &self,
        request: &QueryRequest,
        guard: Option<ConversationGuard>,
        answered: Answered,
    ) -> Result<(QueryResult, usize, SelectionStrategy)> {
        let user = Turn::user(request.query.as_str());
        let assistant = Turn::assistant(answered.answer.as_str());

        let conversation_id = match guard {
            Some(mut guard) => {
                guard.append_exchange(user, assistant);
                guard.id().to_string()
            }
            None => {
                let id = self.ids.conversation_id();
                self.conversations
                    .start(&id, user, assistant)
                    .map_err(|e| e.into_query_failure("Failed to start conversation"))?;
                id
            }
        };

        Ok((
            QueryResult {
                answer: answered.answer,
                citations: answered.citations,
                conversation_id,
            },
            answered.candidates,
            answered.strategy,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ExtractiveGenerator;
    use crate::ids::SequentialIdGenerator;
    use async_trait::async_trait;
    use docqa_common::ElementType;
    use docqa_search::RetrievedPassage;

    /// Returns the same hits for every known document
    struct FixedStore {
        document_id: &'static str,
        hits: Vec<RetrievedPassage>,
    }

    #[async_trait]
    impl ChunkStore for FixedStore {
        async fn store(&self, _document_id: &str, passages: Vec<Passage>) -> Result<usize> {
            Ok(passages.len())
        }

        async fn retrieve(
            &self,
            document_id: &str,
            _query: &str,
            k: usize,
        ) -> Result<Vec<RetrievedPassage>> {
            if document_id != self.document_id {
                return Err(AppError::DocumentNotFound {
                    id: document_id.to_string(),
                });
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        }

        async fn contains(&self, document_id: &str) -> bool {
            document_id == self.document_id
        }

        fn document_count(&self) -> usize {
            1
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl ChunkStore for BrokenStore {
        async fn store(&self, _document_id: &str, _passages: Vec<Passage>) -> Result<usize> {
            Ok(0)
        }

        async fn retrieve(&self, _: &str, _: &str, _: usize) -> Result<Vec<RetrievedPassage>> {
            Err(AppError::EmbeddingFailure {
                message: "index unavailable".into(),
            })
        }

        async fn contains(&self, _document_id: &str) -> bool {
            true
        }

        fn document_count(&self) -> usize {
            1
        }
    }

    fn hit(text: &str, page: u32) -> RetrievedPassage {
        RetrievedPassage {
            document_id: "doc_1".into(),
            passage: Passage::new(text, "policy.pdf", page, ElementType::NarrativeText),
            score: 1.0,
        }
    }

    fn orchestrator(store: Arc<dyn ChunkStore>) -> QueryOrchestrator {
        QueryOrchestrator::new(
            store,
            Reranking::Disabled,
            Arc::new(ExtractiveGenerator),
            Arc::new(ConversationStore::new()),
            Arc::new(SequentialIdGenerator::new()),
            QueryOptions::default(),
        )
    }

    fn policy_store() -> Arc<dyn ChunkStore> {
        Arc::new(FixedStore {
            document_id: "doc_1",
            hits: vec![hit("Leave requires 30 days notice.", 1)],
        })
    }

    #[tokio::test]
    async fn test_new_conversation_is_recorded() {
        let orchestrator = orchestrator(policy_store());
        let result = orchestrator
            .answer(QueryRequest::new("How much notice is required?", "doc_1"))
            .await
            .unwrap();

        assert_eq!(result.conversation_id, "conv_1");
        assert_eq!(result.citations, vec![Citation { page: 1, document_name: "policy.pdf".into() }]);
        assert!(result.answer.contains("30 days"));

        let turns = orchestrator.conversations().transcript("conv_1").unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "How much notice is required?");
        assert_eq!(turns[1].content, result.answer);
    }

    #[tokio::test]
    async fn test_citations_skipped_when_not_required() {
        let orchestrator = orchestrator(policy_store());
        let result = orchestrator
            .answer(QueryRequest::new("notice?", "doc_1").with_citations(false))
            .await
            .unwrap();
        assert!(result.citations.is_empty());
        // The exchange is recorded regardless
        assert_eq!(orchestrator.conversations().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_document_passes_through() {
        let orchestrator = orchestrator(policy_store());
        let err = orchestrator
            .answer(QueryRequest::new("notice?", "doc_9"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DocumentNotFound { id } if id == "doc_9"));
        assert!(orchestrator.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_conversation_checked_before_retrieval() {
        // The broken store would fail with QueryFailed if it were reached
        let orchestrator = orchestrator(Arc::new(BrokenStore));
        let err = orchestrator
            .answer(QueryRequest::new("notice?", "doc_1").in_conversation("conv_typo"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidConversation { id } if id == "conv_typo"));
    }

    #[tokio::test]
    async fn test_retrieval_errors_become_query_failures() {
        let orchestrator = orchestrator(Arc::new(BrokenStore));
        let err = orchestrator
            .answer(QueryRequest::new("notice?", "doc_1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::QueryFailed { ref message } if message.contains("index unavailable")));
        assert!(orchestrator.conversations().is_empty());
    }

    #[tokio::test]
    async fn test_empty_conversation_id_starts_new_conversation() {
        let orchestrator = orchestrator(policy_store());
        let result = orchestrator
            .answer(QueryRequest::new("notice?", "doc_1").in_conversation(""))
            .await
            .unwrap();
        assert_eq!(result.conversation_id, "conv_1");
    }

    #[tokio::test]
    async fn test_empty_retrieval_has_no_citations() {
        let orchestrator = orchestrator(Arc::new(FixedStore {
            document_id: "doc_1",
            hits: vec![],
        }));
        let result = orchestrator
            .answer(QueryRequest::new("zebra", "doc_1"))
            .await
            .unwrap();
        assert!(result.citations.is_empty());
        assert_eq!(result.answer, crate::generator::NO_INFORMATION_ANSWER);
    }

    #[test]
    fn test_options_clamp_top_n() {
        let orchestrator = QueryOrchestrator::new(
            policy_store(),
            Reranking::Disabled,
            Arc::new(ExtractiveGenerator),
            Arc::new(ConversationStore::new()),
            Arc::new(SequentialIdGenerator::new()),
            QueryOptions {
                top_k: 2,
                top_n: 10,
                ..QueryOptions::default()
            },
        );
        assert_eq!(orchestrator.options().top_n, 2);
    }

    #[test]
    fn test_options_from_config() {
        let options = QueryOptions::from(&AppConfig::default());
        assert_eq!(options.top_k, 5);
        assert_eq!(options.top_n, 3);
        assert_eq!(options.generation_timeout, Duration::from_secs(60));
    }
}
