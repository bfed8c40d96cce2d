//! End-to-end behaviour of ingestion, retrieval, generation and
//! conversation memory, using in-process components only.

use async_trait::async_trait;
use docqa_common::embeddings::HashingEmbedder;
use docqa_common::{AppError, Citation, ElementType, Passage, Result, Role};
use docqa_context::generator::ExtractiveGenerator;
use docqa_context::{
    ConversationStore, DocumentIngestor, Generator, Prompt, QueryOptions, QueryOrchestrator,
    QueryRequest, SequentialIdGenerator,
};
use docqa_ingestion::{ChunkingConfig, DocumentProcessor};
use docqa_search::rerank::Bm25Reranker;
use docqa_search::{ChunkStore, InMemoryVectorStore, Reranker, Reranking, RetrievedPassage};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

// Test doubles

/// Delegates to the extractive generator and keeps every prompt it saw
struct RecordingGenerator {
    prompts: Mutex<Vec<Prompt>>,
}

impl RecordingGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.clone());
        ExtractiveGenerator.generate(prompt).await
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Err(AppError::Internal {
            message: "model overloaded".into(),
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

struct SlowGenerator;

#[async_trait]
impl Generator for SlowGenerator {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok("too late".into())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

/// Answers with the question and how much history it was given
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(format!("answer to {} after {} turns", prompt.question, prompt.history.len()))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn score(&self, _query: &str, _passages: &[RetrievedPassage]) -> Result<Vec<f32>> {
        Err(AppError::Internal {
            message: "reranker offline".into(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Counts index writes on top of the in-memory store
struct RecordingStore {
    inner: InMemoryVectorStore,
    store_calls: AtomicUsize,
}

#[async_trait]
impl ChunkStore for RecordingStore {
    async fn store(&self, document_id: &str, passages: Vec<Passage>) -> Result<usize> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.store(document_id, passages).await
    }

    async fn retrieve(&self, document_id: &str, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        self.inner.retrieve(document_id, query, k).await
    }

    async fn contains(&self, document_id: &str) -> bool {
        self.inner.contains(document_id).await
    }

    fn document_count(&self) -> usize {
        self.inner.document_count()
    }
}

// Harness

struct Harness {
    orchestrator: QueryOrchestrator,
    ingestor: DocumentIngestor,
    conversations: Arc<ConversationStore>,
    store: Arc<RecordingStore>,
}

fn harness(min_score: f32, reranking: Reranking, generator: Arc<dyn Generator>) -> Harness {
    harness_with(min_score, reranking, generator, QueryOptions::default())
}

fn harness_with(
    min_score: f32,
    reranking: Reranking,
    generator: Arc<dyn Generator>,
    options: QueryOptions,
) -> Harness {
    let store = Arc::new(RecordingStore {
        inner: InMemoryVectorStore::new(Arc::new(HashingEmbedder::new(384)), 16, min_score),
        store_calls: AtomicUsize::new(0),
    });
    let ids = Arc::new(SequentialIdGenerator::new());
    let conversations = Arc::new(ConversationStore::new());
    let processor = Arc::new(DocumentProcessor::new(&ChunkingConfig::default()).unwrap());

    Harness {
        orchestrator: QueryOrchestrator::new(
            store.clone(),
            reranking,
            generator,
            conversations.clone(),
            ids.clone(),
            options,
        ),
        ingestor: DocumentIngestor::new(processor, store.clone(), ids),
        conversations,
        store,
    }
}

fn lexical() -> Reranking {
    Reranking::Enabled(Arc::new(Bm25Reranker::default()))
}

fn policy_passages(name: &str) -> Vec<Passage> {
    vec![
        Passage::new("Leave requires 30 days notice.", name, 1, ElementType::NarrativeText),
        Passage::new("Exceptions apply for medical leave.", name, 2, ElementType::NarrativeText),
    ]
}

fn citation(name: &str, page: u32) -> Citation {
    Citation {
        page,
        document_name: name.to_string(),
    }
}

fn docx_bytes(body: &str) -> Vec<u8> {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

// Scenarios

#[tokio::test]
async fn test_policy_conversation() {
    let generator = RecordingGenerator::new();
    let h = harness(0.1, lexical(), generator.clone());

    let receipt = assert_ok!(h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await);
    assert_eq!(receipt.document_id, "doc_1");
    assert_eq!(receipt.passages, 2);

    let first = assert_ok!(
        h.orchestrator
            .answer(QueryRequest::new("How much notice is required?", "doc_1"))
            .await
    );
    assert!(first.answer.contains("30 days"));
    assert_eq!(first.citations, vec![citation("policy.pdf", 1)]);
    assert_eq!(first.conversation_id, "conv_1");
    assert_eq!(h.conversations.transcript("conv_1").unwrap().len(), 2);

    let second = assert_ok!(
        h.orchestrator
            .answer(QueryRequest::new("What about medical leave?", "doc_1").in_conversation("conv_1"))
            .await
    );
    assert_eq!(second.conversation_id, "conv_1");
    assert!(second.citations.contains(&citation("policy.pdf", 2)));
    assert!(second.answer.contains("medical leave"));

    // The second prompt carried the first exchange verbatim
    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].history.is_empty());
    let history = &prompts[1].history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].content, "How much notice is required?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, first.answer);

    assert_eq!(h.conversations.transcript("conv_1").unwrap().len(), 4);
}

#[tokio::test]
async fn test_document_isolation() {
    let h = harness(0.0, lexical(), Arc::new(ExtractiveGenerator));
    h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();
    h.ingestor.index_passages("handbook.pdf", policy_passages("handbook.pdf")).await.unwrap();

    for (document_id, name) in [("doc_1", "policy.pdf"), ("doc_2", "handbook.pdf")] {
        let result = h
            .orchestrator
            .answer(QueryRequest::new("What about medical leave?", document_id))
            .await
            .unwrap();
        assert!(!result.citations.is_empty());
        assert!(result.citations.iter().all(|c| c.document_name == name));
        assert!(result.answer.contains(name));
    }
}

#[tokio::test]
async fn test_unknown_conversation_is_rejected() {
    let h = harness(0.0, lexical(), Arc::new(ExtractiveGenerator));
    h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();

    let err = assert_err!(
        h.orchestrator
            .answer(QueryRequest::new("notice?", "doc_1").in_conversation("conv_nope"))
            .await
    );
    assert!(matches!(err, AppError::InvalidConversation { ref id } if id == "conv_nope"));
    assert!(h.conversations.is_empty());
    assert!(!h.conversations.contains("conv_nope"));
}

#[tokio::test]
async fn test_unknown_document() {
    let h = harness(0.0, lexical(), Arc::new(ExtractiveGenerator));
    let err = h
        .orchestrator
        .answer(QueryRequest::new("notice?", "doc_404"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn test_transcript_grows_by_two_per_query() {
    let h = harness(0.0, lexical(), Arc::new(ExtractiveGenerator));
    h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();

    let first = h
        .orchestrator
        .answer(QueryRequest::new("question 0", "doc_1"))
        .await
        .unwrap();
    let id = first.conversation_id;

    for i in 1..5 {
        let result = h
            .orchestrator
            .answer(QueryRequest::new(format!("question {}", i), "doc_1").in_conversation(id.as_str()))
            .await
            .unwrap();
        assert_eq!(result.conversation_id, id);
    }

    let turns = h.conversations.transcript(&id).unwrap();
    assert_eq!(turns.len(), 10);
    for (i, pair) in turns.chunks(2).enumerate() {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[0].content, format!("question {}", i));
        assert_eq!(pair[1].role, Role::Assistant);
    }
    assert!(turns.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn test_reranker_failure_matches_disabled_reranker() {
    let passages: Vec<Passage> = (1..=5)
        .map(|page| {
            Passage::new(
                format!("Section {} covers leave policy detail {}", page, page),
                "policy.pdf",
                page,
                ElementType::NarrativeText,
            )
        })
        .collect();

    let mut contexts = Vec::new();
    for reranking in [Reranking::Enabled(Arc::new(FailingReranker)), Reranking::Disabled] {
        let generator = RecordingGenerator::new();
        let h = harness(0.0, reranking, generator.clone());
        h.ingestor.index_passages("policy.pdf", passages.clone()).await.unwrap();

        h.orchestrator
            .answer(QueryRequest::new("leave policy", "doc_1"))
            .await
            .unwrap();
        let prompts = generator.prompts();
        assert_eq!(prompts[0].context.len(), 3);
        contexts.push(prompts[0].context.clone());
    }

    assert_eq!(contexts[0], contexts[1]);
}

#[tokio::test]
async fn test_citations_independent_of_answer_text() {
    struct Unhelpful;

    #[async_trait]
    impl Generator for Unhelpful {
        async fn generate(&self, _prompt: &Prompt) -> Result<String> {
            Ok("No idea, and no sources.".into())
        }

        fn model_name(&self) -> &str {
            "unhelpful"
        }
    }

    let a = harness(0.0, Reranking::Disabled, Arc::new(ExtractiveGenerator));
    let b = harness(0.0, Reranking::Disabled, Arc::new(Unhelpful));
    for h in [&a, &b] {
        h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();
    }

    let request = QueryRequest::new("What about medical leave?", "doc_1");
    let from_a = a.orchestrator.answer(request.clone()).await.unwrap();
    let from_b = b.orchestrator.answer(request).await.unwrap();

    assert_ne!(from_a.answer, from_b.answer);
    assert_eq!(from_a.citations, from_b.citations);
    assert_eq!(from_a.citations, vec![citation("policy.pdf", 2), citation("policy.pdf", 1)]);
}

#[tokio::test]
async fn test_empty_document_never_reaches_the_index() {
    let h = harness(0.0, lexical(), Arc::new(ExtractiveGenerator));

    let err = h.ingestor.ingest("blank.txt", b"\n\n   \n".to_vec()).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyDocument));

    let err = h.ingestor.index_passages("empty.pdf", Vec::new()).await.unwrap_err();
    assert!(matches!(err, AppError::EmptyDocument));

    assert_eq!(h.store.store_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.store.document_count(), 0);
}

#[tokio::test]
async fn test_generator_failure_leaves_no_transcript() {
    let h = harness(0.0, lexical(), Arc::new(FailingGenerator));
    h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();

    let err = h
        .orchestrator
        .answer(QueryRequest::new("notice?", "doc_1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QueryFailed { ref message } if message.contains("model overloaded")));
    assert!(h.conversations.is_empty());
}

#[tokio::test]
async fn test_generation_timeout_is_query_failure() {
    let options = QueryOptions {
        generation_timeout: Duration::from_millis(50),
        ..QueryOptions::default()
    };
    let h = harness_with(0.0, lexical(), Arc::new(SlowGenerator), options);
    h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();
    h.conversations
        .start("conv_existing", docqa_common::Turn::user("hi"), docqa_common::Turn::assistant("hello"))
        .unwrap();

    let err = h
        .orchestrator
        .answer(QueryRequest::new("notice?", "doc_1").in_conversation("conv_existing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::QueryFailed { ref message } if message.contains("timed out")));

    // The existing transcript is untouched and unlocked
    let turns = h.conversations.transcript("conv_existing").unwrap();
    assert_eq!(turns.len(), 2);
}

#[tokio::test]
async fn test_concurrent_queries_on_one_conversation_are_serialised() {
    let h = harness(0.0, lexical(), Arc::new(EchoGenerator));
    h.ingestor.index_passages("policy.pdf", policy_passages("policy.pdf")).await.unwrap();

    let first = h
        .orchestrator
        .answer(QueryRequest::new("q0", "doc_1"))
        .await
        .unwrap();
    let id = first.conversation_id.clone();

    let queries = (1..=8).map(|i| {
        h.orchestrator
            .answer(QueryRequest::new(format!("q{}", i), "doc_1").in_conversation(id.as_str()))
    });
    for result in futures::future::join_all(queries).await {
        assert_ok!(result);
    }

    let turns = h.conversations.transcript(&id).unwrap();
    assert_eq!(turns.len(), 18);

    // Each answer saw exactly the turns recorded before its question
    for (position, pair) in turns.chunks(2).enumerate() {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(
            pair[1].content,
            format!("answer to {} after {} turns", pair[0].content, position * 2)
        );
    }
}

#[tokio::test]
async fn test_docx_pages_flow_into_citations() {
    let h = harness(0.0, lexical(), Arc::new(ExtractiveGenerator));
    let bytes = docx_bytes(
        "<w:p><w:r><w:t>Remote work requires manager approval.</w:t></w:r></w:p>\
         <w:p><w:r><w:br w:type=\"page\"/></w:r></w:p>\
         <w:p><w:r><w:t>Travel expenses are reimbursed monthly.</w:t></w:r></w:p>",
    );

    let receipt = h.ingestor.ingest("handbook.docx", bytes).await.unwrap();
    assert_eq!(receipt.passages, 2);

    let result = h
        .orchestrator
        .answer(QueryRequest::new("When are travel expenses reimbursed?", &receipt.document_id))
        .await
        .unwrap();

    assert_eq!(result.citations[0], citation("handbook.docx", 2));
    assert!(result.answer.contains("Travel expenses are reimbursed monthly."));
    assert!(result.answer.contains("Page: 2"));
}
