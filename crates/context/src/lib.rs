//! DocQA Context Engine
//!
//! Answers questions about one indexed document:
//! - Query orchestration (retrieve, rerank, prompt, generate, cite, record)
//! - Conversation memory with per-conversation exclusive access
//! - Citation extraction from context provenance
//! - Language model providers behind a common `Generator` trait
//! - Document ingestion into the chunk store

pub mod citations;
pub mod conversation;
pub mod engine;
pub mod generator;
pub mod ids;
pub mod ingest;
pub mod orchestrator;
pub mod prompt;

pub use citations::extract_citations;
pub use conversation::{ConversationGuard, ConversationStore};
pub use engine::QaEngine;
pub use generator::{create_generator, Generator};
pub use ids::{IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use ingest::{DocumentIngestor, IngestReceipt};
pub use orchestrator::{QueryOptions, QueryOrchestrator, QueryRequest};
pub use prompt::{ChatMessage, ChatRole, Prompt};
