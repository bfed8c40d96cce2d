//! DocQA Search Library
//!
//! Provides the two retrieval-side capabilities of the QA pipeline:
//! - Chunk store: document-scoped passage index with similarity search
//! - Reranking: optional second-pass relevance scoring with fallback

pub mod rerank;
pub mod retrieval;

pub use rerank::{create_reranker, Reranker, Reranking, Selection, SelectionStrategy};
pub use retrieval::{ChunkStore, InMemoryVectorStore, RetrievedPassage};
