//! DocQA Common Library
//!
//! Shared code for all DocQA crates including:
//! - Passage, citation, and conversation data model
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod text;

// Re-export commonly used types
pub use config::AppConfig;
pub use embeddings::Embedder;
pub use errors::{AppError, ErrorCode, Result};
pub use models::{Citation, ElementType, Passage, QueryResult, Role, Turn};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default embedding model for the hosted provider
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default embedding dimension (matches all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
