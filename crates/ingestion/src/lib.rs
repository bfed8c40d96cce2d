//! DocQA Ingestion Library
//!
//! Turns an uploaded document into ordered passages:
//! - Format detection (PDF, DOCX, plain text, Markdown)
//! - Page-aware text extraction
//! - Element segmentation, classification, and cleaning
//! - Size-bounded splitting with overlap

pub mod chunker;
pub mod elements;
pub mod errors;
pub mod extract;
pub mod format;
pub mod processor;

pub use chunker::ChunkingConfig;
pub use errors::IngestionError;
pub use format::DocumentFormat;
pub use processor::{DocumentProcessor, ProcessedDocument};
