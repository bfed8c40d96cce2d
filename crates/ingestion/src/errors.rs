//! Ingestion error types

use docqa_common::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported document format: {name}")]
    UnsupportedFormat { name: String },

    #[error("PDF parse error for {name}: {message}")]
    PdfParseError { name: String, message: String },

    #[error("DOCX parse error for {name}: {message}")]
    DocxParseError { name: String, message: String },

    #[error("{name} is not valid UTF-8 text")]
    EncodingError { name: String },

    #[error("Chunking error: {0}")]
    ChunkingError(String),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::UnsupportedFormat { name } => AppError::UnsupportedFormat { name },
            IngestionError::ChunkingError(message) => AppError::Configuration { message },
            other => AppError::DocumentProcessing {
                message: other.to_string(),
            },
        }
    }
}
