//! Ingestion processor
//!
//! Core logic for turning an uploaded document into passages:
//! format detection, extraction, segmentation, cleaning, and splitting.

use crate::chunker::{Chunker, ChunkingConfig};
use crate::elements::partition;
use crate::errors::IngestionError;
use crate::extract::extract_pages;
use crate::format::DocumentFormat;
use docqa_common::config::IngestionConfig;
use docqa_common::Passage;
use tracing::{debug, info, instrument};

/// Passages produced from one document
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub format: DocumentFormat,
    pub passages: Vec<Passage>,
}

/// Ingestion processor
pub struct DocumentProcessor {
    text_chunker: Chunker,
    markdown_chunker: Chunker,
}

impl DocumentProcessor {
    pub fn new(chunking_config: &ChunkingConfig) -> Result<Self, IngestionError> {
        Ok(Self {
            text_chunker: Chunker::new(chunking_config, false)?,
            markdown_chunker: Chunker::new(chunking_config, true)?,
        })
    }

    pub fn from_config(config: &IngestionConfig) -> Result<Self, IngestionError> {
        Self::new(&ChunkingConfig::from(config))
    }

    /// Process raw bytes into ordered passages
    ///
    /// A document without extractable text yields an empty list; deciding
    /// that this is an error belongs to the caller.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn process(
        &self,
        document_name: &str,
        bytes: &[u8],
    ) -> Result<ProcessedDocument, IngestionError> {
        let format = DocumentFormat::detect(document_name, bytes)?;
        debug!(%format, "Detected document format");

        let pages = extract_pages(format, document_name, bytes)?;
        let elements = partition(&pages);

        let chunker = match format {
            DocumentFormat::Markdown => &self.markdown_chunker,
            _ => &self.text_chunker,
        };

        // Elements without a page inherit the last page seen, else page 1
        let mut current_page = None;
        let mut passages = Vec::new();
        for element in &elements {
            if element.page.is_some() {
                current_page = element.page;
            }
            passages.extend(chunker.split(element, current_page.unwrap_or(1), document_name));
        }

        info!(
            %format,
            pages = pages.len(),
            elements = elements.len(),
            passages = passages.len(),
            "Document processed"
        );

        Ok(ProcessedDocument { format, passages })
    }
}
