//! Passage splitting
//!
//! Splits elements into passages of bounded size with overlap, keeping the
//! element's page and type on every piece.

use crate::elements::Element;
use crate::errors::IngestionError;
use docqa_common::config::IngestionConfig;
use docqa_common::Passage;
use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};
use tracing::debug;

/// Configuration for passage splitting
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum passage size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive passages in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl From<&IngestionConfig> for ChunkingConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        }
    }
}

/// Splitter flavour; Markdown keeps headings and fences together
enum Splitter {
    Text(TextSplitter<text_splitter::Characters>),
    Markdown(MarkdownSplitter<text_splitter::Characters>),
}

impl Splitter {
    fn chunks<'a>(&'a self, text: &'a str) -> Vec<&'a str> {
        match self {
            Splitter::Text(splitter) => splitter.chunks(text).collect(),
            Splitter::Markdown(splitter) => splitter.chunks(text).collect(),
        }
    }
}

/// Builds passages from elements
pub struct Chunker {
    splitter: Splitter,
}

impl Chunker {
    /// Create a chunker; `markdown` selects the markdown-aware splitter
    pub fn new(config: &ChunkingConfig, markdown: bool) -> Result<Self, IngestionError> {
        let chunk_config = ChunkConfig::new(config.chunk_size)
            .with_overlap(config.chunk_overlap)
            .map_err(|e| IngestionError::ChunkingError(e.to_string()))?;

        let splitter = if markdown {
            Splitter::Markdown(MarkdownSplitter::new(chunk_config))
        } else {
            Splitter::Text(TextSplitter::new(chunk_config))
        };

        Ok(Self { splitter })
    }

    /// Split one element whose page was already resolved
    pub fn split(&self, element: &Element, page_number: u32, document_name: &str) -> Vec<Passage> {
        let pieces = self.splitter.chunks(&element.text);

        debug!(
            input_len = element.text.len(),
            chunk_count = pieces.len(),
            page = page_number,
            "Element split"
        );

        pieces
            .into_iter()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| Passage::new(piece, document_name, page_number, element.element_type))
            .collect()
    }
}
