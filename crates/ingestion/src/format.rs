//! Document format detection

use crate::errors::IngestionError;
use serde::Serialize;
use std::fmt;
use std::path::Path;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
    Markdown,
}

impl DocumentFormat {
    /// Detect by file extension, falling back to magic bytes
    pub fn detect(document_name: &str, bytes: &[u8]) -> Result<Self, IngestionError> {
        let extension = Path::new(document_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => return Ok(DocumentFormat::Pdf),
            Some("docx") => return Ok(DocumentFormat::Docx),
            Some("txt" | "text" | "log" | "csv") => return Ok(DocumentFormat::PlainText),
            Some("md" | "markdown") => return Ok(DocumentFormat::Markdown),
            _ => {}
        }

        if bytes.starts_with(PDF_MAGIC) {
            Ok(DocumentFormat::Pdf)
        } else if bytes.starts_with(ZIP_MAGIC) {
            // Only a Word container is accepted; other OOXML fails in extraction
            Ok(DocumentFormat::Docx)
        } else {
            Err(IngestionError::UnsupportedFormat {
                name: document_name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::PlainText => "text",
            DocumentFormat::Markdown => "markdown",
        }
    }

    /// Whether the source format has a page concept
    pub fn is_paged(&self) -> bool {
        matches!(self, DocumentFormat::Pdf | DocumentFormat::Docx)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
