//! Per-page text extraction
//!
//! PDF goes through lopdf page by page, DOCX is read straight out of the
//! OOXML container with quick-xml, plain text and Markdown are decoded as
//! UTF-8. Blocks within a page are separated by blank lines.

use crate::errors::IngestionError;
use crate::format::DocumentFormat;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

/// Maximum decompressed bytes read from a ZIP entry
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Text of one page; `page` is `None` for formats without pages
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub page: Option<u32>,
    pub text: String,
}

/// Extract page texts from raw document bytes
pub fn extract_pages(
    format: DocumentFormat,
    document_name: &str,
    bytes: &[u8],
) -> Result<Vec<PageText>, IngestionError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(document_name, bytes),
        DocumentFormat::Docx => extract_docx(document_name, bytes),
        DocumentFormat::PlainText | DocumentFormat::Markdown => {
            let text = decode_utf8(document_name, bytes)?;
            Ok(vec![PageText { page: None, text }])
        }
    }
}

fn decode_utf8(document_name: &str, bytes: &[u8]) -> Result<String, IngestionError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| IngestionError::EncodingError {
        name: document_name.to_string(),
    })
}

fn extract_pdf(document_name: &str, bytes: &[u8]) -> Result<Vec<PageText>, IngestionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| IngestionError::PdfParseError {
        name: document_name.to_string(),
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut result = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => result.push(PageText {
                page: Some(*page_number),
                text,
            }),
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    Ok(result)
}

fn extract_docx(document_name: &str, bytes: &[u8]) -> Result<Vec<PageText>, IngestionError> {
    let docx_error = |message: String| IngestionError::DocxParseError {
        name: document_name.to_string(),
        message,
    };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| docx_error(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| docx_error("word/document.xml not found".to_string()))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| docx_error(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(docx_error("word/document.xml exceeds size limit".to_string()));
    }

    parse_document_xml(&xml).map_err(docx_error)
}

/// Walk `w:body`, splitting pages on `<w:br w:type="page"/>`
fn parse_document_xml(xml: &[u8]) -> Result<Vec<PageText>, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut pages = Vec::new();
    let mut page = 1u32;
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"br" if is_page_break(&e) => {
                    pages.push(PageText {
                        page: Some(page),
                        text: std::mem::take(&mut current),
                    });
                    page += 1;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"br" if is_page_break(&e) => {
                    pages.push(PageText {
                        page: Some(page),
                        text: std::mem::take(&mut current),
                    });
                    page += 1;
                }
                b"br" | b"cr" => current.push('\n'),
                b"tab" => current.push('\t'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => current.push_str("\n\n"),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }

    pages.push(PageText {
        page: Some(page),
        text: current,
    });
    Ok(pages)
}

fn is_page_break(element: &quick_xml::events::BytesStart<'_>) -> bool {
    element
        .attributes()
        .flatten()
        .any(|attr| attr.key.local_name().as_ref() == b"type" && attr.value.as_ref() == b"page")
}
