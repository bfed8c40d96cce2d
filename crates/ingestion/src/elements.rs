//! Element segmentation, classification, and cleaning
//!
//! A page is cut into blocks on blank lines. Inside a block, lines that open
//! with a bullet or an enumeration marker become their own list items; the
//! remaining lines are joined into one element.

use crate::extract::PageText;
use docqa_common::ElementType;
use regex_lite::Regex;
use std::sync::OnceLock;

/// A structural element before splitting
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub text: String,
    pub element_type: ElementType,
    /// Page the element was found on, if the format has pages
    pub page: Option<u32>,
}

const TITLE_MAX_CHARS: usize = 80;
const TITLE_MAX_WORDS: usize = 12;

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([\u{2022}\u{2023}\u{25CF}\u{25CB}\u{25E6}\u{25AA}\u{2043}\u{2219}\u{00B7}\u{0095}*+-]+)\s+")
            .expect("bullet pattern")
    })
}

fn enumeration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d{1,3}|[a-zA-Z])[.)]\s+").expect("enumeration pattern"))
}

fn dash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{2013}\u{2014}]+|-{2,}").expect("dash pattern"))
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s{0,3}#{1,6}\s+").expect("heading pattern"))
}

/// Segment every page into classified, cleaned elements
///
/// Elements that are empty after cleaning are dropped.
pub fn partition(pages: &[PageText]) -> Vec<Element> {
    let mut elements = Vec::new();

    for page in pages {
        for block in split_blank_lines(&page.text) {
            for (raw, element_type) in segment_block(block) {
                let text = clean(&raw);
                if text.is_empty() {
                    continue;
                }
                elements.push(Element {
                    text,
                    element_type,
                    page: page.page,
                });
            }
        }
    }

    elements
}

/// Split on lines that are empty or whitespace only
fn split_blank_lines(chunk: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in chunk.split_inclusive('\n') {
        if line.trim().is_empty() {
            if offset > start {
                blocks.push(&chunk[start..offset]);
            }
            start = offset + line.len();
        }
        offset += line.len();
    }
    if start < chunk.len() {
        blocks.push(&chunk[start..]);
    }
    blocks
}

fn segment_block(block: &str) -> Vec<(String, ElementType)> {
    fn flush(paragraph: &mut Vec<&str>, out: &mut Vec<(String, ElementType)>) {
        if paragraph.is_empty() {
            return;
        }
        let text = paragraph.join(" ");
        let element_type = classify(&text, paragraph.len());
        out.push((text, element_type));
        paragraph.clear();
    }

    let mut out = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in block.lines().filter(|line| !line.trim().is_empty()) {
        if is_list_item(line) {
            flush(&mut paragraph, &mut out);
            out.push((line.to_string(), ElementType::ListItem));
        } else if heading_re().is_match(line) {
            flush(&mut paragraph, &mut out);
            out.push((heading_re().replace(line, "").into_owned(), ElementType::Title));
        } else {
            paragraph.push(line);
        }
    }
    flush(&mut paragraph, &mut out);

    out
}

fn is_list_item(line: &str) -> bool {
    bullet_re().is_match(line) || enumeration_re().is_match(line)
}

/// Classify a joined paragraph of `line_count` source lines
pub fn classify(text: &str, line_count: usize) -> ElementType {
    let trimmed = text.trim();
    if is_list_item(trimmed) {
        return ElementType::ListItem;
    }
    if !trimmed.chars().any(char::is_alphabetic) {
        return ElementType::Text;
    }

    let ends_like_sentence = trimmed.ends_with(['.', '!', '?', ':', ';', ',']);
    let starts_upper = trimmed.chars().next().is_some_and(|c| c.is_uppercase() || c.is_numeric());
    if line_count == 1
        && !ends_like_sentence
        && starts_upper
        && trimmed.chars().count() <= TITLE_MAX_CHARS
        && trimmed.split_whitespace().count() <= TITLE_MAX_WORDS
    {
        return ElementType::Title;
    }

    ElementType::NarrativeText
}

/// Strip leading bullets, turn dash runs into spaces, collapse whitespace
pub fn clean(text: &str) -> String {
    let without_bullets = bullet_re().replace(text, "");
    let without_dashes = dash_re().replace_all(&without_bullets, " ");
    without_dashes.split_whitespace().collect::<Vec<_>>().join(" ")
}
