//! Citation extraction
//!
//! Citations come from the provenance of the passages handed to the
//! generator, never from the answer text. Every passage used as context is
//! cited, whether or not the answer mentions it.

use docqa_common::{Citation, Passage};
use std::collections::HashSet;

/// De-duplicated (document name, page) pairs in order of first appearance
pub fn extract_citations<'a>(passages: impl IntoIterator<Item = &'a Passage>) -> Vec<Citation> {
    let mut seen = HashSet::new();
    passages
        .into_iter()
        .map(Passage::citation)
        .filter(|citation| seen.insert(citation.clone()))
        .collect()
}
