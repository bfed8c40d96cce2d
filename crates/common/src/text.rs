//! Tokenisation shared by the hashing embedder, the lexical reranker, and
//! the extractive generator

/// Lowercase alphanumeric tokens in order of appearance
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}
