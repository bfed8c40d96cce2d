//! In-process BM25 reranker
//!
//! Scores the candidate set against the query with Okapi BM25, treating the
//! candidates themselves as the corpus.

use super::Reranker;
use crate::retrieval::RetrievedPassage;
use async_trait::async_trait;
use docqa_common::errors::Result;
use docqa_common::text::tokenize;
use std::collections::{HashMap, HashSet};

/// BM25 scorer over the candidate set
#[derive(Debug, Clone)]
pub struct Bm25Reranker {
    /// Term frequency saturation
    pub k1: f32,
    /// Length normalisation
    pub b: f32,
}

impl Default for Bm25Reranker {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

impl Bm25Reranker {
    /// Score `documents` (already tokenised) for `query_terms`
    fn bm25(&self, query_terms: &[String], documents: &[Vec<String>]) -> Vec<f32> {
        let n = documents.len() as f32;
        let avg_len = documents.iter().map(Vec::len).sum::<usize>() as f32 / n.max(1.0);

        let unique_terms: HashSet<&str> = query_terms.iter().map(String::as_str).collect();
        let idf: HashMap<&str, f32> = unique_terms
            .iter()
            .map(|term| {
                let df = documents
                    .iter()
                    .filter(|doc| doc.iter().any(|t| t == term))
                    .count() as f32;
                (*term, ((n - df + 0.5) / (df + 0.5) + 1.0).ln())
            })
            .collect();

        documents
            .iter()
            .map(|doc| {
                let len = doc.len() as f32;
                let norm = if avg_len > 0.0 { len / avg_len } else { 0.0 };
                unique_terms
                    .iter()
                    .map(|term| {
                        let tf = doc.iter().filter(|t| t == term).count() as f32;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        idf[term] * tf * (self.k1 + 1.0)
                            / (tf + self.k1 * (1.0 - self.b + self.b * norm))
                    })
                    .sum()
            })
            .collect()
    }
}

#[async_trait]
impl Reranker for Bm25Reranker {
    async fn score(&self, query: &str, passages: &[RetrievedPassage]) -> Result<Vec<f32>> {
        let query_terms = tokenize(query);
        let documents: Vec<Vec<String>> = passages
            .iter()
            .map(|p| tokenize(&p.passage.text))
            .collect();
        Ok(self.bm25(&query_terms, &documents))
    }

    fn name(&self) -> &str {
        "lexical-bm25"
    }
}
