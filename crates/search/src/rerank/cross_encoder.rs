//! Cross-encoder reranker behind an HTTP endpoint
//!
//! Speaks the text-embeddings-inference `/rerank` protocol: the request
//! carries the query and passage texts, the response is a list of
//! `{index, score}` objects in arbitrary order.

use super::Reranker;
use crate::retrieval::RetrievedPassage;
use async_trait::async_trait;
use docqa_common::config::RerankerConfig;
use docqa_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for a remote cross-encoder (e.g. BAAI/bge-reranker-base)
pub struct HttpReranker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: Vec<&'a str>,
    raw_scores: bool,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    score: f32,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| AppError::Configuration {
            message: "reranker.endpoint is required for the http provider".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/rerank", endpoint.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }
}

/// Lay the returned hits out in candidate order
fn scores_by_index(hits: Vec<RerankHit>, expected: usize) -> Result<Vec<f32>> {
    let mut scores = vec![None; expected];
    for hit in hits {
        let slot = scores.get_mut(hit.index).ok_or_else(|| AppError::Internal {
            message: format!("Reranker returned out-of-range index {}", hit.index),
        })?;
        *slot = Some(hit.score);
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| {
            score.ok_or_else(|| AppError::Internal {
                message: format!("Reranker returned no score for candidate {}", index),
            })
        })
        .collect()
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn score(&self, query: &str, passages: &[RetrievedPassage]) -> Result<Vec<f32>> {
        let request = RerankRequest {
            query,
            texts: passages.iter().map(|p| p.passage.text.as_str()).collect(),
            raw_scores: false,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| AppError::Internal {
            message: format!("Rerank request failed: {}", e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal {
                message: format!("Rerank API error {}: {}", status, body),
            });
        }

        let hits: Vec<RerankHit> = response.json().await.map_err(|e| AppError::Internal {
            message: format!("Failed to parse rerank response: {}", e),
        })?;

        scores_by_index(hits, passages.len())
    }

    fn name(&self) -> &str {
        "cross-encoder-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_are_placed_by_index() {
        let hits: Vec<RerankHit> =
            serde_json::from_str(r#"[{"index":2,"score":0.9},{"index":0,"score":0.4},{"index":1,"score":0.1}]"#)
                .unwrap();
        assert_eq!(scores_by_index(hits, 3).unwrap(), vec![0.4, 0.1, 0.9]);
    }

    #[test]
    fn test_missing_or_out_of_range_index() {
        let hits = vec![RerankHit { index: 0, score: 0.5 }];
        assert!(scores_by_index(hits, 2).is_err());

        let hits = vec![RerankHit { index: 5, score: 0.5 }];
        assert!(scores_by_index(hits, 1).is_err());
    }

    #[test]
    fn test_endpoint_required() {
        assert!(HttpReranker::new(&RerankerConfig::default()).is_err());

        let config = RerankerConfig {
            provider: "http".into(),
            endpoint: Some("http://localhost:8080/".into()),
            ..RerankerConfig::default()
        };
        let reranker = HttpReranker::new(&config).unwrap();
        assert_eq!(reranker.endpoint, "http://localhost:8080/rerank");
    }
}
