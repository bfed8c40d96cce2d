//! Language model providers
//!
//! Provides a unified interface for answer generation:
//! - OpenAI-compatible chat completions
//! - Google Gemini `generateContent`
//! - Extractive: offline and deterministic, quotes the best-matching passage
//!
//! Calls are never retried; errors surface as `QueryFailed`.

mod extractive;
mod gemini;
mod openai;

pub use extractive::{ExtractiveGenerator, NO_INFORMATION_ANSWER};
pub use gemini::GeminiGenerator;
pub use openai::OpenAIGenerator;

use crate::prompt::Prompt;
use async_trait::async_trait;
use docqa_common::config::GenerationConfig;
use docqa_common::errors::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Produces an answer for a grounded prompt
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create a generator based on configuration
pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        "gemini" => Ok(Arc::new(GeminiGenerator::new(config)?)),
        "extractive" => Ok(Arc::new(ExtractiveGenerator)),
        other => Err(AppError::Configuration {
            message: format!("Unknown generation provider: {}", other),
        }),
    }
}

fn require_api_key(config: &GenerationConfig) -> Result<String> {
    config.api_key.clone().ok_or_else(|| AppError::Configuration {
        message: format!("generation.api_key is required for the {} provider", config.provider),
    })
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to create HTTP client: {}", e),
        })
}

/// Turn a non-success response into a query failure carrying the body
async fn check_status(response: reqwest::Response, provider: &str) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AppError::QueryFailed {
        message: format!("{} API error {}: {}", provider, status, body),
    })
}
