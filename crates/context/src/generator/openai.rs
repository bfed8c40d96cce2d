//! OpenAI-compatible chat completions client

use super::{check_status, http_client, require_api_key, Generator};
use crate::prompt::{ChatMessage, Prompt};
use async_trait::async_trait;
use docqa_common::config::GenerationConfig;
use docqa_common::errors::{AppError, Result};
use serde::{Deserialize, Serialize};

pub struct OpenAIGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: require_api_key(config)?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: prompt.messages(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::QueryFailed {
                message: format!("LLM API request failed: {}", e),
            })?;

        let chat_response: ChatResponse = check_status(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| AppError::QueryFailed {
                message: format!("Failed to parse LLM response: {}", e),
            })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::QueryFailed {
                message: "Empty response from LLM".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
