//! Google Gemini `generateContent` client

use super::{check_status, http_client, require_api_key, Generator};
use crate::prompt::Prompt;
use async_trait::async_trait;
use docqa_common::config::GenerationConfig;
use docqa_common::errors::{AppError, Result};
use docqa_common::Role;
use serde::{Deserialize, Serialize};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationSettings,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

fn text_content(role: Option<&'static str>, text: impl Into<String>) -> Content {
    Content {
        role,
        parts: vec![Part { text: text.into() }],
    }
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            client: http_client(config)?,
            endpoint: format!(
                "{}/models/{}:generateContent",
                base.trim_end_matches('/'),
                config.model
            ),
            api_key: require_api_key(config)?,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Gemini takes the system message separately and calls the assistant "model"
    fn build_request(&self, prompt: &Prompt) -> GenerateRequest {
        let mut contents: Vec<Content> = prompt
            .history
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                };
                text_content(Some(role), turn.content.as_str())
            })
            .collect();
        contents.push(text_content(Some("user"), prompt.user_message()));

        GenerateRequest {
            system_instruction: text_content(None, prompt.system.as_str()),
            contents,
            generation_config: GenerationSettings {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| AppError::QueryFailed {
                message: format!("LLM API request failed: {}", e),
            })?;

        let result: GenerateResponse = check_status(response, "Gemini")
            .await?
            .json()
            .await
            .map_err(|e| AppError::QueryFailed {
                message: format!("Failed to parse LLM response: {}", e),
            })?;

        let answer: String = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(AppError::QueryFailed {
                message: "Empty response from LLM".to_string(),
            });
        }
        Ok(answer)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_common::Turn;

    fn generator() -> GeminiGenerator {
        let config = GenerationConfig {
            provider: "gemini".into(),
            api_key: Some("test-key".into()),
            ..GenerationConfig::default()
        };
        GeminiGenerator::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            generator().endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_maps_roles() {
        let prompt = Prompt::new("q2", vec![Turn::user("q1"), Turn::assistant("a1")], vec![]);
        let body = serde_json::to_value(generator().build_request(&prompt)).unwrap();

        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "a1");
        assert_eq!(body["contents"][2]["role"], "user");
        assert!((body["generationConfig"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"Thirty "},{"text":"days."}],"role":"model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let text: String = parsed.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "Thirty days.");
    }
}
