//! Hugging Face Inference API provider (text-generation task).
//!
//! The endpoint takes a single prompt string, so the conversation is
//! flattened into a role-prefixed transcript ending with an open
//! `Assistant:` turn.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::llm::{Message, ProviderError, Role};

pub const LABEL: &str = "Hugging Face";

#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    endpoint: String,
    temperature: f32,
    timeout_seconds: u64,
    api_key: String,
}

impl HuggingFaceProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            endpoint: format!("{}/{}", config.api_base_url.trim_end_matches('/'), config.model),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            api_key,
        })
    }

    pub async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, ProviderError> {
        let inputs = flatten_prompt(messages);
        let payload = GenerationRequest {
            inputs: &inputs,
            parameters: Parameters {
                max_new_tokens: max_tokens,
                // The API rejects a temperature of exactly zero.
                temperature: (self.temperature > 0.0).then_some(self.temperature),
                return_full_text: false,
            },
        };
        debug!(provider = LABEL, prompt_len = inputs.len(), max_tokens, "sending LLM request");

        let req = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload);

        let parsed: GenerationResponse = super::send_json(LABEL, req, self.timeout_seconds).await?;
        extract_text(parsed)
    }
}

fn flatten_prompt(messages: &[Message]) -> String {
    let mut prompt = String::new();
    for m in messages {
        let prefix = match m.role {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(prefix);
        prompt.push_str(": ");
        prompt.push_str(m.content.trim());
        prompt.push('\n');
    }
    prompt.push_str("Assistant:");
    prompt
}

fn extract_text(parsed: GenerationResponse) -> Result<String, ProviderError> {
    let generated = match parsed {
        GenerationResponse::Many(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("empty generation list".into()))?,
        GenerationResponse::One(item) => item,
    };
    let text = generated.generated_text.trim();
    if text.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(text.to_string())
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

#[derive(Debug, Serialize)]
struct Parameters {
    max_new_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationResponse {
    Many(Vec<Generated>),
    One(Generated),
}

#[derive(Debug, Deserialize)]
struct Generated {
    generated_text: String,
}
