//! Cohere provider (v2 `/chat`).

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::llm::{Message, ProviderError};

pub const LABEL: &str = "Cohere";

#[derive(Debug, Clone)]
pub struct CohereProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
    api_key: String,
}

impl CohereProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: super::http_client(config.timeout_seconds)?,
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            api_key,
        })
    }

    pub async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, ProviderError> {
        let payload = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            max_tokens,
            temperature: self.temperature,
        };
        debug!(provider = LABEL, model = %self.model, messages = payload.messages.len(), "sending LLM request");

        let req = self
            .client
            .post(&self.api_base_url)
            .bearer_auth(&self.api_key)
            .json(&payload);

        let parsed: ChatResponse = super::send_json(LABEL, req, self.timeout_seconds).await?;
        extract_text(parsed)
    }
}

fn extract_text(parsed: ChatResponse) -> Result<String, ProviderError> {
    let message = parsed
        .message
        .ok_or_else(|| ProviderError::Parse("response has no message".into()))?;
    let text: String = message
        .content
        .into_iter()
        .filter(|c| c.kind == "text")
        .filter_map(|c| c.text)
        .collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(text.to_string())
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}
