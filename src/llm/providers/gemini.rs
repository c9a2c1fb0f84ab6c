//! Google Gemini provider (`models/{model}:generateContent`).
//!
//! Gemini has no system role inside `contents`; system turns are folded into
//! `systemInstruction` and assistant turns are sent with role `model`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::llm::{Message, ProviderError, Role};

pub const LABEL: &str = "Gemini";

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    endpoint: String,
    temperature: f32,
    timeout_seconds: u64,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let client = super::http_client(config.timeout_seconds)?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.api_base_url.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client,
            endpoint,
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            api_key,
        })
    }

    pub async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, ProviderError> {
        let payload = build_request(messages, max_tokens, self.temperature);
        debug!(provider = LABEL, contents = payload.contents.len(), max_tokens, "sending LLM request");

        let req = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload);

        let parsed: GenerateContentResponse = super::send_json(LABEL, req, self.timeout_seconds).await?;
        extract_text(parsed)
    }
}

fn build_request(messages: &[Message], max_tokens: u32, temperature: f32) -> GenerateContentRequest {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| Content {
            role: if m.role == Role::Assistant { "model" } else { "user" },
            parts: vec![Part { text: m.content.clone() }],
        })
        .collect();

    GenerateContentRequest {
        system_instruction: (!system.is_empty()).then(|| SystemInstruction {
            parts: vec![Part { text: system.join("\n\n") }],
        }),
        contents,
        generation_config: GenerationConfig { max_output_tokens: max_tokens, temperature },
    }
}

fn extract_text(parsed: GenerateContentResponse) -> Result<String, ProviderError> {
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("response has no candidates".into()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(text.to_string())
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}
