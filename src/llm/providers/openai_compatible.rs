//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Serves both the hosted OpenAI API and keyless local servers (Ollama,
//! LM Studio, llama.cpp). All wire types are private to this module.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::ProviderConfig;
use crate::llm::{Message, ProviderError};

pub const OPENAI_LABEL: &str = "OpenAI";
pub const LOCAL_LABEL: &str = "Local Model";

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    label: &'static str,
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        label: &'static str,
        config: &ProviderConfig,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = super::http_client(config.timeout_seconds)?;
        Ok(Self {
            label,
            client,
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            api_key,
        })
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub async fn complete(&self, messages: &[Message], max_tokens: u32) -> Result<String, ProviderError> {
        // Some models (gpt-5 family) do not accept a temperature parameter.
        let temperature = if self.model.starts_with("gpt-5") {
            None
        } else {
            Some(self.temperature)
        };

        let payload = ChatCompletionRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            temperature,
            max_tokens,
        };

        debug!(
            provider = self.label,
            model = %payload.model,
            messages = payload.messages.len(),
            max_tokens,
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let parsed: ChatCompletionResponse = super::send_json(self.label, req, self.timeout_seconds).await?;

        debug!(provider = self.label, choices = parsed.choices.len(), "received LLM response");

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ProviderError::Empty)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_local_provider_without_key() {
        let config = ProviderConfig {
            enabled: true,
            api_base_url: "http://127.0.0.1:11434/v1/chat/completions".into(),
            model: "llama3".into(),
            temperature: 0.2,
            timeout_seconds: 5,
        };
        let p = OpenAiCompatibleProvider::new(LOCAL_LABEL, &config, None).unwrap();
        assert_eq!(p.label(), "Local Model");
    }

    #[test]
    fn request_serialises_roles_and_budget() {
        let msgs = [Message::system("sys"), Message::user("flood help")];
        let payload = ChatCompletionRequest {
            model: "gpt-4o-mini",
            messages: msgs
                .iter()
                .map(|m| WireMessage { role: m.role.as_str(), content: &m.content })
                .collect(),
            temperature: None,
            max_tokens: 128,
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "flood help");
        assert_eq!(v["max_tokens"], 128);
        assert!(v.get("temperature").is_none());
    }
}
