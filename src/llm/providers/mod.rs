//! LLM provider implementations.
//!
//! [`build`] is the factory and [`build_chain`] assembles the ordered list
//! the router walks; both are called once at startup. Adding a new backend =
//! new module + new match arm.

pub mod cohere;
pub mod dummy;
pub mod gemini;
pub mod huggingface;
pub mod openai_compatible;

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, trace, warn};

use crate::config::{ApiKeys, LlmConfig};
use crate::llm::{LlmProvider, ProviderError};

const MAX_API_ERROR_CHARS: usize = 200;

/// Construct one provider by config key.
///
/// Keyed backends fail with [`ProviderError::MissingCredential`] when their
/// env var is unset; `local` and `dummy` never need a key.
pub fn build(name: &str, config: &LlmConfig, keys: &ApiKeys) -> Result<LlmProvider, ProviderError> {
    match name {
        "dummy" => Ok(LlmProvider::Dummy(dummy::DummyProvider::echo("Dummy"))),
        "openai" => {
            let key = keys.openai.clone().ok_or(ProviderError::MissingCredential("OPENAI_API_KEY"))?;
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                openai_compatible::OPENAI_LABEL,
                &config.openai,
                Some(key),
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        "local" => {
            let p = openai_compatible::OpenAiCompatibleProvider::new(
                openai_compatible::LOCAL_LABEL,
                &config.local,
                None,
            )?;
            Ok(LlmProvider::OpenAiCompatible(p))
        }
        "gemini" => {
            let key = keys.gemini.clone().ok_or(ProviderError::MissingCredential("GEMINI_API_KEY"))?;
            Ok(LlmProvider::Gemini(gemini::GeminiProvider::new(&config.gemini, key)?))
        }
        "cohere" => {
            let key = keys.cohere.clone().ok_or(ProviderError::MissingCredential("COHERE_API_KEY"))?;
            Ok(LlmProvider::Cohere(cohere::CohereProvider::new(&config.cohere, key)?))
        }
        "huggingface" => {
            let key = keys
                .huggingface
                .clone()
                .ok_or(ProviderError::MissingCredential("HUGGINGFACE_API_KEY"))?;
            Ok(LlmProvider::HuggingFace(huggingface::HuggingFaceProvider::new(&config.huggingface, key)?))
        }
        other => Err(ProviderError::UnknownProvider(other.to_string())),
    }
}

/// Build every enabled provider named in `config.order`, in order.
///
/// Providers that cannot be built (no key, disabled, unknown name) are
/// skipped with a log line. An empty result is valid: the router then
/// answers from the fallback table alone.
pub fn build_chain(config: &LlmConfig, keys: &ApiKeys) -> Vec<LlmProvider> {
    let mut chain = Vec::with_capacity(config.order.len());
    for name in &config.order {
        if !config.is_enabled(name) {
            debug!(provider = %name, "provider disabled in config");
            continue;
        }
        match build(name, config, keys) {
            Ok(p) => {
                info!(provider = %name, label = p.label(), "provider configured");
                chain.push(p);
            }
            Err(ProviderError::MissingCredential(var)) => {
                info!(provider = %name, env = var, "provider skipped: credential not set");
            }
            Err(e) => warn!(provider = %name, error = %e, "provider skipped"),
        }
    }
    chain
}

// ── Shared HTTP plumbing ──────────────────────────────────────────────────────

pub(crate) fn http_client(timeout_seconds: u64) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))
}

/// Send `req`, check the status and decode the JSON body as `T`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    label: &str,
    req: RequestBuilder,
    timeout_seconds: u64,
) -> Result<T, ProviderError> {
    let response = req.send().await.map_err(|e| {
        if e.is_timeout() {
            warn!(provider = label, timeout_seconds, "LLM request timed out");
            ProviderError::Timeout(timeout_seconds)
        } else {
            error!(provider = label, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(sanitize_api_error(&e.to_string()))
        }
    })?;

    let response = check_status(label, response).await?;

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::Request(format!("failed to read response body: {e}")))?;
    trace!(provider = label, body = %body, "full LLM response payload");

    serde_json::from_str::<T>(&body).map_err(|e| {
        error!(provider = label, error = %e, "failed to deserialize LLM response");
        ProviderError::Parse(e.to_string())
    })
}

/// Return the response if successful, or a sanitized status error.
async fn check_status(label: &str, response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let detail = error_detail(&body).unwrap_or(body);
    let message = format!("HTTP {status}: {}", sanitize_api_error(&detail));

    error!(provider = label, %status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Status(message))
}

/// Pull the human-readable message out of the common error envelopes:
/// `{"error":{"message":…}}` (OpenAI, Gemini), `{"message":…}` (Cohere)
/// and `{"error":"…"}` (Hugging Face).
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

fn is_secret_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    let mut end = from;
    for (i, c) in input[from..].char_indices() {
        if is_secret_char(c) {
            end = from + i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

/// Redact API-key-shaped tokens (`sk-…`, `hf_…`, `AIza…`) from provider text.
///
/// Provider error bodies sometimes echo the submitted key back, and the text
/// ends up in logs and user-visible warnings.
pub fn scrub_secret_patterns(input: &str) -> String {
    const PREFIXES: [&str; 3] = ["sk-", "hf_", "AIza"];

    let mut scrubbed = input.to_string();

    for prefix in PREFIXES {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(prefix) {
            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);

            if end == content_start {
                search_from = content_start;
                continue;
            }

            scrubbed.replace_range(start..end, "[REDACTED]");
            search_from = start + "[REDACTED]".len();
        }
    }

    scrubbed
}

/// Scrub secrets and cap the length of provider error text.
pub fn sanitize_api_error(input: &str) -> String {
    let scrubbed = scrub_secret_patterns(input);

    if scrubbed.chars().count() <= MAX_API_ERROR_CHARS {
        return scrubbed;
    }

    let mut end = MAX_API_ERROR_CHARS;
    while end > 0 && !scrubbed.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &scrubbed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ApiKeys {
        ApiKeys {
            openai: Some("sk-test".into()),
            gemini: None,
            cohere: Some("co-test".into()),
            huggingface: None,
        }
    }

    #[test]
    fn build_unknown_provider_errors() {
        let err = build("nonexistent", &LlmConfig::default(), &keys()).unwrap_err();
        assert!(err.to_string().contains("unknown provider"));
    }

    #[test]
    fn build_keyed_provider_without_key_reports_env_var() {
        let err = build("gemini", &LlmConfig::default(), &keys()).unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential("GEMINI_API_KEY")));
    }

    #[test]
    fn local_needs_no_key() {
        let p = build("local", &LlmConfig::default(), &ApiKeys::default()).unwrap();
        assert_eq!(p.label(), "Local Model");
    }

    #[test]
    fn chain_skips_missing_keys_and_keeps_order() {
        let mut config = LlmConfig::default();
        config.order = vec![
            "cohere".into(),
            "gemini".into(),
            "openai".into(),
            "huggingface".into(),
            "dummy".into(),
        ];
        let labels: Vec<String> = build_chain(&config, &keys())
            .iter()
            .map(|p| p.label().to_string())
            .collect();
        assert_eq!(labels, vec!["Cohere", "OpenAI", "Dummy"]);
    }

    #[test]
    fn chain_skips_disabled_local() {
        let mut config = LlmConfig::default();
        config.order = vec!["local".into()];
        config.local.enabled = false;
        assert!(build_chain(&config, &ApiKeys::default()).is_empty());
    }

    #[test]
    fn chain_empty_when_nothing_configured() {
        let mut config = LlmConfig::default();
        config.order = vec!["openai".into(), "gemini".into()];
        assert!(build_chain(&config, &ApiKeys::default()).is_empty());
    }

    #[test]
    fn error_detail_reads_known_envelopes() {
        assert_eq!(
            error_detail(r#"{"error":{"message":"bad key","code":"invalid"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(error_detail(r#"{"message":"rate limited"}"#).as_deref(), Some("rate limited"));
        assert_eq!(error_detail(r#"{"error":"Model is loading"}"#).as_deref(), Some("Model is loading"));
        assert_eq!(error_detail("<html>502</html>"), None);
    }

    #[test]
    fn sanitize_scrubs_known_key_shapes() {
        let input = "failed: sk-abc123 and hf_XYZ789 via ?key=AIzaSyD-4x";
        let out = sanitize_api_error(input);
        assert!(!out.contains("sk-abc123"));
        assert!(!out.contains("hf_XYZ789"));
        assert!(!out.contains("AIzaSyD-4x"));
        assert_eq!(out.matches("[REDACTED]").count(), 3);
    }

    #[test]
    fn sanitize_truncates_long_error() {
        let result = sanitize_api_error(&"a".repeat(400));
        assert!(result.len() <= MAX_API_ERROR_CHARS + 3);
        assert!(result.ends_with("..."));
    }

    #[test]
    fn sanitize_no_secret_no_change() {
        let input = "simple upstream timeout";
        assert_eq!(sanitize_api_error(input), input);
    }
}
