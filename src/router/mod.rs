//! Response routing: first provider that answers wins, else the rule table.
//!
//! Providers are tried one at a time in configured order. Each call is
//! bounded by `call_timeout`; a timeout counts as a failure like any other.
//! [`ResponseRouter::respond`] never fails and never mutates the
//! conversation. Appending the reply is the caller's job.

pub mod fallback;

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AssistantConfig, Config};
use crate::llm::providers;
use crate::llm::{Conversation, LlmProvider, Message, ProviderError};

pub use fallback::{FallbackRule, FallbackTable};

/// Provider label reported when no provider produced the reply.
pub const FALLBACK_LABEL: &str = "Fallback System";

/// One routed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterReply {
    pub text: String,
    /// Label of the provider that answered, or [`FALLBACK_LABEL`].
    pub provider: String,
    /// Non-fatal provider failures, only populated when
    /// `warn_on_provider_failure` is set.
    pub warnings: Vec<String>,
}

impl RouterReply {
    pub fn is_fallback(&self) -> bool {
        self.provider == FALLBACK_LABEL
    }
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Turns of history sent to providers; 0 sends everything.
    pub history_cap: usize,
    pub call_timeout: Duration,
    pub warn_on_provider_failure: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            history_cap: 0,
            call_timeout: Duration::from_secs(30),
            warn_on_provider_failure: false,
        }
    }
}

impl From<&AssistantConfig> for RouterOptions {
    fn from(c: &AssistantConfig) -> Self {
        Self {
            history_cap: c.history_cap,
            call_timeout: Duration::from_secs(c.call_timeout_seconds),
            warn_on_provider_failure: c.warn_on_provider_failure,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseRouter {
    providers: Vec<LlmProvider>,
    fallback: FallbackTable,
    options: RouterOptions,
}

impl ResponseRouter {
    pub fn new(providers: Vec<LlmProvider>, fallback: FallbackTable, options: RouterOptions) -> Self {
        Self { providers, fallback, options }
    }

    /// Build the provider chain and rule table from resolved config.
    pub fn from_config(config: &Config) -> Self {
        let chain = providers::build_chain(&config.llm, &config.api_keys);
        let fallback = FallbackTable::with_custom(&config.fallback_rules);
        info!(
            providers = ?chain.iter().map(LlmProvider::label).collect::<Vec<_>>(),
            fallback_rules = fallback.rules().len(),
            "response router ready"
        );
        Self::new(chain, fallback, RouterOptions::from(&config.assistant))
    }

    pub fn provider_labels(&self) -> Vec<&str> {
        self.providers.iter().map(LlmProvider::label).collect()
    }

    pub fn fallback(&self) -> &FallbackTable {
        &self.fallback
    }

    /// Produce a reply for the latest user turn in `conversation`.
    pub async fn respond(&self, conversation: &Conversation, max_tokens: u32) -> RouterReply {
        let window = conversation.window(self.options.history_cap);
        let mut warnings = Vec::new();

        for provider in &self.providers {
            let label = provider.label();
            match self.call(provider, &window, max_tokens).await {
                Ok(text) => {
                    debug!(provider = label, reply_len = text.len(), "provider answered");
                    return RouterReply { text, provider: label.to_string(), warnings };
                }
                Err(e) => {
                    warn!(provider = label, error = %e, "provider failed, trying next");
                    if self.options.warn_on_provider_failure {
                        warnings.push(format!("{label} unavailable: {e}"));
                    }
                }
            }
        }

        let latest = conversation.latest_user().unwrap_or_default();
        info!(tried = self.providers.len(), "answering from fallback rules");
        RouterReply {
            text: self.fallback.lookup(latest).to_string(),
            provider: FALLBACK_LABEL.to_string(),
            warnings,
        }
    }

    async fn call(
        &self,
        provider: &LlmProvider,
        messages: &[Message],
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        let timeout = self.options.call_timeout;
        match tokio::time::timeout(timeout, provider.complete(messages, max_tokens)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(ProviderError::Empty),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(timeout.as_secs())),
        }
    }
}
