//! Dummy LLM provider: no network, deterministic output.
//!
//! `echo` mirrors the latest user turn prefixed with `[echo]`, `fixed`
//! always returns the same text and `failing` always errors. `delayed`
//! sleeps before answering. Used for local runs without API keys and for
//! exercising the router.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::llm::{Message, ProviderError, Role};

#[derive(Debug, Clone)]
enum Behaviour {
    Echo,
    Fixed(String),
    Failing(String),
    Delayed(Duration, String),
}

#[derive(Debug, Clone)]
pub struct DummyProvider {
    label: String,
    behaviour: Behaviour,
    /// Shared across clones so callers can observe how often the provider ran.
    calls: Arc<AtomicUsize>,
}

impl DummyProvider {
    pub fn echo(label: impl Into<String>) -> Self {
        Self::with(label, Behaviour::Echo)
    }

    pub fn fixed(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with(label, Behaviour::Fixed(text.into()))
    }

    pub fn failing(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::with(label, Behaviour::Failing(reason.into()))
    }

    pub fn delayed(label: impl Into<String>, delay: Duration, text: impl Into<String>) -> Self {
        Self::with(label, Behaviour::Delayed(delay, text.into()))
    }

    fn with(label: impl Into<String>, behaviour: Behaviour) -> Self {
        Self { label: label.into(), behaviour, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of `complete` calls made on this provider or any clone of it.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn complete(&self, messages: &[Message], _max_tokens: u32) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Echo => {
                let last = messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or_default();
                Ok(format!("[echo] {last}"))
            }
            Behaviour::Fixed(text) => Ok(text.clone()),
            Behaviour::Failing(reason) => Err(ProviderError::Request(reason.clone())),
            Behaviour::Delayed(delay, text) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
        }
    }
}
