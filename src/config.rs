//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the `-f` path), then applies `RELIEFMATE_LOG_LEVEL` and
//! `RELIEFMATE_HTTP_BIND` env overrides. API keys come from env only.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Assistant behaviour shared by every channel.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub name: String,
    /// First message of every new conversation.
    pub system_prompt: String,
    /// Reply length budget passed to each provider.
    pub max_tokens: u32,
    /// Newest turns sent to providers; `0` sends the whole conversation.
    pub history_cap: usize,
    /// Surface per-provider failures to the user alongside the reply.
    pub warn_on_provider_failure: bool,
    /// Upper bound on a single provider call, on top of the HTTP timeout.
    pub call_timeout_seconds: u64,
}

/// One `[llm.<name>]` section.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub enabled: bool,
    /// Endpoint URL (full chat URL for OpenAI-style APIs, API root for
    /// Gemini and Hugging Face).
    pub api_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

/// Provider chain configuration (`[llm]`).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider keys in the order the router tries them.
    pub order: Vec<String>,
    pub openai: ProviderConfig,
    pub gemini: ProviderConfig,
    pub cohere: ProviderConfig,
    pub huggingface: ProviderConfig,
    pub local: ProviderConfig,
}

impl LlmConfig {
    /// Whether the `[llm.<name>]` section allows loading. Names without a
    /// section (e.g. `dummy`) are always enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        match name {
            "openai" => self.openai.enabled,
            "gemini" => self.gemini.enabled,
            "cohere" => self.cohere.enabled,
            "huggingface" => self.huggingface.enabled,
            "local" => self.local.enabled,
            _ => true,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        RawLlm::default().resolve()
    }
}

/// Provider credentials. Sourced from env, never TOML.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub cohere: Option<String>,
    pub huggingface: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        Self {
            openai: env_key(&["OPENAI_API_KEY"]),
            gemini: env_key(&["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
            cohere: env_key(&["COHERE_API_KEY", "CO_API_KEY"]),
            huggingface: env_key(&["HUGGINGFACE_API_KEY", "HF_TOKEN"]),
        }
    }
}

/// First non-blank value among `vars`.
fn env_key(vars: &[&str]) -> Option<String> {
    vars.iter()
        .filter_map(|v| env::var(v).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// A user-supplied keyword rule (`[[fallback.rules]]`).
#[derive(Debug, Clone, Deserialize)]
pub struct FallbackRuleConfig {
    pub keywords: Vec<String>,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct PtyConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub enabled: bool,
    pub bind: String,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct ReportsConfig {
    /// Reports older than this are pruned; `0` keeps them forever.
    pub retention_hours: u64,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub assistant: AssistantConfig,
    pub llm: LlmConfig,
    pub api_keys: ApiKeys,
    pub comms: CommsConfig,
    /// Checked before the built-in fallback rules.
    pub fallback_rules: Vec<FallbackRuleConfig>,
    pub reports: ReportsConfig,
}

// ── Raw TOML shape ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    assistant: RawAssistant,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    comms: RawComms,
    #[serde(default)]
    fallback: RawFallback,
    #[serde(default)]
    reports: RawReports,
}

#[derive(Deserialize)]
struct RawAssistant {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_system_prompt")]
    system_prompt: String,
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    #[serde(default = "default_history_cap")]
    history_cap: usize,
    #[serde(default)]
    warn_on_provider_failure: bool,
    #[serde(default = "default_call_timeout_seconds")]
    call_timeout_seconds: u64,
}

impl Default for RawAssistant {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            system_prompt: default_system_prompt(),
            max_tokens: default_max_tokens(),
            history_cap: default_history_cap(),
            warn_on_provider_failure: false,
            call_timeout_seconds: default_call_timeout_seconds(),
        }
    }
}

fn default_name() -> String { "ReliefMate".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_system_prompt() -> String {
    "You are a concise disaster relief assistant. Prefer verified, safety-first guidance \
     and always mention local emergency numbers when lives may be at risk."
        .to_string()
}
fn default_max_tokens() -> u32 { 512 }
fn default_history_cap() -> usize { 20 }
fn default_call_timeout_seconds() -> u64 { 30 }

#[derive(Deserialize)]
struct RawLlm {
    #[serde(default = "default_order")]
    order: Vec<String>,
    #[serde(default)]
    openai: RawProvider,
    #[serde(default)]
    gemini: RawProvider,
    #[serde(default)]
    cohere: RawProvider,
    #[serde(default)]
    huggingface: RawProvider,
    #[serde(default)]
    local: RawProvider,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            order: default_order(),
            openai: RawProvider::default(),
            gemini: RawProvider::default(),
            cohere: RawProvider::default(),
            huggingface: RawProvider::default(),
            local: RawProvider::default(),
        }
    }
}

impl RawLlm {
    fn resolve(self) -> LlmConfig {
        LlmConfig {
            order: self.order,
            openai: self.openai.resolve(true, "https://api.openai.com/v1/chat/completions", "gpt-4o-mini"),
            gemini: self.gemini.resolve(true, "https://generativelanguage.googleapis.com/v1beta", "gemini-1.5-flash"),
            cohere: self.cohere.resolve(true, "https://api.cohere.com/v2/chat", "command-r"),
            huggingface: self.huggingface.resolve(
                true,
                "https://api-inference.huggingface.co/models",
                "mistralai/Mistral-7B-Instruct-v0.2",
            ),
            // Keyless, so it would always load; require an explicit opt-in.
            local: self.local.resolve(false, "http://127.0.0.1:11434/v1/chat/completions", "llama3"),
        }
    }
}

fn default_order() -> Vec<String> {
    ["openai", "gemini", "cohere", "huggingface", "local"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Every field optional so each provider can carry its own defaults.
#[derive(Deserialize, Default)]
struct RawProvider {
    enabled: Option<bool>,
    api_base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_seconds: Option<u64>,
}

impl RawProvider {
    fn resolve(self, enabled: bool, api_base_url: &str, model: &str) -> ProviderConfig {
        ProviderConfig {
            enabled: self.enabled.unwrap_or(enabled),
            api_base_url: self.api_base_url.unwrap_or_else(|| api_base_url.to_string()),
            model: self.model.unwrap_or_else(|| model.to_string()),
            temperature: self.temperature.unwrap_or(0.3),
            timeout_seconds: self.timeout_seconds.unwrap_or(20),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawComms {
    #[serde(default)]
    pty: RawPty,
    #[serde(default)]
    http: RawHttp,
}

#[derive(Deserialize)]
struct RawPty {
    /// Defaults to `true`; still only runs with `-i`.
    #[serde(default = "default_true")]
    enabled: bool,
}

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    #[serde(default)]
    enabled: bool,
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { enabled: false, bind: default_http_bind() }
    }
}

fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
fn default_true() -> bool { true }

#[derive(Deserialize, Default)]
struct RawFallback {
    #[serde(default)]
    rules: Vec<FallbackRuleConfig>,
}

#[derive(Deserialize)]
struct RawReports {
    #[serde(default = "default_retention_hours")]
    retention_hours: u64,
}

impl Default for RawReports {
    fn default() -> Self {
        Self { retention_hours: default_retention_hours() }
    }
}

fn default_retention_hours() -> u64 { 72 }

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load config from `path` (default `config/default.toml`), then apply
/// env-var overrides.
pub fn load(path: Option<&str>) -> Result<Config, AppError> {
    let path = expand_home(path.unwrap_or(DEFAULT_CONFIG_PATH));
    let log_level_override = env::var("RELIEFMATE_LOG_LEVEL").ok();
    let http_bind_override = env::var("RELIEFMATE_HTTP_BIND").ok();
    let mut config = load_from(&path, log_level_override.as_deref(), http_bind_override.as_deref())?;
    config.api_keys = ApiKeys::from_env();
    Ok(config)
}

/// Internal loader. Accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars. API keys are
/// left empty.
pub fn load_from(
    path: &Path,
    log_level_override: Option<&str>,
    http_bind_override: Option<&str>,
) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;
    validate(&parsed)?;
    Ok(resolve(parsed, log_level_override, http_bind_override))
}

fn validate(parsed: &RawConfig) -> Result<(), AppError> {
    let a = &parsed.assistant;
    if a.max_tokens == 0 {
        return Err(AppError::Config("assistant.max_tokens must be greater than zero".into()));
    }
    if a.call_timeout_seconds == 0 {
        return Err(AppError::Config("assistant.call_timeout_seconds must be greater than zero".into()));
    }
    if let Some(rule) = parsed.fallback.rules.iter().find(|r| r.keywords.iter().all(|k| k.trim().is_empty())) {
        return Err(AppError::Config(format!(
            "fallback rule with response '{}' has no keywords",
            rule.response
        )));
    }
    Ok(())
}

fn resolve(
    parsed: RawConfig,
    log_level_override: Option<&str>,
    http_bind_override: Option<&str>,
) -> Config {
    let a = parsed.assistant;
    Config {
        log_level: log_level_override.unwrap_or(&a.log_level).to_string(),
        assistant: AssistantConfig {
            name: a.name,
            system_prompt: a.system_prompt,
            max_tokens: a.max_tokens,
            history_cap: a.history_cap,
            warn_on_provider_failure: a.warn_on_provider_failure,
            call_timeout_seconds: a.call_timeout_seconds,
        },
        llm: parsed.llm.resolve(),
        api_keys: ApiKeys::default(),
        comms: CommsConfig {
            pty: PtyConfig { enabled: parsed.comms.pty.enabled },
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: http_bind_override.map(str::to_string).unwrap_or(parsed.comms.http.bind),
            },
        },
        fallback_rules: parsed.fallback.rules,
        reports: ReportsConfig { retention_hours: parsed.reports.retention_hours },
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

impl Config {
    /// Built-in defaults with a dummy-only provider chain and no API keys.
    /// Safe for tests: nothing reaches the network.
    pub fn with_defaults() -> Self {
        let mut config = resolve(RawConfig::default(), None, None);
        config.llm.order = vec!["dummy".into()];
        config
    }
}
