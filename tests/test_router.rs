//! Router scenarios built from config files.

use std::io::Write;

use tempfile::NamedTempFile;

use reliefmate::config::{self, Config};
use reliefmate::llm::Conversation;
use reliefmate::router::{FALLBACK_LABEL, ResponseRouter};

fn write_toml(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

fn ask(text: &str) -> Conversation {
    let mut c = Conversation::new("You are a relief assistant.");
    c.push_user(text);
    c
}

#[tokio::test]
async fn defaults_answer_through_dummy_provider() {
    let config = Config::with_defaults();
    let router = ResponseRouter::from_config(&config);
    assert_eq!(router.provider_labels(), vec!["Dummy"]);

    let reply = router.respond(&ask("is the bridge open"), config.assistant.max_tokens).await;
    assert_eq!(reply.provider, "Dummy");
    assert_eq!(reply.text, "[echo] is the bridge open");
}

#[tokio::test]
async fn keyless_chain_falls_back_to_rules() {
    // Keyed providers are skipped without API keys; local stays disabled.
    let f = write_toml("[llm]\norder = [\"openai\", \"gemini\", \"cohere\", \"huggingface\", \"local\"]\n");
    let config = config::load_from(f.path(), None, None).unwrap();
    let router = ResponseRouter::from_config(&config);
    assert!(router.provider_labels().is_empty());

    let reply = router.respond(&ask("Flood help"), 64).await;
    assert_eq!(reply.provider, FALLBACK_LABEL);
    assert!(reply.text.starts_with("Flood safety"));
}

#[tokio::test]
async fn custom_rules_win_over_builtin() {
    let f = write_toml(
        r#"
[llm]
order = []

[[fallback.rules]]
keywords = ["Shelter"]
response = "S"

[[fallback.rules]]
keywords = ["rajkot"]
response = "R"
"#,
    );
    let config = config::load_from(f.path(), None, None).unwrap();
    let router = ResponseRouter::from_config(&config);

    let reply = router.respond(&ask("Need shelter in Rajkot"), 64).await;
    assert_eq!(reply.text, "S");
    assert_eq!(reply.provider, FALLBACK_LABEL);

    let reply = router.respond(&ask("rajkot roads"), 64).await;
    assert_eq!(reply.text, "R");
}

#[tokio::test]
async fn unmatched_message_gets_default_contacts() {
    let f = write_toml("[llm]\norder = []\n");
    let config = config::load_from(f.path(), None, None).unwrap();
    let router = ResponseRouter::from_config(&config);

    let reply = router.respond(&ask("hello"), 64).await;
    assert_eq!(reply.text, router.fallback().default_response());
    assert!(reply.text.contains("112"));
}

#[tokio::test]
async fn repeated_calls_are_identical() {
    let config = Config::with_defaults();
    let router = ResponseRouter::from_config(&config);
    let c = ask("need drinking water");
    assert_eq!(router.respond(&c, 32).await, router.respond(&c, 32).await);
}

#[test]
fn bundled_config_parses() {
    let config = config::load_from(std::path::Path::new("config/default.toml"), None, None).unwrap();
    assert_eq!(config.assistant.name, "ReliefMate");
    assert!(!config.llm.local.enabled);
    assert!(!config.comms.http.enabled);
    assert_eq!(config.reports.retention_hours, 72);
}
