//! Tests for game configuration loading.

use std::time::Duration;

use aivault::{GameConfig, LlmProvider};

#[test]
fn test_defaults() {
    let config = GameConfig::default();
    assert_eq!(config.catalog_path().to_str(), Some("data/puzzles.json"));
    assert_eq!(config.save_path().to_str(), Some("aivault_save.json"));
    assert_eq!(*config.ai_provider(), None);
    assert_eq!(config.hint_timeout(), Duration::from_secs(10));
    assert_eq!(config.autosave_debounce(), Duration::from_secs(1));
    assert_eq!(config.pacing(), Duration::from_millis(1500));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = GameConfig::from_toml("ai_provider = \"anthropic\"\npacing_ms = 0").unwrap();
    assert_eq!(*config.ai_provider(), Some(LlmProvider::Anthropic));
    assert_eq!(config.pacing(), Duration::ZERO);
    assert_eq!(config.ai_max_tokens(), 150);
    assert_eq!(config.catalog_path(), GameConfig::default().catalog_path());
}

#[test]
fn test_invalid_toml_is_an_error() {
    assert!(GameConfig::from_toml("pacing_ms = \"soon\"").is_err());
    assert!(GameConfig::from_toml("ai_provider = \"skynet\"").is_err());
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aivault.toml");
    std::fs::write(&path, "save_path = \"slots/one.json\"\nhint_timeout_ms = 250").unwrap();

    let config = GameConfig::from_file(&path).unwrap();
    assert_eq!(config.save_path().to_str(), Some("slots/one.json"));
    assert_eq!(config.hint_timeout(), Duration::from_millis(250));
    assert!(GameConfig::from_file(dir.path().join("missing.toml")).is_err());
}

#[test]
fn test_llm_config_needs_provider_and_key() {
    let none = GameConfig::default();
    assert!(none.create_llm_config_with(|_| None).unwrap().is_none());

    let openai = GameConfig::from_toml("ai_provider = \"openai\"").unwrap();
    assert!(openai.create_llm_config_with(|_| None).is_err());
    assert!(openai.create_llm_config_with(|_| Some("  ".to_string())).is_err());

    let llm = openai
        .create_llm_config_with(|var| (var == "OPENAI_API_KEY").then(|| "sk-test".to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(llm.provider(), LlmProvider::OpenAI);
    assert_eq!(llm.model(), "gpt-4o-mini");
    assert!(!format!("{:?}", llm).contains("sk-test"));
}

#[test]
fn test_model_override() {
    let config =
        GameConfig::from_toml("ai_provider = \"anthropic\"\nai_model = \"claude-x\"\nai_max_tokens = 64")
            .unwrap();
    let llm = config
        .create_llm_config_with(|_| Some("key".to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(llm.model(), "claude-x");
    assert_eq!(llm.max_tokens(), 64);
}

#[test]
fn test_shipped_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/aivault.toml");
    let config = GameConfig::from_file(path).unwrap();
    assert_eq!(config, GameConfig::default());
}
