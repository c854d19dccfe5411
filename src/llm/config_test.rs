use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_to_openai_chat_completions() {
    let cfg = LlmConfig::from_lookup(lookup(&[("LLM_API_KEY_ENV", "TEST_KEY"), ("TEST_KEY", "secret")])).unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::OpenAi);
    assert_eq!(cfg.model, "gpt-4o-mini");
    assert_eq!(cfg.openai_mode, OpenAiApiMode::ChatCompletions);
    assert_eq!(cfg.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        LlmTimeouts { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.api_key, "secret");
}

#[test]
fn parses_anthropic_overrides() {
    let cfg = LlmConfig::from_lookup(lookup(&[
        ("LLM_PROVIDER", "anthropic"),
        ("LLM_API_KEY_ENV", "ANTHROPIC_API_KEY"),
        ("ANTHROPIC_API_KEY", "sk-ant"),
        ("LLM_REQUEST_TIMEOUT_SECS", "42"),
        ("LLM_CONNECT_TIMEOUT_SECS", "7"),
    ]))
    .unwrap();
    assert_eq!(cfg.provider, LlmProviderKind::Anthropic);
    assert_eq!(cfg.model, "claude-sonnet-4-5-20250929");
    assert_eq!(cfg.timeouts, LlmTimeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn parses_openai_responses_mode_and_base_url() {
    let cfg = LlmConfig::from_lookup(lookup(&[
        ("LLM_API_KEY_ENV", "K"),
        ("K", "v"),
        ("LLM_MODEL", "gpt-3.5-turbo"),
        ("LLM_OPENAI_MODE", "responses"),
        ("LLM_OPENAI_BASE_URL", "https://example.test/v1/"),
    ]))
    .unwrap();
    assert_eq!(cfg.model, "gpt-3.5-turbo");
    assert_eq!(cfg.openai_mode, OpenAiApiMode::Responses);
    assert_eq!(cfg.openai_base_url, "https://example.test/v1");
}

#[test]
fn unparseable_timeout_falls_back() {
    let cfg = LlmConfig::from_lookup(lookup(&[("LLM_API_KEY_ENV", "K"), ("K", "v"), ("LLM_REQUEST_TIMEOUT_SECS", "soon")]))
        .unwrap();
    assert_eq!(cfg.timeouts.request_secs, DEFAULT_LLM_REQUEST_TIMEOUT_SECS);
}

#[test]
fn missing_key_env_errors() {
    let err = LlmConfig::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { var } if var == "LLM_API_KEY_ENV"));
}

#[test]
fn unset_or_blank_key_errors_with_its_name() {
    let err = LlmConfig::from_lookup(lookup(&[("LLM_API_KEY_ENV", "K")])).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { var } if var == "K"));

    let err = LlmConfig::from_lookup(lookup(&[("LLM_API_KEY_ENV", "K"), ("K", "  ")])).unwrap_err();
    assert!(matches!(err, LlmError::MissingApiKey { .. }));
}

#[test]
fn unknown_provider_errors() {
    let err = LlmConfig::from_lookup(lookup(&[("LLM_PROVIDER", "bad"), ("LLM_API_KEY_ENV", "K"), ("K", "v")]))
        .unwrap_err()
        .to_string();
    assert!(err.contains("unknown LLM_PROVIDER"));
}

#[test]
fn unknown_openai_mode_errors() {
    let err = LlmConfig::from_lookup(lookup(&[("LLM_API_KEY_ENV", "K"), ("K", "v"), ("LLM_OPENAI_MODE", "bad_mode")]))
        .unwrap_err()
        .to_string();
    assert!(err.contains("unsupported openai_api mode"));
}
