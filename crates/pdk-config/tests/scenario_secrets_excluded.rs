//! Scenario: pasted API keys never make it into a loaded config.
//!
//! Any layer carrying a credential-looking literal fails the whole load with
//! CONFIG_SECRET_DETECTED and the value is not echoed back. Env var names
//! are accepted.

use pdk_config::load_layered_yaml_from_strings;

const NAMES_ONLY: &str = r#"
strategies:
  - signature: claude
    provider: anthropic
    model: claude-3-5-sonnet
    api_key_env: ANTHROPIC_API_KEY
"#;

fn assert_rejected(yaml: &str, secret: &str) {
    let err = load_layered_yaml_from_strings(&[NAMES_ONLY, yaml]).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("CONFIG_SECRET_DETECTED"), "{msg}");
    assert!(!msg.contains(secret), "secret echoed: {msg}");
}

#[test]
fn env_var_names_are_accepted() {
    let loaded = load_layered_yaml_from_strings(&[NAMES_ONLY]).unwrap();
    assert_eq!(
        loaded.config_json["strategies"][0]["api_key_env"],
        "ANTHROPIC_API_KEY"
    );
}

#[test]
fn pasted_provider_keys_are_rejected() {
    assert_rejected(
        "strategies: [{signature: c, provider: anthropic, model: m, api_key_env: sk-ant-api03-XYZxyz}]",
        "sk-ant-api03-XYZxyz",
    );
    assert_rejected("extra: {token: gsk_abcdefghijkl}", "gsk_abcdefghijkl");
    assert_rejected("extra: [AIzaSyA-1234567890]", "AIzaSyA-1234567890");
}

#[test]
fn secret_in_overlay_fails_even_if_base_is_clean() {
    assert_rejected("run: {goal: sk-proj-0123456789}", "sk-proj-0123456789");
}
