//! Scenario: the config hash depends on content, not on layout.
//!
//! Reordered keys give the same hash; an overlay that changes a risk limit
//! gives a different one; the merged result honours the overlay.

use pdk_config::{load_layered_yaml, load_layered_yaml_from_strings};

const BASE: &str = r#"
run:
  initial_cash: 100000
  history_days: 5
risk:
  max_position_pct: 0.2
  max_total_exposure_pct: 0.9
  min_cash_reserve_pct: 0.05
  max_daily_trades: 5
  max_order_value: 50000
strategies:
  - signature: openai-gpt4o
    provider: openai
    model: gpt-4o
    api_key_env: OPENAI_API_KEY
"#;

const BASE_REORDERED: &str = r#"
strategies:
  - model: gpt-4o
    api_key_env: OPENAI_API_KEY
    provider: openai
    signature: openai-gpt4o
risk:
  max_order_value: 50000
  max_daily_trades: 5
  min_cash_reserve_pct: 0.05
  max_total_exposure_pct: 0.9
  max_position_pct: 0.2
run:
  history_days: 5
  initial_cash: 100000
"#;

const TIGHTER: &str = r#"
risk:
  max_daily_trades: 2
"#;

#[test]
fn key_order_does_not_change_the_hash() {
    let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn overlay_changes_hash_and_value() {
    let base = load_layered_yaml_from_strings(&[BASE]).unwrap();
    let layered = load_layered_yaml_from_strings(&[BASE, TIGHTER]).unwrap();
    assert_ne!(base.config_hash, layered.config_hash);

    let cfg = layered.sim_config().unwrap();
    assert_eq!(cfg.risk.max_daily_trades, 2);
    assert_eq!(cfg.risk.max_position_pct, 0.2);
}

#[test]
fn files_and_strings_hash_identically() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let over = dir.path().join("tight.yaml");
    std::fs::write(&base, BASE).unwrap();
    std::fs::write(&over, TIGHTER).unwrap();

    let from_files = load_layered_yaml(&[&base, &over]).unwrap();
    let from_strs = load_layered_yaml_from_strings(&[BASE, TIGHTER]).unwrap();
    assert_eq!(from_files.config_hash, from_strs.config_hash);

    let missing = dir.path().join("nope.yaml");
    let err = load_layered_yaml(&[&missing]).unwrap_err();
    assert!(err.to_string().contains("nope.yaml"));
}
