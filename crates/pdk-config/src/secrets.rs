//! API key resolution for strategies.
//!
//! YAML carries only environment variable NAMES (`api_key_env`). Keys are
//! read once at startup and handed to the provider factory; error messages
//! name the variable, never the value.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::sim::SimConfig;

/// Resolved API keys by strategy signature. `None` means the strategy runs
/// without a key (e.g. a local model). Values are redacted in `Debug`.
#[derive(Clone, Default)]
pub struct ResolvedSecrets {
    keys: BTreeMap<String, Option<String>>,
}

impl ResolvedSecrets {
    pub fn api_key(&self, signature: &str) -> Option<&str> {
        self.keys.get(signature).and_then(|k| k.as_deref())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        for (sig, key) in &self.keys {
            m.entry(sig, &key.as_ref().map(|_| "<REDACTED>"));
        }
        m.finish()
    }
}

/// Resolve keys for every enabled strategy from the process environment.
pub fn resolve_strategy_secrets(cfg: &SimConfig) -> Result<ResolvedSecrets> {
    resolve_strategy_secrets_with(cfg, |name| std::env::var(name).ok())
}

/// Same as [`resolve_strategy_secrets`] with an injectable lookup.
///
/// # Errors
/// A strategy that names an `api_key_env` whose variable is unset or blank.
pub fn resolve_strategy_secrets_with<F>(cfg: &SimConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let mut keys = BTreeMap::new();
    for s in cfg.enabled_strategies() {
        let key = match s.api_key_env.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(var) => match lookup(var) {
                Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
                _ => bail!(
                    "SECRETS_MISSING strategy={}: env var '{}' is not set or empty",
                    s.signature,
                    var
                ),
            },
        };
        keys.insert(s.signature.clone(), key);
    }
    Ok(ResolvedSecrets { keys })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_layered_yaml_from_strings;

    const YAML: &str = r#"
strategies:
  - {signature: gpt, provider: openai, model: gpt-4o, api_key_env: PDK_TEST_OPENAI}
  - {signature: local, provider: ollama, model: llama3}
  - {signature: off, provider: anthropic, model: claude, api_key_env: PDK_UNSET, enabled: false}
"#;

    fn cfg() -> SimConfig {
        load_layered_yaml_from_strings(&[YAML])
            .unwrap()
            .sim_config()
            .unwrap()
    }

    #[test]
    fn resolves_named_vars_and_skips_disabled() {
        let s = resolve_strategy_secrets_with(&cfg(), |n| {
            (n == "PDK_TEST_OPENAI").then(|| "  the-key ".to_string())
        })
        .unwrap();
        assert_eq!(s.api_key("gpt"), Some("the-key"));
        assert_eq!(s.api_key("local"), None);
        assert_eq!(s.api_key("off"), None);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn missing_var_names_the_var_not_the_value() {
        let err = resolve_strategy_secrets_with(&cfg(), |_| None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PDK_TEST_OPENAI"));
        assert!(msg.contains("strategy=gpt"));
    }

    #[test]
    fn debug_redacts() {
        let s = resolve_strategy_secrets_with(&cfg(), |_| Some("super-secret".to_string()))
            .unwrap();
        let dbg = format!("{s:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<REDACTED>"));
    }
}
