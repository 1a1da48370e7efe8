//! pdk-config
//!
//! Layered YAML configuration for a simulation run.
//!
//! Documents are merged in order (later layers override earlier ones, objects
//! merge key by key, everything else is replaced). The merged tree is checked
//! for literal secrets, hashed, and deserialized into a typed [`SimConfig`].
//! The hash is over canonical JSON, so key order in the YAML does not matter.

mod secrets;
mod sim;

pub use secrets::{resolve_strategy_secrets, resolve_strategy_secrets_with, ResolvedSecrets};
pub use sim::{
    AuditSection, DataSection, RagSection, RunSection, SimConfig, StrategyConfig,
    DEFAULT_TIMEOUT_SECS,
};

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Leaf strings starting with any of these are treated as pasted credentials.
const SECRET_PREFIXES: &[&str] = &[
    "sk-",        // OpenAI, DeepSeek, OpenRouter (sk-or-), Anthropic (sk-ant-)
    "gsk_",       // Groq
    "AIza",       // Google API keys
    "xai-",       // xAI
    "hf_",        // Hugging Face
    "AKIA",       // AWS access key id
    "ghp_",       // GitHub PAT
    "-----BEGIN", // PEM private keys
];

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Typed view of the merged config, validated.
    pub fn sim_config(&self) -> Result<SimConfig> {
        let cfg: SimConfig = serde_json::from_value(self.config_json.clone())
            .context("config does not match the simulation schema")?;
        cfg.validate()?;
        Ok(cfg)
    }
}

pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs = Vec::with_capacity(paths.len());
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {}", p.display()))?;
        docs.push(raw);
    }
    let refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    if yaml_docs.is_empty() {
        bail!("no config layers given");
    }

    let mut merged = Value::Object(serde_json::Map::new());
    for (i, raw) in yaml_docs.iter().enumerate() {
        let v_yaml: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("invalid yaml in layer {i}"))?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty document parses as null; it contributes nothing.
        if !v_json.is_null() {
            merged = deep_merge(merged, v_json);
        }
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json's default Map is ordered by key, so this is canonical.
    let canonical_json =
        serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    tracing::debug!(layers = yaml_docs.len(), %config_hash, "config loaded");

    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                let merged = match base_map.remove(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => v,
                };
                base_map.insert(k, merged);
            }
            Value::Object(base_map)
        }
        (_, other) => other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    if let Some(ptr) = find_secret_leaf(v, "") {
        bail!("CONFIG_SECRET_DETECTED leaf={ptr} value=REDACTED");
    }
    Ok(())
}

fn find_secret_leaf(v: &Value, prefix: &str) -> Option<String> {
    match v {
        Value::Object(map) => map.iter().find_map(|(k, vv)| {
            let token = k.replace('~', "~0").replace('/', "~1");
            find_secret_leaf(vv, &format!("{prefix}/{token}"))
        }),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .find_map(|(i, vv)| find_secret_leaf(vv, &format!("{prefix}/{i}"))),
        Value::String(s) if looks_like_secret(s) => Some(if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }),
        _ => None,
    }
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    t.len() >= 8 && SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}
