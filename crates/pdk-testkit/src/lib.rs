//! pdk-testkit
//!
//! Deterministic stand-ins for the collaborators a simulation talks to, and
//! the fixture data the cross-crate scenarios run on.
//! - [`ScriptedOracle`]: queued raw replies and failures, records every input
//! - [`FailingAuditSink`], [`FailingRetrievalStore`]: always error
//! - fixture loaders for `fixtures/`

mod failing;
mod scripted;

pub use failing::{FailingAuditSink, FailingRetrievalStore};
pub use scripted::{Reply, ScriptedOracle};

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pdk_config::{load_layered_yaml_from_strings, SimConfig};
use pdk_md::{load_bars_file, load_fundamentals_file, load_news_file, MarketDataStore};
use pdk_schemas::Order;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// Bars, news and fundamentals from `fixtures/`.
pub fn fixture_store() -> Result<MarketDataStore> {
    let mut store = MarketDataStore::new();
    store.insert_bars(load_bars_file(&fixture_path("bars.csv")).context("fixture bars")?);
    store.insert_news(load_news_file(&fixture_path("news.jsonl"))?);
    store.insert_fundamentals(load_fundamentals_file(&fixture_path("fundamentals.json"))?);
    Ok(store)
}

/// `fixtures/sim.yaml` plus optional overlay documents, validated.
pub fn fixture_config(overlays: &[&str]) -> Result<SimConfig> {
    let path = fixture_path("sim.yaml");
    let base = std::fs::read_to_string(&path)
        .with_context(|| format!("read fixture config {}", path.display()))?;
    let mut docs = vec![base.as_str()];
    docs.extend_from_slice(overlays);
    load_layered_yaml_from_strings(&docs)?.sim_config()
}

/// A compliant decision envelope around `orders`, as raw model text.
pub fn decision_json(orders: &[Order], summary: &str) -> String {
    serde_json::json!({
        "timestamp": "model-supplied",
        "orders": orders,
        "portfolioUpdates": null,
        "diagnostics": {
            "summary": summary,
            "keySignals": [],
            "confidenceOverall": 0.7,
            "ruleViolations": []
        }
    })
    .to_string()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}
