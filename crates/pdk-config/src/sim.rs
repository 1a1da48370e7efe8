use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use pdk_schemas::{AgentMode, MarketRules, RiskConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The whole run, as read from the merged YAML layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub market_rules: MarketRules,
    #[serde(default)]
    pub strategies: Vec<StrategyConfig>,
    #[serde(default)]
    pub data: DataSection,
    #[serde(default)]
    pub rag: RagSection,
    #[serde(default)]
    pub audit: AuditSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSection {
    pub initial_cash: f64,
    pub mode: AgentMode,
    pub instructions: String,
    pub goal: String,
    /// Prior bars (and days of news) shown to the oracle each day.
    pub history_days: usize,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            initial_cash: 100_000.0,
            mode: AgentMode::Backtest,
            instructions: String::new(),
            goal: String::new(),
            history_days: 5,
            start: None,
            end: None,
        }
    }
}

/// One oracle-backed strategy. `provider` is a provider kind name such as
/// `openai`, `anthropic`, `gemini` or `ollama`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub signature: String,
    pub provider: String,
    pub model: String,
    /// Name of the environment variable holding the API key. Never the key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_temperature() -> f64 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_true() -> bool {
    true
}

/// File inputs. All optional here; the CLI can supply them instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub bars_csv: Option<PathBuf>,
    pub news_jsonl: Option<PathBuf>,
    pub fundamentals_json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSection {
    pub enabled: bool,
    /// Chance that a day's scenario is stored for later retrieval.
    pub sample_probability: f64,
    pub seed: u64,
    pub top_k: usize,
}

impl Default for RagSection {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_probability: 0.3,
            seed: 7,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSection {
    pub enabled: bool,
    pub path: PathBuf,
    pub hash_chain: bool,
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("runs/audit.jsonl"),
            hash_chain: true,
        }
    }
}

impl SimConfig {
    pub fn enabled_strategies(&self) -> impl Iterator<Item = &StrategyConfig> {
        self.strategies.iter().filter(|s| s.enabled)
    }

    /// Structural checks that need no network or environment access.
    ///
    /// Risk fractions are range-checked again when converted to limits.
    pub fn validate(&self) -> Result<()> {
        let cash = self.run.initial_cash;
        if !cash.is_finite() || cash <= 0.0 {
            bail!("CONFIG_INVALID run.initial_cash must be > 0, got {cash}");
        }
        if let (Some(s), Some(e)) = (self.run.start, self.run.end) {
            if s > e {
                bail!("CONFIG_INVALID run.start {s} is after run.end {e}");
            }
        }

        if self.enabled_strategies().next().is_none() {
            bail!("CONFIG_INVALID no enabled strategies");
        }
        let mut seen = BTreeSet::new();
        for s in &self.strategies {
            if s.signature.trim().is_empty() {
                bail!("CONFIG_INVALID strategy with empty signature");
            }
            if !seen.insert(s.signature.as_str()) {
                bail!("CONFIG_INVALID duplicate strategy signature '{}'", s.signature);
            }
            if s.timeout_secs == 0 {
                bail!("CONFIG_INVALID strategy '{}': timeout_secs must be > 0", s.signature);
            }
            if !(0.0..=2.0).contains(&s.temperature) {
                bail!(
                    "CONFIG_INVALID strategy '{}': temperature {} outside [0, 2]",
                    s.signature,
                    s.temperature
                );
            }
        }

        if !(0.0..=1.0).contains(&self.rag.sample_probability) {
            bail!(
                "CONFIG_INVALID rag.sample_probability {} outside [0, 1]",
                self.rag.sample_probability
            );
        }

        validate_trading_hours(&self.market_rules)?;
        for (sym, lot) in &self.market_rules.lot_size {
            if *lot <= 0 {
                bail!("CONFIG_INVALID market_rules.lot_size.{sym} must be > 0, got {lot}");
            }
        }
        for (sym, tick) in &self.market_rules.tick_size {
            if !tick.is_finite() || *tick <= 0.0 {
                bail!("CONFIG_INVALID market_rules.tick_size.{sym} must be > 0, got {tick}");
            }
        }
        Ok(())
    }
}

fn validate_trading_hours(rules: &MarketRules) -> Result<()> {
    let th = &rules.trading_hours;
    let start = NaiveTime::parse_from_str(&th.start, "%H:%M")
        .with_context(|| format!("CONFIG_INVALID trading_hours.start '{}'", th.start))?;
    let end = NaiveTime::parse_from_str(&th.end, "%H:%M")
        .with_context(|| format!("CONFIG_INVALID trading_hours.end '{}'", th.end))?;
    if start >= end {
        bail!(
            "CONFIG_INVALID trading_hours start {} must be before end {}",
            th.start,
            th.end
        );
    }
    if th.timezone.parse::<chrono_tz::Tz>().is_err() {
        bail!("CONFIG_INVALID trading_hours.timezone '{}' is not an IANA zone", th.timezone);
    }
    Ok(())
}
