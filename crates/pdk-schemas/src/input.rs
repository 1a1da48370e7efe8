use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::market::{Candle, Fundamentals, MarketRules, NewsItem, RiskConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentMode {
    /// Replay of historical days.
    #[default]
    Backtest,
    /// Forward paper trading on the latest available day.
    Paper,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolData {
    pub latest: Candle,
    /// Prior bars, oldest first, all dated before `latest`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Candle>,
}

/// Account view as presented to the oracle (decimal currency units).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub cash: f64,
    pub positions: BTreeMap<String, i64>,
    pub portfolio_value: f64,
    pub buying_power: f64,
    pub total_pnl: f64,
}

/// A prior day whose scenario text resembles today's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioMatch {
    pub key: String,
    pub date: NaiveDate,
    pub summary: String,
    pub score: f64,
}

/// An order accepted on an earlier day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PastTrade {
    pub scenario_key: String,
    pub date: NaiveDate,
    pub action: String,
    pub symbol: String,
    pub quantity: i64,
    pub price: f64,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedContext {
    #[serde(default)]
    pub similar_scenarios: Vec<ScenarioMatch>,
    #[serde(default)]
    pub past_trades: Vec<PastTrade>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.similar_scenarios.is_empty() && self.past_trades.is_empty()
    }
}

/// Everything the oracle may look at for one trading day.
///
/// Nothing in here is dated after `timestamp`; the caller guarantees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInput {
    pub mode: AgentMode,
    pub timestamp: String,
    pub tickers: Vec<String>,
    pub market_data: BTreeMap<String, SymbolData>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fundamentals: BTreeMap<String, Fundamentals>,
    pub account: AccountSnapshot,
    pub market_rules: MarketRules,
    pub risk_config: RiskConfig,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_context: Option<RetrievedContext>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case_and_skips_empty_optionals() {
        let input = AgentInput {
            mode: AgentMode::Backtest,
            timestamp: "2024-03-01".to_string(),
            tickers: vec!["TCS".to_string()],
            market_data: BTreeMap::new(),
            news: Vec::new(),
            fundamentals: BTreeMap::new(),
            account: AccountSnapshot::default(),
            market_rules: MarketRules::default(),
            risk_config: RiskConfig::default(),
            instructions: String::new(),
            goal: String::new(),
            retrieved_context: None,
        };
        let v = serde_json::to_value(&input).unwrap();
        assert!(v.get("marketData").is_some());
        assert!(v.get("riskConfig").unwrap().get("maxDailyTrades").is_some());
        assert!(v.get("fundamentals").is_none());
        assert!(v.get("retrievedContext").is_none());
        assert_eq!(v["mode"], "backtest");
    }
}
