use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A dated news item. `time` drives no-look-ahead filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub time: DateTime<Utc>,
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Symbols the item is about. Empty means market-wide.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    /// Sentiment score in [-1, 1] when the source provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

/// Per-symbol fundamentals snapshot. Every metric is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    /// Date the figures were published; later-dated snapshots are hidden.
    #[serde(default, alias = "as_of", skip_serializing_if = "Option::is_none")]
    pub as_of: Option<NaiveDate>,
    #[serde(default, alias = "pe_ratio", skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, alias = "market_cap", skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, alias = "dividend_yield", skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<f64>,
    #[serde(default, alias = "book_value", skip_serializing_if = "Option::is_none")]
    pub book_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

// ---------------------------------------------------------------------------
// Run configuration carried inside every AgentInput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlippageKind {
    #[default]
    None,
    /// `value` is an absolute amount per share in currency units.
    Fixed,
    /// `value` is a fraction of the price (`0.001` = 0.1%).
    Percent,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SlippageModel {
    #[serde(rename = "type")]
    pub kind: SlippageKind,
    #[serde(default)]
    pub value: f64,
}

/// Hard risk limits for one simulation run. Percent limits are fractions.
/// Omitted fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskConfig {
    #[serde(alias = "max_position_pct")]
    pub max_position_pct: f64,
    #[serde(alias = "max_total_exposure_pct")]
    pub max_total_exposure_pct: f64,
    #[serde(alias = "min_cash_reserve_pct")]
    pub min_cash_reserve_pct: f64,
    #[serde(alias = "max_daily_trades")]
    pub max_daily_trades: u32,
    #[serde(default, alias = "allow_margin")]
    pub allow_margin: bool,
    #[serde(default, alias = "slippage_model")]
    pub slippage_model: SlippageModel,
    #[serde(alias = "max_order_value")]
    pub max_order_value: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_position_pct: 0.20,
            max_total_exposure_pct: 0.90,
            min_cash_reserve_pct: 0.05,
            max_daily_trades: 5,
            allow_margin: false,
            slippage_model: SlippageModel::default(),
            max_order_value: 50_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingHours {
    /// Local session open, `HH:MM`.
    pub start: String,
    /// Local session close, `HH:MM`.
    pub end: String,
    /// IANA zone name, e.g. `Asia/Kolkata`.
    pub timezone: String,
}

impl Default for TradingHours {
    fn default() -> Self {
        Self {
            start: "09:15".to_string(),
            end: "15:30".to_string(),
            timezone: "Asia/Kolkata".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRules {
    #[serde(default, alias = "lot_size")]
    pub lot_size: BTreeMap<String, i64>,
    #[serde(default, alias = "trading_hours")]
    pub trading_hours: TradingHours,
    #[serde(default, alias = "tick_size")]
    pub tick_size: BTreeMap<String, f64>,
    #[serde(
        default,
        alias = "circuit_limit_pct",
        skip_serializing_if = "Option::is_none"
    )]
    pub circuit_limit_pct: Option<f64>,
}

impl MarketRules {
    /// Lot size for a symbol; 1 when not configured.
    pub fn lot_size_for(&self, symbol: &str) -> i64 {
        self.lot_size
            .get(symbol)
            .copied()
            .filter(|l| *l > 0)
            .unwrap_or(1)
    }

    pub fn tick_size_for(&self, symbol: &str) -> Option<f64> {
        self.tick_size
            .get(symbol)
            .copied()
            .filter(|t| t.is_finite() && *t > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_config_accepts_both_key_styles() {
        let camel: RiskConfig = serde_json::from_str(
            r#"{"maxPositionPct":0.2,"maxTotalExposurePct":0.9,"minCashReservePct":0.05,
                "maxDailyTrades":3,"allowMargin":false,
                "slippageModel":{"type":"percent","value":0.001},"maxOrderValue":50000}"#,
        )
        .unwrap();
        let snake: RiskConfig = serde_json::from_str(
            r#"{"max_position_pct":0.2,"max_total_exposure_pct":0.9,"min_cash_reserve_pct":0.05,
                "max_daily_trades":3,"slippage_model":{"type":"percent","value":0.001},
                "max_order_value":50000}"#,
        )
        .unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.slippage_model.kind, SlippageKind::Percent);
    }

    #[test]
    fn partial_risk_config_fills_defaults() {
        let r: RiskConfig = serde_json::from_str(r#"{"max_daily_trades": 2}"#).unwrap();
        assert_eq!(r.max_daily_trades, 2);
        assert_eq!(r.max_position_pct, RiskConfig::default().max_position_pct);
    }

    #[test]
    fn lot_size_defaults_to_one() {
        let mut rules = MarketRules::default();
        rules.lot_size.insert("NIFTY".to_string(), 50);
        rules.lot_size.insert("BAD".to_string(), 0);
        assert_eq!(rules.lot_size_for("NIFTY"), 50);
        assert_eq!(rules.lot_size_for("TCS"), 1);
        assert_eq!(rules.lot_size_for("BAD"), 1);
    }

    #[test]
    fn news_time_accepts_offsets() {
        let n: NewsItem = serde_json::from_str(
            r#"{"id":"n1","time":"2024-03-01T09:00:00+05:30","source":"wire","title":"t"}"#,
        )
        .unwrap();
        assert_eq!(n.time.to_rfc3339(), "2024-03-01T03:30:00+00:00");
        assert!(n.summary.is_empty());
    }
}
