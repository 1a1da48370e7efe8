//! Oracle output: orders, diagnostics and the TradingDecision envelope.
//!
//! Every key is accepted in camelCase and snake_case. Fields the oracle often
//! omits default to empty values; `confidence` is the exception and must be a
//! JSON number on every order.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    #[serde(alias = "BUY", alias = "Buy")]
    Buy,
    #[serde(alias = "SELL", alias = "Sell")]
    Sell,
    #[serde(alias = "HOLD", alias = "Hold")]
    Hold,
}

impl OrderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Buy => "buy",
            OrderAction::Sell => "sell",
            OrderAction::Hold => "hold",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    #[default]
    #[serde(alias = "MARKET")]
    Market,
    #[serde(alias = "LIMIT")]
    Limit,
    #[serde(alias = "stopLimit", alias = "STOP_LIMIT")]
    StopLimit,
}

/// Free-form signal value reported by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: String,
    pub value: SignalValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

/// The oracle's self-reported limit checks. Informational only: the risk
/// gate never trusts them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsChecked {
    #[serde(default, alias = "within_position_limit")]
    pub within_position_limit: bool,
    #[serde(default, alias = "within_exposure_limit")]
    pub within_exposure_limit: bool,
    #[serde(default, alias = "cash_reserve_maintained")]
    pub cash_reserve_maintained: bool,
    #[serde(default, alias = "within_daily_trade_limit")]
    pub within_daily_trade_limit: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub action: OrderAction,
    pub symbol: String,
    #[serde(deserialize_with = "de_quantity")]
    pub quantity: i64,
    #[serde(default, alias = "order_type")]
    pub order_type: OrderType,
    #[serde(default, alias = "limit_price", skip_serializing_if = "Option::is_none")]
    pub limit_price: Option<f64>,
    #[serde(default, alias = "stop_price", skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<f64>,
    /// The oracle's quote. Checked against the close, never booked; on
    /// accepted orders it is replaced by the actual fill price.
    #[serde(
        default,
        alias = "estimated_execution_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_execution_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notional: Option<f64>,
    pub confidence: f64,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default, alias = "constraints_checked")]
    pub constraints_checked: ConstraintsChecked,
    #[serde(default, alias = "explainable_actions")]
    pub explainable_actions: Vec<String>,
}

impl Order {
    /// Minimal market order; used by tests and scripted oracles.
    pub fn market(
        action: OrderAction,
        symbol: &str,
        quantity: i64,
        price: f64,
        confidence: f64,
    ) -> Self {
        Self {
            action,
            symbol: symbol.to_string(),
            quantity,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            estimated_execution_price: Some(price),
            notional: Some(price * quantity as f64),
            confidence,
            rationale: String::new(),
            signals: Vec::new(),
            constraints_checked: ConstraintsChecked::default(),
            explainable_actions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub quantity: i64,
    #[serde(alias = "avg_price")]
    pub avg_price: f64,
    #[serde(alias = "current_price")]
    pub current_price: f64,
    #[serde(alias = "unrealized_pnl")]
    pub unrealized_pnl: f64,
    #[serde(default, alias = "realized_pnl")]
    pub realized_pnl: f64,
}

/// Post-day portfolio summary, always recomputed from the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdates {
    pub cash: f64,
    #[serde(default)]
    pub positions: BTreeMap<String, PositionUpdate>,
    #[serde(alias = "portfolio_value")]
    pub portfolio_value: f64,
    #[serde(alias = "total_pnl")]
    pub total_pnl: f64,
    #[serde(default, alias = "realized_pnl")]
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    #[serde(default)]
    pub summary: String,
    #[serde(default, alias = "key_signals")]
    pub key_signals: Vec<String>,
    #[serde(default, alias = "confidence_overall", deserialize_with = "de_lenient_f64")]
    pub confidence_overall: f64,
    #[serde(
        default,
        alias = "expected_portfolio_change",
        deserialize_with = "de_lenient_opt_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_portfolio_change: Option<f64>,
    #[serde(default, alias = "rule_violations")]
    pub rule_violations: Vec<String>,
}

/// One decision per (strategy, trading day).
///
/// Serializes all four envelope keys even when `portfolioUpdates` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingDecision {
    pub timestamp: String,
    pub orders: Vec<Order>,
    #[serde(
        default,
        alias = "portfolio_updates",
        deserialize_with = "de_lenient_portfolio_updates"
    )]
    pub portfolio_updates: Option<PortfolioUpdates>,
    pub diagnostics: Diagnostics,
}

impl TradingDecision {
    /// A compliant envelope with no orders.
    pub fn empty(timestamp: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            orders: Vec::new(),
            portfolio_updates: None,
            diagnostics: Diagnostics {
                summary: summary.into(),
                ..Diagnostics::default()
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoders
// ---------------------------------------------------------------------------

/// Integer quantity; integral floats (`10.0`) are accepted, fractions are not.
fn de_quantity<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    match v.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(serde::de::Error::custom(format!(
            "quantity must be an integer, got {v}"
        ))),
    }
}

fn lenient_number(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

fn de_lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(lenient_number(&v).unwrap_or(0.0))
}

fn de_lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(lenient_number(&v))
}

/// The orchestrator overwrites portfolio updates, so a malformed value from
/// the oracle is dropped rather than failing the whole decision.
fn de_lenient_portfolio_updates<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<PortfolioUpdates>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(serde_json::from_value(v).ok())
}
