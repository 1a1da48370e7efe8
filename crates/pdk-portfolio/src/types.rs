use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// BUY or SELL for fills and trade records.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// A single executed fill (the accounting atom).
///
/// qty is always positive.
/// price_micros is price per unit in micros (1e-6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub symbol: String,
    pub side: Side,
    pub qty: i64,
    pub price_micros: i64,
}

impl Fill {
    pub fn new<S: Into<String>>(symbol: S, side: Side, qty: i64, price_micros: i64) -> Self {
        debug_assert!(qty > 0, "Fill.qty must be > 0");
        debug_assert!(price_micros > 0, "Fill.price_micros must be > 0");
        Self {
            symbol: symbol.into(),
            side,
            qty,
            price_micros,
        }
    }
}

/// An open holding as stored by the ledger.
///
/// `avg_price_micros` is the quantity-weighted average of every still-open buy.
/// Sells never change it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price_micros: i64,
    /// Realized PnL accrued by sells of this holding while it stayed open.
    pub realized_pnl_micros: i64,
}

impl Holding {
    pub fn new<S: Into<String>>(symbol: S) -> Self {
        Self {
            symbol: symbol.into(),
            quantity: 0,
            avg_price_micros: 0,
            realized_pnl_micros: 0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0
    }
}

/// A holding marked against a price map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price_micros: i64,
    pub current_price_micros: i64,
    pub unrealized_pnl_micros: i64,
    pub realized_pnl_micros: i64,
}

/// Mutable book state. Maintained incrementally by [`crate::apply_fill`] and
/// reproducible from the fill journal by [`crate::recompute_from_fills`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortfolioState {
    pub initial_cash_micros: i64,
    pub cash_micros: i64,
    pub realized_pnl_micros: i64,
    pub holdings: BTreeMap<String, Holding>,
}

impl PortfolioState {
    pub fn new(initial_cash_micros: i64) -> Self {
        Self {
            initial_cash_micros,
            cash_micros: initial_cash_micros,
            realized_pnl_micros: 0,
            holdings: BTreeMap::new(),
        }
    }
}

/// Derived account view. Recomputed on demand, never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub cash_micros: i64,
    pub positions: BTreeMap<String, i64>,
    pub portfolio_value_micros: i64,
    /// Equal to cash: margin is never extended.
    pub buying_power_micros: i64,
    /// `portfolio_value - initial_cash`.
    pub total_pnl_micros: i64,
}

/// The action part of a trade record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeAction {
    pub action: Side,
    pub symbol: String,
    pub amount: i64,
    pub price_micros: i64,
}

/// Append-only post-trade record. One per executed order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeLog {
    pub date: NaiveDate,
    pub id: u64,
    pub this_action: TradeAction,
    pub positions: BTreeMap<String, i64>,
    pub portfolio_value_micros: i64,
    pub pnl_micros: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Run-level performance summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub initial_cash_micros: i64,
    pub current_value_micros: i64,
    pub total_return_pct: f64,
    pub total_pnl_micros: i64,
    pub cash_micros: i64,
    pub num_positions: usize,
    pub num_trades: usize,
}
