//! pdk-portfolio
//!
//! Per-strategy paper portfolio ledger.
//! - Cash + weighted-average positions, long only (no margin, no shorts)
//! - Realized vs unrealized PnL
//! - Post-trade TradeLog snapshots and performance metrics
//! - Pure deterministic logic (no IO, no wall clock)
//!
//! All money is fixed-point micros (`i64`, 1e-6 of a currency unit).

mod accounting;
mod metrics;
mod types;

pub mod ledger;

pub use accounting::{apply_fill, recompute_from_fills};
pub use ledger::{Ledger, LedgerError};
pub use metrics::{compute_portfolio_value_micros, compute_unrealized_pnl_micros, mark_for};
pub use types::{
    AccountState, Fill, Holding, PerformanceMetrics, PortfolioState, Position, Side, TradeAction,
    TradeLog,
};

use std::collections::BTreeMap;

/// Price/cash scale: micros (1e-6).
pub const MICROS_SCALE: i64 = 1_000_000;

/// Canonical mark map type (symbol -> price_micros).
pub type MarkMap = BTreeMap<String, i64>;

/// Helper to build a MarkMap with minimal boilerplate.
pub fn marks<I, S>(items: I) -> MarkMap
where
    I: IntoIterator<Item = (S, i64)>,
    S: Into<String>,
{
    let mut m = MarkMap::new();
    for (sym, px) in items {
        m.insert(sym.into(), px);
    }
    m
}

/// Convert a wire-level decimal number into micros.
///
/// Returns `None` for NaN, infinities and values outside the `i64` micros range.
/// Rounds half away from zero at the 7th decimal place.
pub fn micros_from_f64(v: f64) -> Option<i64> {
    if !v.is_finite() {
        return None;
    }
    let scaled = (v * MICROS_SCALE as f64).round();
    if scaled >= i64::MAX as f64 || scaled <= i64::MIN as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Convert micros to a wire-level decimal number (display / JSON only).
pub fn micros_to_f64(m: i64) -> f64 {
    m as f64 / MICROS_SCALE as f64
}

pub(crate) fn mul_qty_price_micros(qty: i64, price_micros: i64) -> i128 {
    (qty as i128) * (price_micros as i128)
}

pub(crate) fn i128_to_i64_clamp(x: i128) -> i64 {
    if x > i64::MAX as i128 {
        i64::MAX
    } else if x < i64::MIN as i128 {
        i64::MIN
    } else {
        x as i64
    }
}

/// Notional value `qty × price` in micros, clamped to the `i64` range.
pub fn notional_micros(qty: i64, price_micros: i64) -> i64 {
    i128_to_i64_clamp(mul_qty_price_micros(qty, price_micros))
}
