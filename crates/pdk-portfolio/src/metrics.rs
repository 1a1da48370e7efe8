use std::collections::BTreeMap;

use crate::types::{Holding, Position};
use crate::{i128_to_i64_clamp, mul_qty_price_micros, MarkMap};

/// Mark for a holding: the supplied price, or the holding's average price
/// when the symbol is missing from the map.
pub fn mark_for(holding: &Holding, marks: &MarkMap) -> i64 {
    marks
        .get(&holding.symbol)
        .copied()
        .unwrap_or(holding.avg_price_micros)
}

/// Portfolio value = cash + Σ(qty * mark).
pub fn compute_portfolio_value_micros(
    cash_micros: i64,
    holdings: &BTreeMap<String, Holding>,
    marks: &MarkMap,
) -> i64 {
    let mut v: i128 = cash_micros as i128;

    // deterministic iteration (BTreeMap)
    for h in holdings.values() {
        v += mul_qty_price_micros(h.quantity, mark_for(h, marks));
    }

    i128_to_i64_clamp(v)
}

/// Unrealized PnL = Σ (mark - avg) * qty.
pub fn compute_unrealized_pnl_micros(holdings: &BTreeMap<String, Holding>, marks: &MarkMap) -> i64 {
    let mut pnl: i128 = 0;
    for h in holdings.values() {
        pnl += (mark_for(h, marks) as i128 - h.avg_price_micros as i128) * (h.quantity as i128);
    }
    i128_to_i64_clamp(pnl)
}

pub(crate) fn mark_position(h: &Holding, marks: &MarkMap) -> Position {
    let current = mark_for(h, marks);
    let unrealized = (current as i128 - h.avg_price_micros as i128) * (h.quantity as i128);
    Position {
        symbol: h.symbol.clone(),
        quantity: h.quantity,
        avg_price_micros: h.avg_price_micros,
        current_price_micros: current,
        unrealized_pnl_micros: i128_to_i64_clamp(unrealized),
        realized_pnl_micros: h.realized_pnl_micros,
    }
}
