use pdk_schemas::{MarketRules, OrderAction};

use crate::types::{Slippage, DEFAULT_TICK_MICROS};
use pdk_portfolio::micros_from_f64;

/// Execution price after adverse slippage: buys pay up, sells receive less.
///
/// Never returns less than 1 micro.
pub fn apply_slippage(action: OrderAction, price_micros: i64, slippage: Slippage) -> i64 {
    let delta = match slippage {
        Slippage::None => 0,
        Slippage::Fixed { per_share_micros } => per_share_micros,
        Slippage::Percent { ppm } => {
            ((price_micros as i128 * ppm as i128 + 500_000) / 1_000_000) as i64
        }
    };
    let px = match action {
        OrderAction::Buy => price_micros.saturating_add(delta),
        OrderAction::Sell => price_micros.saturating_sub(delta),
        OrderAction::Hold => price_micros,
    };
    px.max(1)
}

/// Tick size for a symbol in micros, [`DEFAULT_TICK_MICROS`] when not set.
pub fn tick_size_micros(rules: &MarketRules, symbol: &str) -> i64 {
    rules
        .tick_size_for(symbol)
        .and_then(micros_from_f64)
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_TICK_MICROS)
}

/// Round to the nearest tick, half up. The result is at least one tick.
pub fn round_to_tick(price_micros: i64, tick_micros: i64) -> i64 {
    if tick_micros <= 1 {
        return price_micros;
    }
    let ticks = (price_micros as i128 * 2 + tick_micros as i128) / (tick_micros as i128 * 2);
    let rounded = ticks * tick_micros as i128;
    (rounded.max(tick_micros as i128)).min(i64::MAX as i128) as i64
}

/// Slippage then tick rounding: the price the ledger actually fills at.
pub fn execution_price_micros(
    action: OrderAction,
    estimated_micros: i64,
    slippage: Slippage,
    rules: &MarketRules,
    symbol: &str,
) -> i64 {
    let slipped = apply_slippage(action, estimated_micros, slippage);
    round_to_tick(slipped, tick_size_micros(rules, symbol))
}
