use pdk_portfolio::{micros_from_f64, notional_micros, AccountState};
use pdk_schemas::{MarketRules, Order, OrderAction, OrderType};

use crate::types::{
    fraction_to_bps, CheckedOrder, ReasonCode, RiskLimits, Validation, BPS_SCALE, MIN_CONFIDENCE,
};

// ---------------------------------------------------------------------------
// Screening
// ---------------------------------------------------------------------------

/// Structural screen of a wire order, run before [`validate_order`].
///
/// `reference_close_micros` is the day's close for the symbol. It is the
/// price every accepted order fills at (before slippage); the oracle's
/// estimate and limit prices are only checked, never booked.
///
/// Check order (first failure wins): quantity, price, confidence, lot size,
/// circuit limit, limit/stop trigger.
pub fn screen_order(
    order: &Order,
    reference_close_micros: i64,
    rules: &MarketRules,
) -> Result<CheckedOrder, ReasonCode> {
    if order.quantity <= 0 {
        return Err(ReasonCode::InvalidQuantity);
    }

    if reference_close_micros <= 0 {
        return Err(ReasonCode::InvalidPrice);
    }
    let estimate = quoted_price_micros(order)?;

    if !order.confidence.is_finite() || order.confidence < MIN_CONFIDENCE {
        return Err(ReasonCode::ConfidenceBelowThreshold);
    }

    if order.quantity % rules.lot_size_for(&order.symbol) != 0 {
        return Err(ReasonCode::LotSizeMismatch);
    }

    let band = rules.circuit_limit_pct.and_then(fraction_to_bps);
    if let (Some(band_bps), Some(px)) = (band, estimate) {
        let dev = (px as i128 - reference_close_micros as i128).abs();
        if dev * BPS_SCALE as i128 > band_bps as i128 * reference_close_micros as i128 {
            return Err(ReasonCode::OutsideCircuitLimit);
        }
    }

    check_trigger(order, reference_close_micros)?;

    Ok(CheckedOrder {
        action: order.action,
        symbol: order.symbol.clone(),
        qty: order.quantity,
        price_micros: reference_close_micros,
    })
}

/// The oracle's own price: its estimate, else the limit price for
/// limit-style orders. `None` when it quoted nothing.
fn quoted_price_micros(order: &Order) -> Result<Option<i64>, ReasonCode> {
    let limit = match order.order_type {
        OrderType::Limit | OrderType::StopLimit => {
            Some(order.limit_price.ok_or(ReasonCode::InvalidPrice)?)
        }
        OrderType::Market => None,
    };
    let Some(v) = order.estimated_execution_price.or(limit) else {
        return Ok(None);
    };
    match micros_from_f64(v) {
        Some(px) if px > 0 => Ok(Some(px)),
        _ => Err(ReasonCode::InvalidPrice),
    }
}

/// Limit-style orders fill only when the close is at least as good as the
/// limit; stop-limits also need the close to have reached the stop.
fn check_trigger(order: &Order, close_micros: i64) -> Result<(), ReasonCode> {
    let price = |v: Option<f64>| -> Result<Option<i64>, ReasonCode> {
        match v {
            None => Ok(None),
            Some(v) => match micros_from_f64(v) {
                Some(px) if px > 0 => Ok(Some(px)),
                _ => Err(ReasonCode::InvalidPrice),
            },
        }
    };
    let (limit, stop) = match order.order_type {
        OrderType::Market => return Ok(()),
        OrderType::Limit => (price(order.limit_price)?, None),
        OrderType::StopLimit => (price(order.limit_price)?, price(order.stop_price)?),
    };
    let buy = matches!(order.action, OrderAction::Buy);

    if let Some(stop) = stop {
        let triggered = if buy { close_micros >= stop } else { close_micros <= stop };
        if !triggered {
            return Err(ReasonCode::StopNotTriggered);
        }
    }
    if let Some(limit) = limit {
        let reached = if buy { close_micros <= limit } else { close_micros >= limit };
        if !reached {
            return Err(ReasonCode::LimitNotReached);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Risk-limit gate. Read-only: a batch can be checked against one snapshot.
///
/// Buy checks, first failure wins:
/// 1. cost > cash
/// 2. cost > max order value
/// 3. cost / pv > max position
/// 4. (pv - cash + cost) / pv > max total exposure
/// 5. (cash - cost) / pv < min cash reserve
///
/// Sell: held quantity must cover the order. Hold: always valid.
pub fn validate_order(
    account: &AccountState,
    order: &CheckedOrder,
    limits: &RiskLimits,
) -> Validation {
    match order.action {
        OrderAction::Hold => Validation::Valid,
        OrderAction::Sell => {
            let held = account.positions.get(&order.symbol).copied().unwrap_or(0);
            if held < order.qty {
                Validation::Invalid(ReasonCode::InsufficientPosition)
            } else {
                Validation::Valid
            }
        }
        OrderAction::Buy => validate_buy(account, order, limits),
    }
}

fn validate_buy(account: &AccountState, order: &CheckedOrder, limits: &RiskLimits) -> Validation {
    let cash = account.cash_micros as i128;
    let pv = account.portfolio_value_micros as i128;
    let cost = notional_micros(order.qty, order.price_micros) as i128;
    let bps = BPS_SCALE as i128;

    // A wiped-out book cannot fund anything.
    if pv <= 0 || cost > cash {
        return Validation::Invalid(ReasonCode::InsufficientCash);
    }
    if cost > limits.max_order_value_micros as i128 {
        return Validation::Invalid(ReasonCode::ExceedsMaxOrderValue);
    }
    if cost * bps > limits.max_position_bps as i128 * pv {
        return Validation::Invalid(ReasonCode::ExceedsMaxPositionPct);
    }
    if (pv - cash + cost) * bps > limits.max_total_exposure_bps as i128 * pv {
        return Validation::Invalid(ReasonCode::ExceedsMaxTotalExposure);
    }
    if (cash - cost) * bps < limits.min_cash_reserve_bps as i128 * pv {
        return Validation::Invalid(ReasonCode::ViolatesMinCashReserve);
    }
    Validation::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Slippage;
    use pdk_portfolio::MICROS_SCALE;
    use std::collections::BTreeMap;

    const M: i64 = MICROS_SCALE;

    fn limits() -> RiskLimits {
        RiskLimits {
            max_position_bps: 2_000,
            max_total_exposure_bps: 9_000,
            min_cash_reserve_bps: 500,
            max_daily_trades: 5,
            max_order_value_micros: 50_000 * M,
            slippage: Slippage::None,
        }
    }

    fn account(cash: i64, pv: i64, positions: &[(&str, i64)]) -> AccountState {
        AccountState {
            cash_micros: cash * M,
            positions: positions
                .iter()
                .map(|(s, q)| (s.to_string(), *q))
                .collect::<BTreeMap<_, _>>(),
            portfolio_value_micros: pv * M,
            buying_power_micros: cash * M,
            total_pnl_micros: 0,
        }
    }

    fn buy(qty: i64, px: i64) -> CheckedOrder {
        CheckedOrder {
            action: OrderAction::Buy,
            symbol: "TCS".to_string(),
            qty,
            price_micros: px * M,
        }
    }

    // --- buy ladder ---

    #[test]
    fn cash_is_checked_first() {
        let v = validate_order(&account(1_000, 100_000, &[]), &buy(1, 3_720), &limits());
        assert_eq!(v, Validation::Invalid(ReasonCode::InsufficientCash));
    }

    #[test]
    fn max_order_value() {
        let mut l = limits();
        l.max_order_value_micros = 10_000 * M;
        let v = validate_order(&account(100_000, 100_000, &[]), &buy(3, 3_720), &l);
        assert_eq!(v, Validation::Invalid(ReasonCode::ExceedsMaxOrderValue));
    }

    #[test]
    fn max_position_pct() {
        // 6 * 3720 = 22_320 > 20% of 100_000
        let v = validate_order(&account(100_000, 100_000, &[]), &buy(6, 3_720), &limits());
        assert_eq!(v, Validation::Invalid(ReasonCode::ExceedsMaxPositionPct));
        let v = validate_order(&account(100_000, 100_000, &[]), &buy(5, 3_720), &limits());
        assert_eq!(v, Validation::Valid);
    }

    #[test]
    fn max_total_exposure() {
        // already 80% invested; +15% would breach 90%
        let v = validate_order(
            &account(20_000, 100_000, &[("INFY", 10)]),
            &buy(15, 1_000),
            &limits(),
        );
        assert_eq!(v, Validation::Invalid(ReasonCode::ExceedsMaxTotalExposure));
    }

    #[test]
    fn min_cash_reserve() {
        let mut l = limits();
        l.max_total_exposure_bps = BPS_SCALE;
        // 12% cash, buying 10% leaves 2% < 5%
        let v = validate_order(&account(12_000, 100_000, &[("INFY", 10)]), &buy(10, 1_000), &l);
        assert_eq!(v, Validation::Invalid(ReasonCode::ViolatesMinCashReserve));
    }

    #[test]
    fn non_positive_portfolio_value_rejects_buys() {
        let v = validate_order(&account(0, 0, &[]), &buy(1, 1), &limits());
        assert_eq!(v, Validation::Invalid(ReasonCode::InsufficientCash));
    }

    #[test]
    fn limits_are_inclusive() {
        // exactly 20% position
        let v = validate_order(&account(100_000, 100_000, &[]), &buy(20, 1_000), &limits());
        assert_eq!(v, Validation::Valid);
    }

    // --- sell / hold ---

    #[test]
    fn sell_requires_held_quantity() {
        let mut o = buy(5, 3_800);
        o.action = OrderAction::Sell;
        let v = validate_order(&account(100_000, 100_000, &[]), &o, &limits());
        assert_eq!(v, Validation::Invalid(ReasonCode::InsufficientPosition));
        let v = validate_order(&account(0, 100_000, &[("TCS", 5)]), &o, &limits());
        assert_eq!(v, Validation::Valid);
    }

    #[test]
    fn hold_is_always_valid() {
        let mut o = buy(1_000_000, 3_800);
        o.action = OrderAction::Hold;
        assert!(validate_order(&account(0, 0, &[]), &o, &limits()).is_valid());
    }

    // --- screening ---

    fn wire(qty: i64, px: Option<f64>, conf: f64) -> Order {
        let mut o = Order::market(OrderAction::Buy, "TCS", qty, 0.0, conf);
        o.estimated_execution_price = px;
        o
    }

    #[test]
    fn screen_rejects_bad_shapes_in_order() {
        let rules = MarketRules::default();
        assert_eq!(
            screen_order(&wire(0, Some(-1.0), 0.0), 3_720 * M, &rules),
            Err(ReasonCode::InvalidQuantity)
        );
        assert_eq!(
            screen_order(&wire(1, Some(-1.0), 0.0), 3_720 * M, &rules),
            Err(ReasonCode::InvalidPrice)
        );
        assert_eq!(
            screen_order(&wire(1, Some(3_720.0), 0.1), 3_720 * M, &rules),
            Err(ReasonCode::ConfidenceBelowThreshold)
        );
        assert_eq!(
            screen_order(&wire(1, Some(3_720.0), f64::NAN), 3_720 * M, &rules),
            Err(ReasonCode::ConfidenceBelowThreshold)
        );
    }

    #[test]
    fn screen_prices_missing_estimate_at_close() {
        let o = screen_order(&wire(10, None, 0.8), 3_720 * M, &MarketRules::default()).unwrap();
        assert_eq!(o.price_micros, 3_720 * M);
        assert_eq!(o.qty, 10);
    }

    #[test]
    fn screen_books_the_close_not_the_quote() {
        let o = screen_order(&wire(10, Some(1.0), 0.8), 3_720 * M, &MarketRules::default()).unwrap();
        assert_eq!(o.price_micros, 3_720 * M);
    }

    #[test]
    fn screen_fills_limit_orders_only_when_the_close_crosses() {
        let mut o = wire(1, None, 0.9);
        o.order_type = OrderType::Limit;
        o.limit_price = Some(3_700.0);
        assert_eq!(
            screen_order(&o, 3_720 * M, &MarketRules::default()),
            Err(ReasonCode::LimitNotReached)
        );
        let c = screen_order(&o, 3_690 * M, &MarketRules::default()).unwrap();
        assert_eq!(c.price_micros, 3_690 * M);

        o.action = OrderAction::Sell;
        assert!(screen_order(&o, 3_720 * M, &MarketRules::default()).is_ok());
        assert_eq!(
            screen_order(&o, 3_690 * M, &MarketRules::default()),
            Err(ReasonCode::LimitNotReached)
        );

        o.limit_price = None;
        assert_eq!(
            screen_order(&o, 3_720 * M, &MarketRules::default()),
            Err(ReasonCode::InvalidPrice)
        );
    }

    #[test]
    fn screen_requires_stop_trigger_for_stop_limits() {
        let mut o = wire(1, None, 0.9);
        o.order_type = OrderType::StopLimit;
        o.stop_price = Some(3_750.0);
        o.limit_price = Some(3_800.0);
        assert_eq!(
            screen_order(&o, 3_720 * M, &MarketRules::default()),
            Err(ReasonCode::StopNotTriggered)
        );
        assert!(screen_order(&o, 3_760 * M, &MarketRules::default()).is_ok());
        assert_eq!(
            screen_order(&o, 3_810 * M, &MarketRules::default()),
            Err(ReasonCode::LimitNotReached)
        );
    }

    #[test]
    fn screen_enforces_lot_size() {
        let mut rules = MarketRules::default();
        rules.lot_size.insert("TCS".to_string(), 25);
        assert_eq!(
            screen_order(&wire(30, None, 0.9), 3_720 * M, &rules),
            Err(ReasonCode::LotSizeMismatch)
        );
        assert!(screen_order(&wire(50, None, 0.9), 3_720 * M, &rules).is_ok());
    }

    #[test]
    fn screen_enforces_circuit_band() {
        let rules = MarketRules {
            circuit_limit_pct: Some(0.05),
            ..MarketRules::default()
        };
        assert_eq!(
            screen_order(&wire(1, Some(110.0), 0.9), 100 * M, &rules),
            Err(ReasonCode::OutsideCircuitLimit)
        );
        assert!(screen_order(&wire(1, Some(105.0), 0.9), 100 * M, &rules).is_ok());
    }
}
