use crate::types::{Fill, Holding, PortfolioState, Side};
use crate::{i128_to_i64_clamp, mul_qty_price_micros};

/// Apply a fill to the book (incremental).
///
/// Rules:
/// - Fill.qty is positive and the fill has already passed ledger checks.
/// - For Buy:
///   - cash -= qty*price
///   - avg = (old_avg*old_qty + price*qty) / (old_qty + qty), rounded half-up
/// - For Sell:
///   - cash += qty*price
///   - realized pnl += (price - avg)*qty, on both the holding and the book
///   - avg is unchanged
/// - A holding that reaches zero quantity is removed.
pub fn apply_fill(pf: &mut PortfolioState, f: &Fill) {
    debug_assert!(f.qty > 0);
    debug_assert!(f.price_micros > 0);

    let notional = i128_to_i64_clamp(mul_qty_price_micros(f.qty, f.price_micros));

    let holding = pf
        .holdings
        .entry(f.symbol.clone())
        .or_insert_with(|| Holding::new(f.symbol.clone()));

    match f.side {
        Side::Buy => {
            pf.cash_micros = pf.cash_micros.saturating_sub(notional);
            holding.avg_price_micros = weighted_avg_micros(
                holding.avg_price_micros,
                holding.quantity,
                f.price_micros,
                f.qty,
            );
            holding.quantity += f.qty;
        }
        Side::Sell => {
            pf.cash_micros = pf.cash_micros.saturating_add(notional);
            let pnl = (f.price_micros as i128 - holding.avg_price_micros as i128) * (f.qty as i128);
            let pnl = i128_to_i64_clamp(pnl);
            holding.realized_pnl_micros = holding.realized_pnl_micros.saturating_add(pnl);
            pf.realized_pnl_micros = pf.realized_pnl_micros.saturating_add(pnl);
            holding.quantity -= f.qty;
        }
    }

    // if flat, drop the holding to keep state minimal/deterministic
    if holding.is_flat() {
        pf.holdings.remove(&f.symbol);
    }
}

/// Quantity-weighted average in micros, rounded half-up.
fn weighted_avg_micros(old_avg: i64, old_qty: i64, px: i64, qty: i64) -> i64 {
    let total_qty = old_qty as i128 + qty as i128;
    if total_qty <= 0 {
        return px;
    }
    let total_cost = old_avg as i128 * old_qty as i128 + px as i128 * qty as i128;
    i128_to_i64_clamp((total_cost * 2 + total_qty) / (total_qty * 2))
}

/// Replay a fill journal from the initial cash and return the derived book.
///
/// Determinism invariant: incremental `apply_fill` must match
/// `recompute_from_fills` on the same fill stream.
pub fn recompute_from_fills(initial_cash_micros: i64, fills: &[Fill]) -> PortfolioState {
    let mut pf = PortfolioState::new(initial_cash_micros);
    for f in fills {
        apply_fill(&mut pf, f);
    }
    pf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MICROS_SCALE;

    const M: i64 = MICROS_SCALE;

    #[test]
    fn weighted_average_of_two_buys() {
        assert_eq!(weighted_avg_micros(100 * M, 10, 200 * M, 10), 150 * M);
    }

    #[test]
    fn weighted_average_rounds_half_up() {
        // (1*1 + 2*2) / 3 = 1.666.. micros -> 2
        assert_eq!(weighted_avg_micros(1, 1, 2, 2), 2);
        // (1*1 + 2*1) / 2 = 1.5 micros -> 2
        assert_eq!(weighted_avg_micros(1, 1, 2, 1), 2);
    }

    #[test]
    fn sell_does_not_move_average() {
        let mut pf = PortfolioState::new(10_000 * M);
        apply_fill(&mut pf, &Fill::new("INFY", Side::Buy, 10, 100 * M));
        apply_fill(&mut pf, &Fill::new("INFY", Side::Sell, 4, 130 * M));

        let h = &pf.holdings["INFY"];
        assert_eq!(h.quantity, 6);
        assert_eq!(h.avg_price_micros, 100 * M);
        assert_eq!(h.realized_pnl_micros, 120 * M);
        assert_eq!(pf.realized_pnl_micros, 120 * M);
    }

    #[test]
    fn recompute_matches_incremental() {
        let fills = vec![
            Fill::new("TCS", Side::Buy, 10, 3_700 * M),
            Fill::new("TCS", Side::Buy, 5, 3_760 * M),
            Fill::new("INFY", Side::Buy, 3, 1_500 * M),
            Fill::new("TCS", Side::Sell, 15, 3_800 * M),
        ];
        let mut pf = PortfolioState::new(200_000 * M);
        for f in &fills {
            apply_fill(&mut pf, f);
        }
        assert_eq!(recompute_from_fills(200_000 * M, &fills), pf);
        assert!(!pf.holdings.contains_key("TCS"));
    }
}
