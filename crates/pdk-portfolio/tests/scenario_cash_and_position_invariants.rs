//! Scenario: ledger invariants hold across arbitrary buy/sell sequences.
//!
//! # Invariants under test
//!
//! 1. Cash never goes negative, whatever mix of accepted and refused orders
//!    is thrown at the ledger.
//! 2. No zero-quantity position survives an exhausting sell.
//! 3. A refused order leaves the ledger byte-for-byte unchanged.
//! 4. The fill journal always replays to the running state.
//!
//! All tests are pure; no IO, no network.

use pdk_portfolio::{marks, Ledger, LedgerError, MarkMap, MICROS_SCALE};

const M: i64 = MICROS_SCALE;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Op {
    Buy(&'static str, i64, i64),
    Sell(&'static str, i64, i64),
}

fn run(ledger: &mut Ledger, ops: &[Op]) -> Vec<Result<(), LedgerError>> {
    ops.iter()
        .map(|op| match *op {
            Op::Buy(s, q, p) => ledger.buy(s, q, p * M),
            Op::Sell(s, q, p) => ledger.sell(s, q, p * M),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// 1: cash non-negativity
// ---------------------------------------------------------------------------

#[test]
fn cash_stays_non_negative_under_mixed_sequence() {
    let mut ledger = Ledger::new(10_000 * M);
    let ops = [
        Op::Buy("TCS", 2, 3_720),
        Op::Buy("INFY", 1, 1_500),
        Op::Buy("TCS", 1, 3_750), // refused: 3_750 > 1_060 remaining
        Op::Sell("INFY", 1, 1_550),
        Op::Buy("ITC", 4, 450),
        Op::Sell("TCS", 5, 3_800), // refused: holds 2
        Op::Buy("RELIANCE", 1, 2_900), // refused
    ];

    let mut prev_cash = ledger.cash_micros();
    for (i, res) in run(&mut ledger, &ops).into_iter().enumerate() {
        assert!(ledger.cash_micros() >= 0, "cash negative after op {i}");
        if res.is_err() {
            assert_eq!(ledger.cash_micros(), prev_cash, "refused op {i} moved cash");
        }
        prev_cash = ledger.cash_micros();
    }
    assert!(ledger.verify_integrity());
}

// ---------------------------------------------------------------------------
// 2: exhausting sells
// ---------------------------------------------------------------------------

#[test]
fn exhausting_sells_remove_positions() {
    let mut ledger = Ledger::new(50_000 * M);
    ledger.buy("TCS", 10, 3_700 * M).unwrap();
    ledger.buy("TCS", 5, 3_760 * M).unwrap();
    ledger.sell("TCS", 8, 3_800 * M).unwrap();
    ledger.sell("TCS", 7, 3_810 * M).unwrap();

    assert!(ledger.is_flat());
    let st = ledger.account_state(&marks([("TCS", 3_900 * M)]));
    assert!(st.positions.is_empty());
    assert!(ledger.positions_marked(&marks([("TCS", 3_900 * M)])).is_empty());
    assert_eq!(st.portfolio_value_micros, st.cash_micros);
}

// ---------------------------------------------------------------------------
// 3: refusal leaves state unchanged
// ---------------------------------------------------------------------------

#[test]
fn refused_sell_leaves_state_unchanged() {
    let mut ledger = Ledger::new(10_000 * M);
    ledger.buy("INFY", 2, 1_500 * M).unwrap();
    let before_cash = ledger.cash_micros();
    let before_holding = ledger.holding("INFY").cloned();
    let before_fills = ledger.fills().len();

    let err = ledger.sell("TCS", 5, 3_800 * M).unwrap_err();
    assert!(matches!(err, LedgerError::NoPosition { .. }));
    assert_eq!(err.to_string(), "no open position in TCS");

    assert_eq!(ledger.cash_micros(), before_cash);
    assert_eq!(ledger.holding("INFY").cloned(), before_holding);
    assert_eq!(ledger.fills().len(), before_fills);
}

// ---------------------------------------------------------------------------
// End-to-end arithmetic
// ---------------------------------------------------------------------------

#[test]
fn round_trip_trade_realizes_expected_pnl() {
    let mut ledger = Ledger::new(100_000 * M);

    ledger.buy("TCS", 10, 3_720 * M).unwrap();
    assert_eq!(ledger.cash_micros(), 62_800 * M);
    let h = ledger.holding("TCS").unwrap();
    assert_eq!((h.quantity, h.avg_price_micros), (10, 3_720 * M));

    ledger.sell("TCS", 10, 3_800 * M).unwrap();
    assert_eq!(ledger.cash_micros(), 100_800 * M);
    assert_eq!(ledger.realized_pnl_micros(), 800 * M);
    assert!(ledger.holding("TCS").is_none());

    let perf = ledger.performance(&MarkMap::new());
    assert_eq!(perf.total_pnl_micros, 800 * M);
    assert!((perf.total_return_pct - 0.8).abs() < 1e-9);
}
