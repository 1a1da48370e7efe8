//! Ledger: the per-strategy cash + positions book.
//!
//! # Purpose
//! [`accounting`](crate::accounting) contains the raw weighted-average and PnL
//! mechanics. This module wraps them behind a typed [`Ledger`] façade that:
//!
//! - Enforces ledger invariants on every mutation (positive qty and price,
//!   non-empty symbol, cash never negative, no overselling).
//! - Refuses a mutation **before** touching state; an `Err` means nothing changed.
//! - Journals every accepted fill so the running state can be replayed and
//!   verified.
//! - Keeps the append-only [`TradeLog`] history and derives account/performance
//!   views from a caller-supplied price map.
//!
//! # Usage
//! ```ignore
//! let mut ledger = Ledger::new(100_000 * MICROS_SCALE);
//! ledger.buy("TCS", 10, 3_720 * MICROS_SCALE)?;
//! let state = ledger.account_state(&marks([("TCS", 3_750 * MICROS_SCALE)]));
//! ```
//!
//! # Determinism
//! No IO, no time, no randomness. Two ledgers fed the same calls end in the
//! same state.

use chrono::NaiveDate;

use crate::{
    accounting::{apply_fill, recompute_from_fills},
    metrics::{compute_portfolio_value_micros, compute_unrealized_pnl_micros, mark_position},
    notional_micros,
    types::{
        AccountState, Fill, Holding, PerformanceMetrics, PortfolioState, Position, Side,
        TradeAction, TradeLog,
    },
    MarkMap,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons the ledger refuses a buy or sell. The ledger is never mutated
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Symbol must be non-empty.
    EmptySymbol,
    /// Quantity must be strictly positive.
    NonPositiveQty { qty: i64 },
    /// Price must be strictly positive.
    NonPositivePrice { price_micros: i64 },
    /// `qty × price` exceeds available cash.
    InsufficientCash {
        required_micros: i64,
        available_micros: i64,
    },
    /// Sell of a symbol that is not held.
    NoPosition { symbol: String },
    /// Sell of more shares than are held.
    InsufficientQuantity {
        symbol: String,
        held: i64,
        requested: i64,
    },
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySymbol => write!(f, "ledger invariant: symbol must not be empty"),
            Self::NonPositiveQty { qty } => {
                write!(f, "ledger invariant: qty must be > 0, got {qty}")
            }
            Self::NonPositivePrice { price_micros } => {
                write!(
                    f,
                    "ledger invariant: price_micros must be > 0, got {price_micros}"
                )
            }
            Self::InsufficientCash {
                required_micros,
                available_micros,
            } => write!(
                f,
                "insufficient cash: required {required_micros} micros, available {available_micros}"
            ),
            Self::NoPosition { symbol } => write!(f, "no open position in {symbol}"),
            Self::InsufficientQuantity {
                symbol,
                held,
                requested,
            } => write!(
                f,
                "insufficient quantity in {symbol}: held {held}, requested {requested}"
            ),
        }
    }
}

impl std::error::Error for LedgerError {}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Cash + positions book owned by exactly one strategy instance.
#[derive(Clone, Debug)]
pub struct Ledger {
    state: PortfolioState,
    fills: Vec<Fill>,
    history: Vec<TradeLog>,
    next_trade_id: u64,
}

impl Ledger {
    /// Create a new ledger with the given initial cash balance.
    pub fn new(initial_cash_micros: i64) -> Self {
        debug_assert!(initial_cash_micros >= 0);
        Self {
            state: PortfolioState::new(initial_cash_micros),
            fills: Vec::new(),
            history: Vec::new(),
            next_trade_id: 1,
        }
    }

    // -----------------------------------------------------------------------
    // Write surface
    // -----------------------------------------------------------------------

    /// Buy `qty` shares at `price_micros`, averaging into any open holding.
    ///
    /// # Errors
    /// [`LedgerError::InsufficientCash`] if `qty × price > cash`, or a shape
    /// error. The ledger is **not** mutated on error.
    pub fn buy(&mut self, symbol: &str, qty: i64, price_micros: i64) -> Result<(), LedgerError> {
        Self::validate_shape(symbol, qty, price_micros)?;

        let cost = notional_micros(qty, price_micros);
        if cost > self.state.cash_micros {
            return Err(LedgerError::InsufficientCash {
                required_micros: cost,
                available_micros: self.state.cash_micros,
            });
        }

        self.record_fill(Fill::new(symbol, Side::Buy, qty, price_micros));
        Ok(())
    }

    /// Sell `qty` shares of an open holding at `price_micros`.
    ///
    /// # Errors
    /// [`LedgerError::NoPosition`] / [`LedgerError::InsufficientQuantity`] when
    /// the holding cannot cover the sale, or a shape error. The ledger is
    /// **not** mutated on error.
    pub fn sell(&mut self, symbol: &str, qty: i64, price_micros: i64) -> Result<(), LedgerError> {
        Self::validate_shape(symbol, qty, price_micros)?;

        let held = match self.state.holdings.get(symbol) {
            Some(h) => h.quantity,
            None => {
                return Err(LedgerError::NoPosition {
                    symbol: symbol.to_string(),
                })
            }
        };
        if held < qty {
            return Err(LedgerError::InsufficientQuantity {
                symbol: symbol.to_string(),
                held,
                requested: qty,
            });
        }

        self.record_fill(Fill::new(symbol, Side::Sell, qty, price_micros));
        Ok(())
    }

    /// Append one immutable trade record capturing the post-trade account.
    ///
    /// Ids are monotonic, starting at 1. Durable persistence is the caller's
    /// concern; the returned record is the one stored in history.
    pub fn log_trade(
        &mut self,
        date: NaiveDate,
        action: TradeAction,
        marks: &MarkMap,
        reasoning: Option<String>,
    ) -> TradeLog {
        let account = self.account_state(marks);
        let entry = TradeLog {
            date,
            id: self.next_trade_id,
            this_action: action,
            positions: account.positions,
            portfolio_value_micros: account.portfolio_value_micros,
            pnl_micros: account.total_pnl_micros,
            reasoning,
        };
        self.next_trade_id += 1;
        self.history.push(entry.clone());
        entry
    }

    /// Restore the initial cash and clear positions, journal and history.
    ///
    /// Only for starting a fresh simulation run.
    pub fn reset(&mut self) {
        self.state = PortfolioState::new(self.state.initial_cash_micros);
        self.fills.clear();
        self.history.clear();
        self.next_trade_id = 1;
    }

    // -----------------------------------------------------------------------
    // Read surface
    // -----------------------------------------------------------------------

    /// Derived account view at the supplied prices.
    ///
    /// Symbols missing from `marks` are valued at their average price.
    pub fn account_state(&self, marks: &MarkMap) -> AccountState {
        let portfolio_value =
            compute_portfolio_value_micros(self.state.cash_micros, &self.state.holdings, marks);
        AccountState {
            cash_micros: self.state.cash_micros,
            positions: self
                .state
                .holdings
                .iter()
                .map(|(s, h)| (s.clone(), h.quantity))
                .collect(),
            portfolio_value_micros: portfolio_value,
            buying_power_micros: self.state.cash_micros,
            total_pnl_micros: portfolio_value.saturating_sub(self.state.initial_cash_micros),
        }
    }

    /// Open positions with current price and unrealized PnL filled in.
    pub fn positions_marked(&self, marks: &MarkMap) -> Vec<Position> {
        self.state
            .holdings
            .values()
            .map(|h| mark_position(h, marks))
            .collect()
    }

    pub fn performance(&self, marks: &MarkMap) -> PerformanceMetrics {
        let account = self.account_state(marks);
        let initial = self.state.initial_cash_micros;
        let total_return_pct = if initial > 0 {
            account.total_pnl_micros as f64 / initial as f64 * 100.0
        } else {
            0.0
        };
        PerformanceMetrics {
            initial_cash_micros: initial,
            current_value_micros: account.portfolio_value_micros,
            total_return_pct,
            total_pnl_micros: account.total_pnl_micros,
            cash_micros: account.cash_micros,
            num_positions: self.state.holdings.len(),
            num_trades: self.history.len(),
        }
    }

    pub fn initial_cash_micros(&self) -> i64 {
        self.state.initial_cash_micros
    }

    /// Current cash balance in micros.
    pub fn cash_micros(&self) -> i64 {
        self.state.cash_micros
    }

    /// Accumulated realized PnL in micros.
    pub fn realized_pnl_micros(&self) -> i64 {
        self.state.realized_pnl_micros
    }

    pub fn unrealized_pnl_micros(&self, marks: &MarkMap) -> i64 {
        compute_unrealized_pnl_micros(&self.state.holdings, marks)
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.state.holdings.get(symbol)
    }

    /// Held quantity for a symbol (0 if not held).
    pub fn quantity(&self, symbol: &str) -> i64 {
        self.state
            .holdings
            .get(symbol)
            .map(|h| h.quantity)
            .unwrap_or(0)
    }

    /// `true` if no open positions exist.
    pub fn is_flat(&self) -> bool {
        self.state.holdings.is_empty()
    }

    pub fn history(&self) -> &[TradeLog] {
        &self.history
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    /// Replay the fill journal from initial cash and verify it matches the
    /// running incremental state. Returns `true` if consistent.
    ///
    /// O(n) replay; for tests, startup verification or audit flows.
    pub fn verify_integrity(&self) -> bool {
        recompute_from_fills(self.state.initial_cash_micros, &self.fills) == self.state
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn record_fill(&mut self, fill: Fill) {
        apply_fill(&mut self.state, &fill);
        self.fills.push(fill);
    }

    fn validate_shape(symbol: &str, qty: i64, price_micros: i64) -> Result<(), LedgerError> {
        if symbol.trim().is_empty() {
            return Err(LedgerError::EmptySymbol);
        }
        if qty <= 0 {
            return Err(LedgerError::NonPositiveQty { qty });
        }
        if price_micros <= 0 {
            return Err(LedgerError::NonPositivePrice { price_micros });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
