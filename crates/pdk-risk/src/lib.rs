//! pdk-risk
//!
//! Risk gate between a proposed order and the ledger.
//! - Structural screening (quantity, price, confidence, lot size, circuit band,
//!   limit/stop trigger against the close)
//! - Limit validation (cash, order value, position %, exposure, cash reserve)
//! - Daily trade budget with date rollover
//! - Adverse slippage and tick rounding of the fill price
//!
//! Deterministic, pure logic. No IO, no time, no oracle calls.
//! All comparisons are integer (micros and basis points).

mod counter;
mod engine;
mod slippage;
mod types;

pub use counter::DailyTradeCounter;
pub use engine::{screen_order, validate_order};
pub use slippage::{apply_slippage, execution_price_micros, round_to_tick, tick_size_micros};
pub use types::*;
