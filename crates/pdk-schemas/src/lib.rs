//! pdk-schemas
//!
//! Wire types of the decision protocol: what the oracle sees
//! ([`AgentInput`]) and what it must answer ([`TradingDecision`]), plus the
//! tolerant parser that pulls a decision out of raw model text.
//!
//! Wire money is plain decimal (`f64`); conversion to fixed-point micros
//! happens at the risk/ledger boundary.

mod decision;
mod input;
mod market;
mod parse;

pub use decision::{
    ConstraintsChecked, Diagnostics, Order, OrderAction, OrderType, PortfolioUpdates,
    PositionUpdate, Signal, SignalValue, TradingDecision,
};
pub use input::{
    AccountSnapshot, AgentInput, AgentMode, PastTrade, RetrievedContext, ScenarioMatch,
    SymbolData,
};
pub use market::{
    Candle, Fundamentals, MarketRules, NewsItem, RiskConfig, SlippageKind, SlippageModel,
    TradingHours,
};
pub use parse::{
    missing_envelope_keys, parse_decision, parse_decision_with_strategy, ParseError,
    ParseStrategy,
};
