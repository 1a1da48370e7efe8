use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use pdk_audit::AuditSink;
use pdk_md::MarketDay;
use pdk_oracle::{OracleAdapter, OracleError, DEFAULT_CALL_CAP};
use pdk_portfolio::{
    micros_to_f64, notional_micros, AccountState, Ledger, LedgerError, MarkMap,
    PerformanceMetrics, Side, TradeAction, MICROS_SCALE,
};
use pdk_risk::{
    execution_price_micros, screen_order, tick_size_micros, validate_order, DailyTradeCounter,
    LimitsError, ReasonCode, RiskLimits, Validation,
};
use pdk_schemas::{
    AccountSnapshot, AgentInput, AgentMode, MarketRules, Order, OrderAction, PortfolioUpdates,
    PositionUpdate, RetrievedContext, RiskConfig, TradingDecision,
};

use crate::best_effort;
use crate::phase::AgentPhase;
use crate::prompt::SYSTEM_PROMPT;

/// Summary of the empty decision returned when the day's input is unusable.
pub const INPUT_ERROR_SUMMARY: &str = "input_error";

/// Summary of the empty decision returned when the oracle call fails.
pub const GENERATION_FAILED_SUMMARY: &str = "LLM generation failed";

/// Per-run settings shared by every day of one strategy.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub initial_cash_micros: i64,
    pub risk: RiskConfig,
    pub market_rules: MarketRules,
    pub mode: AgentMode,
    pub instructions: String,
    pub goal: String,
    pub oracle_timeout: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            initial_cash_micros: 100_000 * MICROS_SCALE,
            risk: RiskConfig::default(),
            market_rules: MarketRules::default(),
            mode: AgentMode::Backtest,
            instructions: String::new(),
            goal: String::new(),
            oracle_timeout: DEFAULT_CALL_CAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentError {
    Limits(LimitsError),
    InvalidInitialCash(i64),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::Limits(e) => write!(f, "{e}"),
            AgentError::InvalidInitialCash(m) => {
                write!(f, "initial cash must be > 0, got {m} micros")
            }
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Limits(e) => Some(e),
            AgentError::InvalidInitialCash(_) => None,
        }
    }
}

impl From<LimitsError> for AgentError {
    fn from(e: LimitsError) -> Self {
        AgentError::Limits(e)
    }
}

/// One strategy: an oracle, its own ledger, and the risk gate in between.
///
/// Per day: build input -> ask the oracle -> screen, validate and execute each
/// proposed order in oracle order -> recompute the portfolio summary. Every
/// path ends in a well-formed [`TradingDecision`].
pub struct TradingAgent {
    strategy: String,
    oracle: Arc<dyn OracleAdapter>,
    settings: AgentSettings,
    limits: RiskLimits,
    ledger: Ledger,
    counter: DailyTradeCounter,
    phase: AgentPhase,
    audit: Option<Arc<dyn AuditSink>>,
}

impl TradingAgent {
    /// # Errors
    /// Risk fractions out of range, margin requested, or non-positive cash.
    pub fn new(oracle: Arc<dyn OracleAdapter>, settings: AgentSettings) -> Result<Self, AgentError> {
        if settings.initial_cash_micros <= 0 {
            return Err(AgentError::InvalidInitialCash(settings.initial_cash_micros));
        }
        let limits = RiskLimits::try_from(&settings.risk)?;
        Ok(Self {
            strategy: oracle.signature().to_string(),
            ledger: Ledger::new(settings.initial_cash_micros),
            oracle,
            settings,
            limits,
            counter: DailyTradeCounter::new(),
            phase: AgentPhase::Idle,
            audit: None,
        })
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn daily_trade_count(&self) -> u32 {
        self.counter.count()
    }

    pub fn last_processed_date(&self) -> Option<NaiveDate> {
        self.counter.last_processed_date()
    }

    pub fn account_snapshot(&self, prices: &MarkMap) -> AccountSnapshot {
        snapshot(&self.ledger.account_state(prices))
    }

    pub fn performance(&self, prices: &MarkMap) -> PerformanceMetrics {
        self.ledger.performance(prices)
    }

    pub async fn process_trading_day(&mut self, day: &MarketDay) -> TradingDecision {
        self.process_trading_day_with_context(day, None).await
    }

    /// Same as [`Self::process_trading_day`], with retrieved context attached
    /// to the oracle input.
    ///
    /// Not idempotent: a repeated date trades against the advanced ledger.
    pub async fn process_trading_day_with_context(
        &mut self,
        day: &MarketDay,
        context: Option<RetrievedContext>,
    ) -> TradingDecision {
        let date = day.date;
        let timestamp = date.to_string();
        self.enter(AgentPhase::BuildingInput, date);

        if self.counter.tick(date) {
            tracing::debug!(strategy = %self.strategy, %date, "daily trade count reset");
        }
        let prices = day.closes();

        let input = match self.build_input(day, &prices, context) {
            Ok(i) => i,
            Err(reason) => {
                tracing::warn!(strategy = %self.strategy, %date, %reason, "input error");
                let decision = TradingDecision::empty(timestamp, INPUT_ERROR_SUMMARY);
                return self.finish(decision, date, &prices, AgentPhase::Failed);
            }
        };

        self.enter(AgentPhase::AwaitingDecision, date);
        let mut decision = match self.ask_oracle(&input).await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(
                    strategy = %self.strategy,
                    %date,
                    kind = e.kind(),
                    error = %e,
                    "decision generation failed"
                );
                let mut d = TradingDecision::empty(timestamp, GENERATION_FAILED_SUMMARY);
                d.diagnostics
                    .rule_violations
                    .push(format!("{}: {e}", e.kind()));
                return self.finish(d, date, &prices, AgentPhase::Failed);
            }
        };

        let proposed = std::mem::take(&mut decision.orders);
        let mut validated = Vec::with_capacity(proposed.len());
        for order in &proposed {
            self.enter(AgentPhase::ValidatingOrders, date);
            if self.counter.limit_reached(self.limits.max_daily_trades) {
                tracing::info!(
                    strategy = %self.strategy,
                    %date,
                    count = self.counter.count(),
                    "daily trade budget exhausted"
                );
                decision
                    .diagnostics
                    .rule_violations
                    .push(ReasonCode::MaxDailyTradesExceeded.as_str().to_string());
                break;
            }

            let side = match order.action {
                OrderAction::Buy => Side::Buy,
                OrderAction::Sell => Side::Sell,
                OrderAction::Hold => continue,
            };

            match self.execute_order(date, order, side, &prices) {
                Ok(filled) => validated.push(filled),
                Err(reason) => {
                    tracing::info!(
                        strategy = %self.strategy,
                        %date,
                        symbol = %order.symbol,
                        %reason,
                        "order rejected"
                    );
                    decision
                        .diagnostics
                        .rule_violations
                        .push(reason.as_str().to_string());
                }
            }
        }

        decision.orders = validated;
        decision.timestamp = timestamp;
        self.finish(decision, date, &prices, AgentPhase::Done)
    }

    async fn ask_oracle(&self, input: &AgentInput) -> Result<TradingDecision, OracleError> {
        let timeout = self.settings.oracle_timeout;
        match tokio::time::timeout(timeout, self.oracle.generate_decision(SYSTEM_PROMPT, input))
            .await
        {
            Ok(res) => res,
            Err(_) => Err(OracleError::Timeout { after: timeout }),
        }
    }

    fn build_input(
        &self,
        day: &MarketDay,
        prices: &MarkMap,
        context: Option<RetrievedContext>,
    ) -> Result<AgentInput, String> {
        if day.symbols.is_empty() {
            return Err("no tickers".to_string());
        }
        for (sym, d) in &day.symbols {
            if d.latest.date > day.date {
                return Err(format!("{sym}: latest bar {} is after {}", d.latest.date, day.date));
            }
        }
        if let Some((sym, px)) = prices.iter().find(|(_, px)| **px <= 0) {
            return Err(format!("{sym}: non-positive close {px}"));
        }

        let tickers = day.tickers();
        let mut rules = self.settings.market_rules.clone();
        for sym in &tickers {
            rules.lot_size.entry(sym.clone()).or_insert(1);
            let tick = micros_to_f64(tick_size_micros(&self.settings.market_rules, sym));
            rules.tick_size.entry(sym.clone()).or_insert(tick);
        }

        Ok(AgentInput {
            mode: self.settings.mode,
            timestamp: day.date.to_string(),
            tickers,
            market_data: day.market_data(),
            news: day.news.clone(),
            fundamentals: day.fundamentals.clone(),
            account: self.account_snapshot(prices),
            market_rules: rules,
            risk_config: self.settings.risk.clone(),
            instructions: self.settings.instructions.clone(),
            goal: self.settings.goal.clone(),
            retrieved_context: context.filter(|c| !c.is_empty()),
        })
    }

    /// Screen, price at the day's close plus slippage, validate that fill
    /// against the current book, then apply it. The ledger is touched only
    /// when every check passed.
    fn execute_order(
        &mut self,
        date: NaiveDate,
        order: &Order,
        side: Side,
        prices: &MarkMap,
    ) -> Result<Order, ReasonCode> {
        let close = *prices
            .get(&order.symbol)
            .ok_or(ReasonCode::UnknownSymbol)?;
        let mut checked = screen_order(order, close, &self.settings.market_rules)?;
        let fill_px = execution_price_micros(
            checked.action,
            checked.price_micros,
            self.limits.slippage,
            &self.settings.market_rules,
            &checked.symbol,
        );
        // Limits hold for what actually executes.
        checked.price_micros = fill_px;

        let account = self.ledger.account_state(prices);
        if let Validation::Invalid(reason) = validate_order(&account, &checked, &self.limits) {
            return Err(reason);
        }

        self.enter(AgentPhase::Applying, date);
        let res = match side {
            Side::Buy => self.ledger.buy(&checked.symbol, checked.qty, fill_px),
            Side::Sell => self.ledger.sell(&checked.symbol, checked.qty, fill_px),
        };
        res.map_err(|e| ledger_reason(&e))?;
        self.counter.record();

        let reasoning = Some(order.rationale.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        let log = self.ledger.log_trade(
            date,
            TradeAction {
                action: side,
                symbol: checked.symbol.clone(),
                amount: checked.qty,
                price_micros: fill_px,
            },
            prices,
            reasoning,
        );
        if let Some(sink) = &self.audit {
            best_effort("audit trade", &self.strategy, sink.record_trade(&self.strategy, &log));
        }

        tracing::info!(
            strategy = %self.strategy,
            %date,
            symbol = %checked.symbol,
            side = side.as_str(),
            qty = checked.qty,
            price = micros_to_f64(fill_px),
            trade_id = log.id,
            "order executed"
        );

        let mut filled = order.clone();
        filled.estimated_execution_price = Some(micros_to_f64(fill_px));
        filled.notional = Some(micros_to_f64(notional_micros(checked.qty, fill_px)));
        Ok(filled)
    }

    fn finish(
        &mut self,
        mut decision: TradingDecision,
        date: NaiveDate,
        prices: &MarkMap,
        end: AgentPhase,
    ) -> TradingDecision {
        decision.portfolio_updates = Some(self.portfolio_updates(prices));
        if let Some(sink) = &self.audit {
            best_effort(
                "audit decision",
                &self.strategy,
                sink.record_decision(&self.strategy, date, &decision),
            );
        }
        self.enter(end, date);
        decision
    }

    fn portfolio_updates(&self, prices: &MarkMap) -> PortfolioUpdates {
        let account = self.ledger.account_state(prices);
        let positions: BTreeMap<String, PositionUpdate> = self
            .ledger
            .positions_marked(prices)
            .into_iter()
            .map(|p| {
                (
                    p.symbol,
                    PositionUpdate {
                        quantity: p.quantity,
                        avg_price: micros_to_f64(p.avg_price_micros),
                        current_price: micros_to_f64(p.current_price_micros),
                        unrealized_pnl: micros_to_f64(p.unrealized_pnl_micros),
                        realized_pnl: micros_to_f64(p.realized_pnl_micros),
                    },
                )
            })
            .collect();
        PortfolioUpdates {
            cash: micros_to_f64(account.cash_micros),
            positions,
            portfolio_value: micros_to_f64(account.portfolio_value_micros),
            total_pnl: micros_to_f64(account.total_pnl_micros),
            realized_pnl: micros_to_f64(self.ledger.realized_pnl_micros()),
        }
    }

    fn enter(&mut self, next: AgentPhase, date: NaiveDate) {
        if self.phase == next {
            return;
        }
        tracing::debug!(
            strategy = %self.strategy,
            %date,
            from = self.phase.as_str(),
            to = next.as_str(),
            "phase"
        );
        self.phase = next;
    }
}

fn snapshot(a: &AccountState) -> AccountSnapshot {
    AccountSnapshot {
        cash: micros_to_f64(a.cash_micros),
        positions: a.positions.clone(),
        portfolio_value: micros_to_f64(a.portfolio_value_micros),
        buying_power: micros_to_f64(a.buying_power_micros),
        total_pnl: micros_to_f64(a.total_pnl_micros),
    }
}

fn ledger_reason(e: &LedgerError) -> ReasonCode {
    match e {
        LedgerError::InsufficientCash { .. } => ReasonCode::InsufficientCash,
        LedgerError::NoPosition { .. } | LedgerError::InsufficientQuantity { .. } => {
            ReasonCode::InsufficientPosition
        }
        LedgerError::EmptySymbol => ReasonCode::UnknownSymbol,
        LedgerError::NonPositiveQty { .. } => ReasonCode::InvalidQuantity,
        LedgerError::NonPositivePrice { .. } => ReasonCode::InvalidPrice,
    }
}
