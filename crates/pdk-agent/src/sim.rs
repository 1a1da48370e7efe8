use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use futures_util::future::join_all;
use pdk_audit::AuditSink;
use pdk_config::{ResolvedSecrets, SimConfig, StrategyConfig};
use pdk_md::{MarketDataStore, MarketDay};
use pdk_oracle::{
    build_adapter, MultiProviderManager, OracleAdapter, ProviderConfig, ProviderKind,
    DEFAULT_CALL_CAP,
};
use pdk_portfolio::{micros_from_f64, MarkMap, PerformanceMetrics};
use pdk_schemas::TradingDecision;
use serde::Serialize;

use crate::agent::{AgentSettings, TradingAgent};
use crate::rag::{InMemoryRetrievalStore, RagSettings, RagTradingAgent, RetrievalStore};

/// A strategy as driven by the simulation.
pub enum SimAgent {
    Plain(TradingAgent),
    Rag(RagTradingAgent),
}

impl SimAgent {
    pub fn agent(&self) -> &TradingAgent {
        match self {
            SimAgent::Plain(a) => a,
            SimAgent::Rag(r) => r.agent(),
        }
    }

    pub fn strategy(&self) -> &str {
        self.agent().strategy()
    }

    pub async fn process_trading_day(&mut self, day: &MarketDay) -> TradingDecision {
        match self {
            SimAgent::Plain(a) => a.process_trading_day(day).await,
            SimAgent::Rag(r) => r.process_trading_day(day).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayResult {
    pub date: NaiveDate,
    /// Keyed by strategy signature.
    pub decisions: BTreeMap<String, TradingDecision>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub days: Vec<DayResult>,
    /// Final metrics per strategy, marked at the last day's closes.
    pub performance: BTreeMap<String, PerformanceMetrics>,
}

/// N independent strategies over one shared, read-only market data store.
pub struct Simulation {
    agents: Vec<SimAgent>,
    data: MarketDataStore,
    history_days: usize,
}

impl Simulation {
    pub fn new(data: MarketDataStore, history_days: usize) -> Self {
        Self {
            agents: Vec::new(),
            data,
            history_days,
        }
    }

    /// # Errors
    /// A strategy with the same signature is already registered.
    pub fn add_agent(&mut self, agent: SimAgent) -> Result<()> {
        if self.agents.iter().any(|a| a.strategy() == agent.strategy()) {
            bail!("duplicate strategy signature '{}'", agent.strategy());
        }
        self.agents.push(agent);
        Ok(())
    }

    pub fn strategies(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.strategy().to_string()).collect()
    }

    pub fn agents(&self) -> &[SimAgent] {
        &self.agents
    }

    pub fn data(&self) -> &MarketDataStore {
        &self.data
    }

    /// Build one agent per enabled strategy, using real provider backends.
    pub fn from_config(
        cfg: &SimConfig,
        secrets: &ResolvedSecrets,
        data: MarketDataStore,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self> {
        let manager = build_manager(cfg, secrets)?;
        let mut adapters = Vec::with_capacity(manager.len());
        for sig in cfg.enabled_strategies().map(|s| s.signature.as_str()) {
            let adapter = manager
                .get(sig)
                .ok_or_else(|| anyhow!("adapter for '{sig}' was not registered"))?;
            adapters.push(adapter);
        }
        Self::from_adapters(cfg, adapters, data, audit)
    }

    /// Build agents around already-constructed adapters. Each adapter's
    /// signature must name an enabled strategy in `cfg`.
    pub fn from_adapters(
        cfg: &SimConfig,
        adapters: Vec<Arc<dyn OracleAdapter>>,
        data: MarketDataStore,
        audit: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self> {
        let rag_store: Option<Arc<dyn RetrievalStore>> = cfg
            .rag
            .enabled
            .then(|| Arc::new(InMemoryRetrievalStore::new()) as Arc<dyn RetrievalStore>);

        let mut sim = Self::new(data, cfg.run.history_days);
        for (i, adapter) in adapters.into_iter().enumerate() {
            let sig = adapter.signature().to_string();
            let strategy = cfg
                .enabled_strategies()
                .find(|s| s.signature == sig)
                .ok_or_else(|| anyhow!("no enabled strategy named '{sig}'"))?;

            let settings = agent_settings(cfg, strategy)?;
            let mut agent = TradingAgent::new(adapter, settings)
                .with_context(|| format!("strategy '{sig}'"))?;
            if let Some(sink) = &audit {
                agent = agent.with_audit(Arc::clone(sink));
            }

            let agent = match &rag_store {
                Some(store) => SimAgent::Rag(RagTradingAgent::new(
                    agent,
                    Arc::clone(store),
                    RagSettings {
                        sample_probability: cfg.rag.sample_probability,
                        top_k: cfg.rag.top_k,
                        seed: cfg.rag.seed.wrapping_add(i as u64),
                    },
                )),
                None => SimAgent::Plain(agent),
            };
            sim.add_agent(agent)?;
        }
        Ok(sim)
    }

    /// Run every strategy over each trading date in `[start, end]`.
    ///
    /// Strategies run concurrently within a day; days run in order.
    pub async fn run(&mut self, start: NaiveDate, end: NaiveDate) -> SimulationReport {
        let dates = self.data.trading_dates(start, end);
        tracing::info!(
            %start,
            %end,
            days = dates.len(),
            strategies = self.agents.len(),
            "simulation started"
        );

        let mut days = Vec::with_capacity(dates.len());
        let mut last_marks = MarkMap::new();
        for date in dates {
            let day = self.data.day(date, self.history_days);
            let day_ref = &day;
            let calls = self.agents.iter_mut().map(|a| async move {
                let decision = a.process_trading_day(day_ref).await;
                (a.strategy().to_string(), decision)
            });
            let decisions: BTreeMap<String, TradingDecision> =
                join_all(calls).await.into_iter().collect();

            let executed: usize = decisions.values().map(|d| d.orders.len()).sum();
            tracing::info!(%date, executed, "trading day done");
            last_marks.extend(day.closes());
            days.push(DayResult { date, decisions });
        }

        let performance = self
            .agents
            .iter()
            .map(|a| (a.strategy().to_string(), a.agent().performance(&last_marks)))
            .collect();
        SimulationReport { days, performance }
    }

    /// Run over the configured window, defaulting to the data's full range.
    pub async fn run_window(
        &mut self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<SimulationReport> {
        let (first, last) = self
            .data
            .date_range()
            .ok_or_else(|| anyhow!("no market data loaded"))?;
        let start = start.unwrap_or(first);
        let end = end.unwrap_or(last);
        if start > end {
            bail!("start {start} is after end {end}");
        }
        Ok(self.run(start, end).await)
    }
}

/// Run-level settings for one strategy's agent. The oracle timeout is the
/// strategy's `timeout_secs`, never more than [`DEFAULT_CALL_CAP`].
pub fn agent_settings(cfg: &SimConfig, strategy: &StrategyConfig) -> Result<AgentSettings> {
    let initial_cash_micros = micros_from_f64(cfg.run.initial_cash)
        .filter(|m| *m > 0)
        .ok_or_else(|| anyhow!("run.initial_cash {} is not a usable amount", cfg.run.initial_cash))?;
    Ok(AgentSettings {
        initial_cash_micros,
        risk: cfg.risk.clone(),
        market_rules: cfg.market_rules.clone(),
        mode: cfg.run.mode,
        instructions: cfg.run.instructions.clone(),
        goal: cfg.run.goal.clone(),
        oracle_timeout: Duration::from_secs(strategy.timeout_secs).min(DEFAULT_CALL_CAP),
    })
}

/// Provider settings for every enabled strategy, keys attached.
pub fn provider_configs(cfg: &SimConfig, secrets: &ResolvedSecrets) -> Result<Vec<ProviderConfig>> {
    let mut out = Vec::new();
    for s in cfg.enabled_strategies() {
        let kind = ProviderKind::parse(&s.provider)
            .with_context(|| format!("strategy '{}'", s.signature))?;
        let mut pc = ProviderConfig::new(&s.signature, kind, &s.model)
            .with_timeout(Duration::from_secs(s.timeout_secs));
        pc.temperature = s.temperature;
        pc.max_tokens = s.max_tokens;
        if let Some(key) = secrets.api_key(&s.signature) {
            pc = pc.with_api_key(key);
        }
        if let Some(url) = s.base_url.as_deref().filter(|u| !u.trim().is_empty()) {
            pc = pc.with_base_url(url);
        }
        out.push(pc);
    }
    Ok(out)
}

/// One registered adapter per enabled strategy.
pub fn build_manager(cfg: &SimConfig, secrets: &ResolvedSecrets) -> Result<MultiProviderManager> {
    let mut manager = MultiProviderManager::new();
    for pc in provider_configs(cfg, secrets)? {
        let sig = pc.signature.clone();
        let adapter = build_adapter(pc).with_context(|| format!("build adapter '{sig}'"))?;
        manager
            .register(adapter)
            .with_context(|| format!("register adapter '{sig}'"))?;
    }
    Ok(manager)
}
