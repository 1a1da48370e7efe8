//! Retrieval overlay.
//!
//! [`RagTradingAgent`] wraps a [`TradingAgent`] and attaches similar past
//! scenarios and the trades made on them to the oracle input. Every store
//! call is best-effort: a broken or empty store only makes the input poorer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use pdk_md::MarketDay;
use pdk_schemas::{PastTrade, RetrievedContext, ScenarioMatch, TradingDecision};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agent::TradingAgent;
use crate::best_effort;

/// Storage and similarity search for past trading days.
#[async_trait::async_trait]
pub trait RetrievalStore: Send + Sync {
    /// Up to `top_k` of `strategy`'s stored scenarios dated strictly before
    /// `before`, best match first.
    async fn similar_scenarios(
        &self,
        strategy: &str,
        text: &str,
        top_k: usize,
        before: NaiveDate,
    ) -> Result<Vec<ScenarioMatch>>;

    /// Trades `strategy` made on the given scenario keys.
    async fn past_trades(&self, strategy: &str, scenario_keys: &[String]) -> Result<Vec<PastTrade>>;

    async fn store_market_day(&self, strategy: &str, day: &MarketDay) -> Result<()>;

    async fn store_scenario(
        &self,
        strategy: &str,
        key: &str,
        date: NaiveDate,
        text: &str,
    ) -> Result<()>;

    async fn store_trade(&self, strategy: &str, trade: PastTrade) -> Result<()>;
}

const EMBED_DIMS: usize = 64;

/// Hashed bag-of-words: FNV-1a per lowercase alphanumeric token, folded
/// into a fixed number of buckets.
pub fn embed(text: &str) -> [f32; EMBED_DIMS] {
    let mut v = [0f32; EMBED_DIMS];
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in token.to_lowercase().bytes() {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        v[(h % EMBED_DIMS as u64) as usize] += 1.0;
    }
    v
}

pub fn cosine(a: &[f32; EMBED_DIMS], b: &[f32; EMBED_DIMS]) -> f64 {
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for i in 0..EMBED_DIMS {
        let (x, y) = (f64::from(a[i]), f64::from(b[i]));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

struct StoredScenario {
    owner: String,
    key: String,
    date: NaiveDate,
    text: String,
    embedding: [f32; EMBED_DIMS],
}

#[derive(Default)]
struct Inner {
    scenarios: Vec<StoredScenario>,
    trades: Vec<(String, PastTrade)>,
    days: BTreeMap<(String, NaiveDate), MarketDay>,
}

/// Process-local store for tests and offline runs.
#[derive(Default)]
pub struct InMemoryRetrievalStore {
    inner: Mutex<Inner>,
}

impl InMemoryRetrievalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenario_count(&self) -> usize {
        self.inner.lock().map(|i| i.scenarios.len()).unwrap_or(0)
    }

    pub fn trade_count(&self) -> usize {
        self.inner.lock().map(|i| i.trades.len()).unwrap_or(0)
    }

    pub fn market_day_count(&self) -> usize {
        self.inner.lock().map(|i| i.days.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("retrieval store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl RetrievalStore for InMemoryRetrievalStore {
    async fn similar_scenarios(
        &self,
        strategy: &str,
        text: &str,
        top_k: usize,
        before: NaiveDate,
    ) -> Result<Vec<ScenarioMatch>> {
        let query = embed(text);
        let inner = self.lock()?;
        let mut scored: Vec<ScenarioMatch> = inner
            .scenarios
            .iter()
            .filter(|s| s.owner == strategy && s.date < before)
            .map(|s| ScenarioMatch {
                key: s.key.clone(),
                date: s.date,
                summary: s.text.clone(),
                score: cosine(&query, &s.embedding),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.date.cmp(&a.date))
                .then_with(|| a.key.cmp(&b.key))
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn past_trades(&self, strategy: &str, scenario_keys: &[String]) -> Result<Vec<PastTrade>> {
        let inner = self.lock()?;
        Ok(inner
            .trades
            .iter()
            .filter(|(s, t)| s == strategy && scenario_keys.contains(&t.scenario_key))
            .map(|(_, t)| t.clone())
            .collect())
    }

    async fn store_market_day(&self, strategy: &str, day: &MarketDay) -> Result<()> {
        self.lock()?
            .days
            .insert((strategy.to_string(), day.date), day.clone());
        Ok(())
    }

    async fn store_scenario(
        &self,
        strategy: &str,
        key: &str,
        date: NaiveDate,
        text: &str,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        inner.scenarios.retain(|s| !(s.owner == strategy && s.key == key));
        inner.scenarios.push(StoredScenario {
            owner: strategy.to_string(),
            key: key.to_string(),
            date,
            text: text.to_string(),
            embedding: embed(text),
        });
        Ok(())
    }

    async fn store_trade(&self, strategy: &str, trade: PastTrade) -> Result<()> {
        self.lock()?.trades.push((strategy.to_string(), trade));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RagSettings {
    /// Chance that a day's scenario is stored for later retrieval.
    pub sample_probability: f64,
    pub top_k: usize,
    pub seed: u64,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            sample_probability: 0.3,
            top_k: 3,
            seed: 7,
        }
    }
}

/// A [`TradingAgent`] whose input is enriched from a [`RetrievalStore`].
pub struct RagTradingAgent {
    agent: TradingAgent,
    store: Arc<dyn RetrievalStore>,
    settings: RagSettings,
    rng: StdRng,
}

impl RagTradingAgent {
    pub fn new(agent: TradingAgent, store: Arc<dyn RetrievalStore>, settings: RagSettings) -> Self {
        let mut settings = settings;
        settings.sample_probability = if settings.sample_probability.is_finite() {
            settings.sample_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            rng: StdRng::seed_from_u64(settings.seed),
            agent,
            store,
            settings,
        }
    }

    pub fn agent(&self) -> &TradingAgent {
        &self.agent
    }

    pub fn into_agent(self) -> TradingAgent {
        self.agent
    }

    pub fn scenario_key(strategy: &str, date: NaiveDate) -> String {
        format!("{strategy}:{date}")
    }

    pub async fn process_trading_day(&mut self, day: &MarketDay) -> TradingDecision {
        let strategy = self.agent.strategy().to_string();
        let date = day.date;
        let key = Self::scenario_key(&strategy, date);
        let text = day.scenario_text();

        let similar = best_effort(
            "rag similar scenarios",
            &strategy,
            self.store
                .similar_scenarios(&strategy, &text, self.settings.top_k, date)
                .await,
        )
        .unwrap_or_default();

        let keys: Vec<String> = similar.iter().map(|s| s.key.clone()).collect();
        let past_trades = if keys.is_empty() {
            Vec::new()
        } else {
            best_effort(
                "rag past trades",
                &strategy,
                self.store.past_trades(&strategy, &keys).await,
            )
            .unwrap_or_default()
        };

        best_effort(
            "rag store market day",
            &strategy,
            self.store.store_market_day(&strategy, day).await,
        );
        if self.rng.random_bool(self.settings.sample_probability) {
            best_effort(
                "rag store scenario",
                &strategy,
                self.store.store_scenario(&strategy, &key, date, &text).await,
            );
        }

        tracing::debug!(
            strategy = %strategy,
            %date,
            similar = similar.len(),
            past_trades = past_trades.len(),
            "retrieved context"
        );
        let context = RetrievedContext {
            similar_scenarios: similar,
            past_trades,
        };
        let decision = self
            .agent
            .process_trading_day_with_context(day, Some(context))
            .await;

        for o in &decision.orders {
            let trade = PastTrade {
                scenario_key: key.clone(),
                date,
                action: o.action.as_str().to_string(),
                symbol: o.symbol.clone(),
                quantity: o.quantity,
                price: o.estimated_execution_price.unwrap_or_default(),
                rationale: o.rationale.clone(),
            };
            best_effort(
                "rag store trade",
                &strategy,
                self.store.store_trade(&strategy, trade).await,
            );
        }

        decision
    }
}
