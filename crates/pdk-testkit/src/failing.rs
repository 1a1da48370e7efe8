use anyhow::{bail, Result};
use chrono::NaiveDate;
use pdk_agent::RetrievalStore;
use pdk_audit::AuditSink;
use pdk_md::MarketDay;
use pdk_portfolio::TradeLog;
use pdk_schemas::{PastTrade, ScenarioMatch, TradingDecision};

/// Audit sink whose disk is always full.
#[derive(Debug, Default)]
pub struct FailingAuditSink;

impl AuditSink for FailingAuditSink {
    fn record_run_started(&self, _: &str, _: &[String]) -> Result<()> {
        bail!("audit disk full")
    }

    fn record_trade(&self, _: &str, _: &TradeLog) -> Result<()> {
        bail!("audit disk full")
    }

    fn record_decision(&self, _: &str, _: NaiveDate, _: &TradingDecision) -> Result<()> {
        bail!("audit disk full")
    }
}

/// Retrieval store that is never reachable.
#[derive(Debug, Default)]
pub struct FailingRetrievalStore;

#[async_trait::async_trait]
impl RetrievalStore for FailingRetrievalStore {
    async fn similar_scenarios(
        &self,
        _: &str,
        _: &str,
        _: usize,
        _: NaiveDate,
    ) -> Result<Vec<ScenarioMatch>> {
        bail!("vector store unreachable")
    }

    async fn past_trades(&self, _: &str, _: &[String]) -> Result<Vec<PastTrade>> {
        bail!("vector store unreachable")
    }

    async fn store_market_day(&self, _: &str, _: &MarketDay) -> Result<()> {
        bail!("vector store unreachable")
    }

    async fn store_scenario(&self, _: &str, _: &str, _: NaiveDate, _: &str) -> Result<()> {
        bail!("vector store unreachable")
    }

    async fn store_trade(&self, _: &str, _: PastTrade) -> Result<()> {
        bail!("vector store unreachable")
    }
}
