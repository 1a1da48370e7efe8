use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use pdk_portfolio::TradeLog;
use pdk_schemas::TradingDecision;

use crate::AuditSink;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEntry {
    RunStarted {
        config_hash: String,
        strategies: Vec<String>,
    },
    Trade {
        strategy: String,
        log: TradeLog,
    },
    Decision {
        strategy: String,
        date: NaiveDate,
        decision: TradingDecision,
    },
}

/// Keeps every record in memory, in append order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<RecordedEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<RecordedEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn trades(&self, strategy: &str) -> Vec<TradeLog> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEntry::Trade { strategy: s, log } if s == strategy => Some(log),
                _ => None,
            })
            .collect()
    }

    pub fn decisions(&self, strategy: &str) -> Vec<(NaiveDate, TradingDecision)> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEntry::Decision {
                    strategy: s,
                    date,
                    decision,
                } if s == strategy => Some((date, decision)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, entry: RecordedEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory audit sink lock poisoned"))?
            .push(entry);
        Ok(())
    }
}

impl AuditSink for MemoryAuditSink {
    fn record_run_started(&self, config_hash: &str, strategies: &[String]) -> Result<()> {
        self.push(RecordedEntry::RunStarted {
            config_hash: config_hash.to_string(),
            strategies: strategies.to_vec(),
        })
    }

    fn record_trade(&self, strategy: &str, log: &TradeLog) -> Result<()> {
        self.push(RecordedEntry::Trade {
            strategy: strategy.to_string(),
            log: log.clone(),
        })
    }

    fn record_decision(
        &self,
        strategy: &str,
        date: NaiveDate,
        decision: &TradingDecision,
    ) -> Result<()> {
        self.push(RecordedEntry::Decision {
            strategy: strategy.to_string(),
            date,
            decision: decision.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_by_strategy() {
        let sink = MemoryAuditSink::new();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        sink.record_decision("a", date, &TradingDecision::empty("2024-03-01", "hold"))
            .unwrap();
        sink.record_decision("b", date, &TradingDecision::empty("2024-03-01", "x"))
            .unwrap();

        let a = sink.decisions("a");
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].1.diagnostics.summary, "hold");
        assert!(sink.trades("a").is_empty());
        assert_eq!(sink.entries().len(), 2);
    }
}
