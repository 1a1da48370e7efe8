//! pdk-audit
//!
//! Durable, append-only trail of what each strategy did: one record per
//! executed trade and one per returned decision, plus a run header carrying
//! the config hash. The JSONL sink can chain SHA-256 hashes so that edits,
//! deletions and reorderings are detectable after the fact.

mod chain;
mod memory;

pub use chain::{compute_record_hash, verify_hash_chain, verify_hash_chain_str, VerifyResult};
pub use memory::{MemoryAuditSink, RecordedEntry};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use pdk_portfolio::TradeLog;
use pdk_schemas::TradingDecision;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Destination for audit records. Shared by every strategy in a run.
///
/// Callers treat failures as non-fatal: a sink error is logged and the
/// trading day continues.
pub trait AuditSink: Send + Sync {
    fn record_run_started(&self, config_hash: &str, strategies: &[String]) -> Result<()>;

    fn record_trade(&self, strategy: &str, log: &TradeLog) -> Result<()>;

    fn record_decision(
        &self,
        strategy: &str,
        date: NaiveDate,
        decision: &TradingDecision,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    RunStarted,
    Trade,
    Decision,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::RunStarted => "run_started",
            RecordKind::Trade => "trade",
            RecordKind::Decision => "decision",
        }
    }
}

/// One JSON line in the audit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub seq: u64,
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub kind: RecordKind,
    pub strategy: Option<String>,
    pub date: Option<NaiveDate>,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

struct ChainState {
    last_hash: Option<String>,
    seq: u64,
}

/// JSON Lines file sink with an optional hash chain.
///
/// Opening an existing file resumes its chain: the next record links to the
/// last line already on disk and continues its sequence.
pub struct JsonlAuditSink {
    path: PathBuf,
    run_id: Uuid,
    hash_chain: bool,
    state: Mutex<ChainState>,
}

impl JsonlAuditSink {
    pub fn open(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {parent:?}"))?;
        }

        let (last_hash, seq) = match fs::read_to_string(&path) {
            Ok(content) => resume_point(&content)
                .with_context(|| format!("resume audit log {path:?}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (None, 0),
            Err(e) => return Err(e).with_context(|| format!("read audit log {path:?}")),
        };

        let run_id = Uuid::new_v4();
        tracing::info!(path = %path.display(), %run_id, seq, hash_chain, "audit sink opened");
        Ok(Self {
            path,
            run_id,
            hash_chain,
            state: Mutex::new(ChainState { last_hash, seq }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Number of records in the file, including ones from earlier runs.
    pub fn seq(&self) -> u64 {
        self.state.lock().map(|s| s.seq).unwrap_or_default()
    }

    fn append(
        &self,
        kind: RecordKind,
        strategy: Option<&str>,
        date: Option<NaiveDate>,
        payload: Value,
    ) -> Result<AuditRecord> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("audit sink lock poisoned"))?;

        let event_id = derive_event_id(state.last_hash.as_deref(), &payload, state.seq)?;
        let mut rec = AuditRecord {
            seq: state.seq,
            event_id,
            run_id: self.run_id,
            ts_utc: Utc::now(),
            kind,
            strategy: strategy.map(str::to_string),
            date,
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            rec.hash_prev = state.last_hash.clone();
            rec.hash_self = Some(compute_record_hash(&rec)?);
        }

        let line = chain::canonical_json_line(&rec)?;
        append_line(&self.path, &line)?;

        // Advance only once the line is on disk.
        state.seq += 1;
        if self.hash_chain {
            state.last_hash = rec.hash_self.clone();
        }
        Ok(rec)
    }
}

impl AuditSink for JsonlAuditSink {
    fn record_run_started(&self, config_hash: &str, strategies: &[String]) -> Result<()> {
        let payload = serde_json::json!({
            "config_hash": config_hash,
            "strategies": strategies,
        });
        self.append(RecordKind::RunStarted, None, None, payload)?;
        Ok(())
    }

    fn record_trade(&self, strategy: &str, log: &TradeLog) -> Result<()> {
        let payload = serde_json::to_value(log).context("serialize trade log failed")?;
        self.append(RecordKind::Trade, Some(strategy), Some(log.date), payload)?;
        Ok(())
    }

    fn record_decision(
        &self,
        strategy: &str,
        date: NaiveDate,
        decision: &TradingDecision,
    ) -> Result<()> {
        let payload = serde_json::to_value(decision).context("serialize decision failed")?;
        self.append(RecordKind::Decision, Some(strategy), Some(date), payload)?;
        Ok(())
    }
}

/// Deterministic id from chain position and payload, so replaying the same
/// run produces the same ids.
fn derive_event_id(last_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let body = serde_json::to_string(payload).context("serialize payload for event id")?;
    let name = format!("{}|{}|{}", last_hash.unwrap_or("genesis"), seq, body);
    Ok(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
}

fn resume_point(content: &str) -> Result<(Option<String>, u64)> {
    let Some(last) = content.lines().rev().find(|l| !l.trim().is_empty()) else {
        return Ok((None, 0));
    };
    let rec: AuditRecord = serde_json::from_str(last.trim()).context("parse last audit record")?;
    Ok((rec.hash_self, rec.seq + 1))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {path:?}"))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdk_portfolio::{Side, TradeAction};
    use std::collections::BTreeMap;

    fn trade(id: u64) -> TradeLog {
        TradeLog {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            id,
            this_action: TradeAction {
                action: Side::Buy,
                symbol: "TCS".to_string(),
                amount: 10,
                price_micros: 3_720_000_000,
            },
            positions: BTreeMap::from([("TCS".to_string(), 10)]),
            portfolio_value_micros: 100_000_000_000,
            pnl_micros: 0,
            reasoning: Some("momentum".to_string()),
        }
    }

    #[test]
    fn records_are_sequenced_and_keys_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/audit.jsonl");
        let sink = JsonlAuditSink::open(&path, true).unwrap();

        sink.record_run_started("abc123", &["s1".to_string()]).unwrap();
        sink.record_trade("s1", &trade(1)).unwrap();
        assert_eq!(sink.seq(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        let keys: Vec<&String> = first.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(first["kind"], "run_started");
        assert_eq!(first["payload"]["config_hash"], "abc123");

        let head: AuditRecord = serde_json::from_str(lines[0]).unwrap();
        let second: AuditRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.seq, 1);
        assert_eq!(second.kind, RecordKind::Trade);
        assert_eq!(second.strategy.as_deref(), Some("s1"));
        assert_eq!(second.date, Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(head.hash_self.is_some());
        assert_eq!(second.hash_prev, head.hash_self);
    }

    #[test]
    fn reopening_resumes_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        {
            let sink = JsonlAuditSink::open(&path, true).unwrap();
            sink.record_trade("s1", &trade(1)).unwrap();
            sink.record_trade("s1", &trade(2)).unwrap();
        }
        let sink = JsonlAuditSink::open(&path, true).unwrap();
        assert_eq!(sink.seq(), 2);
        sink.record_trade("s1", &trade(3)).unwrap();

        assert_eq!(
            verify_hash_chain(&path).unwrap(),
            VerifyResult::Valid { lines: 3 }
        );
    }

    #[test]
    fn event_ids_are_deterministic() {
        let p = serde_json::json!({"a": 1});
        let a = derive_event_id(Some("h"), &p, 3).unwrap();
        let b = derive_event_id(Some("h"), &p, 3).unwrap();
        let c = derive_event_id(Some("h"), &p, 4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn without_chain_hashes_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jsonl");
        let sink = JsonlAuditSink::open(&path, false).unwrap();
        sink.record_trade("s1", &trade(1)).unwrap();

        let rec: AuditRecord =
            serde_json::from_str(fs::read_to_string(&path).unwrap().trim()).unwrap();
        assert!(rec.hash_self.is_none());
        assert!(rec.hash_prev.is_none());
    }
}
