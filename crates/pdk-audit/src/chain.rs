use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::AuditRecord;

/// Compact JSON with object keys sorted at every depth.
pub(crate) fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit record failed")?;
    serde_json::to_string(&sort_keys(raw)).context("json stringify failed")
}

fn sort_keys(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// SHA-256 over the canonical form with `hash_self` cleared.
pub fn compute_record_hash(rec: &AuditRecord) -> Result<String> {
    let mut unsigned = rec.clone();
    unsigned.hash_self = None;
    let canonical = canonical_json_line(&unsigned)?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    /// First broken line (1-based) and what was wrong with it.
    Broken { line: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("read audit log {path:?}"))?;
    verify_hash_chain_str(&content)
}

/// Walk the chain: every `hash_prev` must equal the previous `hash_self`,
/// every `hash_self` must match a recomputation, and `seq` must increase by
/// exactly one per line.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut prev_seq: Option<u64> = None;
    let mut count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_no = i + 1;
        let rec: AuditRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit record at line {line_no}"))?;
        count += 1;

        if rec.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: line_no,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, rec.hash_prev
                ),
            });
        }

        if let Some(claimed) = &rec.hash_self {
            let recomputed = compute_record_hash(&rec)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: line_no,
                    reason: format!("hash_self mismatch: claimed {claimed}, recomputed {recomputed}"),
                });
            }
        }

        if let Some(p) = prev_seq {
            if rec.seq != p + 1 {
                return Ok(VerifyResult::Broken {
                    line: line_no,
                    reason: format!("seq gap: expected {}, got {}", p + 1, rec.seq),
                });
            }
        }

        prev_seq = Some(rec.seq);
        prev_hash = rec.hash_self;
    }

    Ok(VerifyResult::Valid { lines: count })
}
