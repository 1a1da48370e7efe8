//! Tolerant extraction of a TradingDecision from raw oracle text.
//!
//! Strategies, in order:
//! 1. `Strict`: the whole trimmed text is the JSON object.
//! 2. `Fenced`: the body of the first fenced code block (```` ```json ````
//!    or bare ```` ``` ````).
//! 3. `Greedy`: everything from the first `{` to the last `}`.
//!
//! The first candidate that is a JSON object carrying all four envelope keys
//! and decodes into [`TradingDecision`] wins.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::decision::TradingDecision;

// Constant patterns: a compile failure is a programming error.
static FENCED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("fenced block pattern")
});
static GREEDY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("greedy object pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Strict,
    Fenced,
    Greedy,
}

impl ParseStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseStrategy::Strict => "strict",
            ParseStrategy::Fenced => "fenced",
            ParseStrategy::Greedy => "greedy",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace.
    Empty,
    /// No candidate was a JSON object.
    NoJsonObject,
    /// A JSON object was found but lacks envelope keys.
    MissingKeys { missing: Vec<&'static str> },
    /// The envelope was complete but a field had the wrong shape
    /// (e.g. an order without a numeric `confidence`).
    Malformed(String),
}

impl ParseError {
    // Higher rank = closer to a valid decision; reported in preference.
    fn rank(&self) -> u8 {
        match self {
            ParseError::Empty => 0,
            ParseError::NoJsonObject => 1,
            ParseError::MissingKeys { .. } => 2,
            ParseError::Malformed(_) => 3,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "oracle returned empty text"),
            ParseError::NoJsonObject => write!(f, "no JSON object found in oracle text"),
            ParseError::MissingKeys { missing } => {
                write!(f, "decision missing required keys: {}", missing.join(", "))
            }
            ParseError::Malformed(msg) => write!(f, "malformed decision: {msg}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse raw oracle text into a decision.
pub fn parse_decision(raw: &str) -> Result<TradingDecision, ParseError> {
    parse_decision_with_strategy(raw).map(|(d, _)| d)
}

/// Like [`parse_decision`], also reporting which strategy succeeded.
pub fn parse_decision_with_strategy(
    raw: &str,
) -> Result<(TradingDecision, ParseStrategy), ParseError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut best = ParseError::NoJsonObject;
    for (strategy, candidate) in candidates(text) {
        match decode_candidate(candidate) {
            Ok(decision) => return Ok((decision, strategy)),
            Err(e) => {
                if e.rank() > best.rank() {
                    best = e;
                }
            }
        }
    }
    Err(best)
}

/// Names of the envelope keys absent from a JSON object.
pub fn missing_envelope_keys(obj: &serde_json::Map<String, Value>) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !obj.contains_key("timestamp") {
        missing.push("timestamp");
    }
    if !obj.contains_key("orders") {
        missing.push("orders");
    }
    if !obj.contains_key("portfolio_updates") && !obj.contains_key("portfolioUpdates") {
        missing.push("portfolioUpdates");
    }
    if !obj.contains_key("diagnostics") {
        missing.push("diagnostics");
    }
    missing
}

fn candidates(text: &str) -> Vec<(ParseStrategy, &str)> {
    let mut out = vec![(ParseStrategy::Strict, text)];

    if let Some(body) = FENCED.captures(text).and_then(|c| c.get(1)) {
        out.push((ParseStrategy::Fenced, body.as_str().trim()));
    }
    if let Some(m) = GREEDY.find(text) {
        out.push((ParseStrategy::Greedy, m.as_str()));
    }
    out
}

fn decode_candidate(candidate: &str) -> Result<TradingDecision, ParseError> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|_| ParseError::NoJsonObject)?;
    let obj = value.as_object().ok_or(ParseError::NoJsonObject)?;

    let missing = missing_envelope_keys(obj);
    if !missing.is_empty() {
        return Err(ParseError::MissingKeys { missing });
    }

    serde_json::from_value(value).map_err(|e| ParseError::Malformed(e.to_string()))
}
