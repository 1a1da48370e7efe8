//! News (JSON Lines) and fundamentals (JSON) loaders.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use pdk_schemas::{Fundamentals, NewsItem};
use serde::Deserialize;

/// One `NewsItem` per non-blank line. A malformed line fails the load.
pub fn parse_news_jsonl(data: &str) -> Result<Vec<NewsItem>> {
    let mut out = Vec::new();
    for (i, line) in data.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item: NewsItem = serde_json::from_str(line)
            .with_context(|| format!("news line {}: invalid news item", i + 1))?;
        if item.id.trim().is_empty() {
            bail!("news line {}: empty id", i + 1);
        }
        out.push(item);
    }
    Ok(out)
}

pub fn load_news_file(path: &Path) -> Result<Vec<NewsItem>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read news file failed: {}", path.display()))?;
    parse_news_jsonl(&data).with_context(|| format!("parse news file failed: {}", path.display()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Fundamentals>),
    One(Box<Fundamentals>),
}

/// `{ "TCS": {...} }` or `{ "TCS": [{...asOf...}, ...] }`.
pub fn parse_fundamentals_json(data: &str) -> Result<BTreeMap<String, Vec<Fundamentals>>> {
    let raw: BTreeMap<String, OneOrMany> =
        serde_json::from_str(data).context("fundamentals: expected an object keyed by symbol")?;
    Ok(raw
        .into_iter()
        .map(|(sym, v)| {
            let list = match v {
                OneOrMany::Many(l) => l,
                OneOrMany::One(f) => vec![*f],
            };
            (sym, list)
        })
        .collect())
}

pub fn load_fundamentals_file(path: &Path) -> Result<BTreeMap<String, Vec<Fundamentals>>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read fundamentals file failed: {}", path.display()))?;
    parse_fundamentals_json(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_skips_blank_lines_and_reports_bad_ones() {
        let data = r#"
{"id":"n1","time":"2024-03-01T04:00:00Z","source":"wire","title":"TCS wins deal","symbols":["TCS"],"sentiment":0.6}

{"id":"n2","time":"2024-03-02T04:00:00Z","source":"wire","title":"Markets flat"}
"#;
        let items = parse_news_jsonl(data).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].symbols, vec!["TCS".to_string()]);
        assert_eq!(items[1].sentiment, None);

        let err = parse_news_jsonl("{\"id\":\"x\"}\n").unwrap_err();
        assert!(err.to_string().contains("news line 1"));
    }

    #[test]
    fn fundamentals_accept_single_or_list() {
        let data = r#"{
            "TCS": {"peRatio": 30.5, "sector": "IT"},
            "INFY": [{"asOf": "2024-01-01", "eps": 60.0}, {"as_of": "2024-04-01", "eps": 62.0}]
        }"#;
        let f = parse_fundamentals_json(data).unwrap();
        assert_eq!(f["TCS"].len(), 1);
        assert_eq!(f["TCS"][0].pe_ratio, Some(30.5));
        assert_eq!(f["INFY"].len(), 2);
        assert_eq!(f["INFY"][1].eps, Some(62.0));
    }
}
