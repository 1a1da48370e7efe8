use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::NaiveDate;
use pdk_md::{DailyBar, MarketDataStore, MarketDay};
use pdk_oracle::{OracleAdapter, OracleError, ProviderKind};

/// Replies from a fixed queue; `Err` entries become transport failures.
pub struct CannedOracle {
    sig: String,
    replies: Mutex<VecDeque<Result<String, String>>>,
}

impl CannedOracle {
    pub fn new(sig: &str, replies: Vec<Result<String, String>>) -> Self {
        Self {
            sig: sig.to_string(),
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait::async_trait]
impl OracleAdapter for CannedOracle {
    fn signature(&self) -> &str {
        &self.sig
    }
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }
    fn model(&self) -> &str {
        "canned"
    }
    async fn complete(&self, _: &str, _: &str) -> Result<String, OracleError> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(OracleError::Transport(msg)),
            None => Err(OracleError::Transport("no scripted reply left".to_string())),
        }
    }
    async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        Ok(vec!["canned".to_string()])
    }
}

pub fn bar(symbol: &str, date: NaiveDate, close: &str) -> DailyBar {
    DailyBar::from_strs(symbol, date, close, close, close, close, 1_000).unwrap()
}

/// A day where every symbol has one flat bar at `close`.
pub fn day(date: NaiveDate, closes: &[(&str, &str)]) -> MarketDay {
    let mut store = MarketDataStore::new();
    store.insert_bars(closes.iter().map(|(s, c)| bar(s, date, c)));
    store.day(date, 0)
}
