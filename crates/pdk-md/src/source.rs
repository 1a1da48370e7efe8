//! Collaborator boundary for bars and news.
//!
//! Scrapers and vendor APIs live outside this workspace; they plug in by
//! implementing these traits. The file-backed sources cover backtests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use pdk_schemas::NewsItem;

use crate::ingest_csv::load_bars_file;
use crate::news::load_news_file;
use crate::normalizer::DailyBar;
use crate::store::MarketDataStore;

/// Request for daily bars, both dates inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarRequest {
    pub symbols: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BarRequest {
    fn wants(&self, bar: &DailyBar) -> bool {
        (self.symbols.is_empty() || self.symbols.iter().any(|s| s == &bar.symbol))
            && bar.date >= self.start
            && bar.date <= self.end
    }
}

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Daily bars matching `req`. An empty symbol list means all symbols.
    async fn fetch_bars(&self, req: &BarRequest) -> Result<Vec<DailyBar>>;
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// News items timestamped within `[start, end]` (UTC calendar dates).
    async fn fetch_news(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NewsItem>>;
}

/// Daily OHLCV CSV on disk.
#[derive(Debug, Clone)]
pub struct CsvBarSource {
    pub path: PathBuf,
}

#[async_trait]
impl MarketDataSource for CsvBarSource {
    async fn fetch_bars(&self, req: &BarRequest) -> Result<Vec<DailyBar>> {
        let bars = load_bars_file(&self.path)
            .with_context(|| format!("load bars failed: {}", self.path.display()))?;
        Ok(bars.into_iter().filter(|b| req.wants(b)).collect())
    }
}

/// News JSON Lines on disk.
#[derive(Debug, Clone)]
pub struct JsonlNewsSource {
    pub path: PathBuf,
}

#[async_trait]
impl NewsSource for JsonlNewsSource {
    async fn fetch_news(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<NewsItem>> {
        let items = load_news_file(&self.path)?;
        Ok(items
            .into_iter()
            .filter(|n| (start..=end).contains(&n.time.date_naive()))
            .collect())
    }
}

impl MarketDataStore {
    /// Populate a store from collaborators. News is optional.
    pub async fn load_from(
        bars: &dyn MarketDataSource,
        news: Option<&dyn NewsSource>,
        req: &BarRequest,
    ) -> Result<Self> {
        let mut store = MarketDataStore::new();
        let fetched = bars.fetch_bars(req).await.context("fetch bars failed")?;
        store.insert_bars(fetched);

        if let Some(src) = news {
            let items = src
                .fetch_news(req.start, req.end)
                .await
                .context("fetch news failed")?;
            store.insert_news(items);
        }

        tracing::info!(
            symbols = store.symbols().len(),
            bars = store.bar_count(),
            start = %req.start,
            end = %req.end,
            "market data loaded"
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[tokio::test]
    async fn csv_source_filters_by_request() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "symbol,date,open,high,low,close,volume").unwrap();
        writeln!(f, "TCS,2024-03-01,1,1,1,1,1").unwrap();
        writeln!(f, "TCS,2024-03-04,2,2,2,2,1").unwrap();
        writeln!(f, "INFY,2024-03-04,3,3,3,3,1").unwrap();
        f.flush().unwrap();

        let src = CsvBarSource {
            path: f.path().to_path_buf(),
        };
        let req = BarRequest {
            symbols: vec!["TCS".to_string()],
            start: d(2),
            end: d(31),
        };
        let bars = src.fetch_bars(&req).await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, d(4));

        let all = BarRequest {
            symbols: vec![],
            ..req
        };
        let store = MarketDataStore::load_from(&src, None, &all).await.unwrap();
        assert_eq!(store.symbols(), vec!["INFY".to_string(), "TCS".to_string()]);
    }

    #[tokio::test]
    async fn missing_file_is_an_error_with_path() {
        let src = CsvBarSource {
            path: PathBuf::from("/nonexistent/bars.csv"),
        };
        let req = BarRequest {
            symbols: vec![],
            start: d(1),
            end: d(2),
        };
        let err = src.fetch_bars(&req).await.unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/bars.csv"));
    }
}
