//! In-memory market data with point-in-time day slicing.
//!
//! `day(date, ..)` never returns anything dated after `date`: bars by their
//! session date, news by the UTC calendar date of its timestamp, fundamentals
//! by `as_of` (undated snapshots are treated as always known).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Days, NaiveDate};
use pdk_portfolio::MarkMap;
use pdk_schemas::{Fundamentals, NewsItem, SymbolData};

use crate::normalizer::DailyBar;

/// One symbol as of a trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDay {
    /// Most recent bar dated on or before the day.
    pub latest: DailyBar,
    /// Up to `history_days` earlier bars, oldest first.
    pub history: Vec<DailyBar>,
}

/// Everything an agent may see on one trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDay {
    pub date: NaiveDate,
    pub symbols: BTreeMap<String, SymbolDay>,
    /// Oldest first.
    pub news: Vec<NewsItem>,
    pub fundamentals: BTreeMap<String, Fundamentals>,
}

impl MarketDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            symbols: BTreeMap::new(),
            news: Vec::new(),
            fundamentals: BTreeMap::new(),
        }
    }

    pub fn tickers(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }

    /// Latest close per symbol, in micros.
    pub fn closes(&self) -> MarkMap {
        self.symbols
            .iter()
            .map(|(s, d)| (s.clone(), d.latest.close_micros))
            .collect()
    }

    /// Wire form of the per-symbol data.
    pub fn market_data(&self) -> BTreeMap<String, SymbolData> {
        self.symbols
            .iter()
            .map(|(s, d)| {
                (
                    s.clone(),
                    SymbolData {
                        latest: d.latest.to_candle(),
                        history: d.history.iter().map(DailyBar::to_candle).collect(),
                    },
                )
            })
            .collect()
    }

    /// Plain-text digest used as scenario text for retrieval.
    pub fn scenario_text(&self) -> String {
        let mut parts = Vec::new();
        for (sym, d) in &self.symbols {
            let prev = d.history.last().map(|b| b.close_micros);
            let trend = match prev {
                Some(p) if d.latest.close_micros > p => "up",
                Some(p) if d.latest.close_micros < p => "down",
                Some(_) => "flat",
                None => "new",
            };
            parts.push(format!("{sym} {trend}"));
        }
        for n in &self.news {
            parts.push(n.title.clone());
        }
        parts.join(" | ")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketDataStore {
    bars: BTreeMap<String, BTreeMap<NaiveDate, DailyBar>>,
    news: Vec<NewsItem>,
    fundamentals: BTreeMap<String, Vec<Fundamentals>>,
}

impl MarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts replace earlier bars with the same (symbol, date).
    pub fn insert_bars<I: IntoIterator<Item = DailyBar>>(&mut self, bars: I) {
        for b in bars {
            self.bars
                .entry(b.symbol.clone())
                .or_default()
                .insert(b.date, b);
        }
    }

    /// Adds news, kept in time order. An id already present (or repeated in
    /// `items`) keeps the first item seen.
    pub fn insert_news<I: IntoIterator<Item = NewsItem>>(&mut self, items: I) {
        let mut seen: BTreeSet<String> = self.news.iter().map(|n| n.id.clone()).collect();
        for item in items {
            if seen.insert(item.id.clone()) {
                self.news.push(item);
            }
        }
        self.news.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
    }

    pub fn insert_fundamentals(&mut self, data: BTreeMap<String, Vec<Fundamentals>>) {
        for (sym, list) in data {
            let slot = self.fundamentals.entry(sym).or_default();
            slot.extend(list);
            // Undated snapshots sort first, so any dated one supersedes them.
            slot.sort_by_key(|f| f.as_of);
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        self.bars.keys().cloned().collect()
    }

    pub fn bar_count(&self) -> usize {
        self.bars.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// First and last bar date across all symbols.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.bars.values().filter_map(|m| m.keys().next()).min()?;
        let last = self.bars.values().filter_map(|m| m.keys().next_back()).max()?;
        Some((*first, *last))
    }

    /// Every date in `[start, end]` on which at least one symbol has a bar.
    pub fn trading_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        let dates: BTreeSet<NaiveDate> = self
            .bars
            .values()
            .flat_map(|m| m.range(start..=end).map(|(d, _)| *d))
            .collect();
        dates.into_iter().collect()
    }

    /// Point-in-time slice for `date`.
    ///
    /// Symbols with no bar on or before `date` are omitted. News is limited to
    /// the calendar window `[date - history_days, date]`.
    pub fn day(&self, date: NaiveDate, history_days: usize) -> MarketDay {
        let mut out = MarketDay::new(date);

        for (sym, series) in &self.bars {
            let mut upto = series.range(..=date).rev().map(|(_, b)| b);
            let Some(latest) = upto.next() else {
                continue;
            };
            let mut history: Vec<DailyBar> = upto.take(history_days).cloned().collect();
            history.reverse();
            out.symbols.insert(
                sym.clone(),
                SymbolDay {
                    latest: latest.clone(),
                    history,
                },
            );
        }

        let window_start = u64::try_from(history_days)
            .ok()
            .and_then(|n| date.checked_sub_days(Days::new(n)))
            .unwrap_or(NaiveDate::MIN);
        out.news = self
            .news
            .iter()
            .filter(|n| (window_start..=date).contains(&n.time.date_naive()))
            .cloned()
            .collect();

        for (sym, list) in &self.fundamentals {
            let visible = list
                .iter()
                .rev()
                .find(|f| f.as_of.map_or(true, |d| d <= date));
            if let Some(f) = visible {
                out.fundamentals.insert(sym.clone(), f.clone());
            }
        }

        out
    }
}
