//! pdk-md
//!
//! Market data for the simulation: CSV/JSONL loaders, the collaborator traits
//! external feeds implement, and point-in-time day slicing. Prices enter as
//! decimal strings and are held as integer micros.

pub mod ingest_csv;
pub mod news;
pub mod normalizer;
pub mod source;
pub mod store;

pub use ingest_csv::{load_bars, load_bars_file, load_bars_str, CsvLoadError};
pub use news::{load_fundamentals_file, load_news_file, parse_fundamentals_json, parse_news_jsonl};
pub use normalizer::{price_to_micros, DailyBar, NormalizerError};
pub use source::{BarRequest, CsvBarSource, JsonlNewsSource, MarketDataSource, NewsSource};
pub use store::{MarketDataStore, MarketDay, SymbolDay};
