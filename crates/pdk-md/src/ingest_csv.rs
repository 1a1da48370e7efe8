//! Daily OHLCV CSV ingestion.
//!
//! Expected header (case-insensitive, any column order, extra columns ignored):
//! `symbol,date,open,high,low,close,volume`. Dates are `YYYY-MM-DD`; prices are
//! decimal strings converted with [`price_to_micros`](crate::price_to_micros).
//! Any bad row fails the whole load with its 1-based data row number.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::normalizer::{DailyBar, NormalizerError};

const REQUIRED_COLUMNS: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

#[derive(Debug)]
pub enum CsvLoadError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingHeader(&'static str),
    ParseField {
        row: usize,
        field: &'static str,
        raw: String,
    },
    InvalidBar {
        row: usize,
        source: NormalizerError,
    },
    DuplicateBar {
        row: usize,
        symbol: String,
        date: NaiveDate,
    },
}

impl fmt::Display for CsvLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CsvLoadError::Io(e) => write!(f, "io error: {e}"),
            CsvLoadError::Csv(e) => write!(f, "csv error: {e}"),
            CsvLoadError::MissingHeader(col) => write!(f, "missing required column '{col}'"),
            CsvLoadError::ParseField { row, field, raw } => {
                write!(f, "row {row}: could not parse {field} from '{raw}'")
            }
            CsvLoadError::InvalidBar { row, source } => write!(f, "row {row}: {source}"),
            CsvLoadError::DuplicateBar { row, symbol, date } => {
                write!(f, "row {row}: duplicate bar for {symbol} on {date}")
            }
        }
    }
}

impl std::error::Error for CsvLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CsvLoadError::Io(e) => Some(e),
            CsvLoadError::Csv(e) => Some(e),
            CsvLoadError::InvalidBar { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CsvLoadError {
    fn from(e: std::io::Error) -> Self {
        CsvLoadError::Io(e)
    }
}

impl From<csv::Error> for CsvLoadError {
    fn from(e: csv::Error) -> Self {
        CsvLoadError::Csv(e)
    }
}

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

pub fn load_bars_file(path: &Path) -> Result<Vec<DailyBar>, CsvLoadError> {
    let file = std::fs::File::open(path)?;
    load_bars(file)
}

pub fn load_bars_str(data: &str) -> Result<Vec<DailyBar>, CsvLoadError> {
    load_bars(data.as_bytes())
}

/// Parse all bars from a reader, in file order.
pub fn load_bars<R: Read>(reader: R) -> Result<Vec<DailyBar>, CsvLoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(reader);

    let cols = column_index(rdr.headers()?)?;
    let mut seen: BTreeSet<(String, NaiveDate)> = BTreeSet::new();
    let mut out = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record?;
        let get = |name: &'static str| record.get(cols[name]).unwrap_or("");

        let symbol = get("symbol");
        if symbol.is_empty() {
            return Err(CsvLoadError::ParseField {
                row,
                field: "symbol",
                raw: String::new(),
            });
        }
        let date = NaiveDate::parse_from_str(get("date"), "%Y-%m-%d").map_err(|_| {
            CsvLoadError::ParseField {
                row,
                field: "date",
                raw: get("date").to_string(),
            }
        })?;
        let volume = parse_volume(get("volume")).ok_or_else(|| CsvLoadError::ParseField {
            row,
            field: "volume",
            raw: get("volume").to_string(),
        })?;

        let bar = DailyBar::from_strs(
            symbol,
            date,
            get("open"),
            get("high"),
            get("low"),
            get("close"),
            volume,
        )
        .map_err(|source| CsvLoadError::InvalidBar { row, source })?;

        if !seen.insert((bar.symbol.clone(), bar.date)) {
            return Err(CsvLoadError::DuplicateBar {
                row,
                symbol: bar.symbol,
                date: bar.date,
            });
        }
        out.push(bar);
    }

    tracing::debug!(bars = out.len(), "csv bars loaded");
    Ok(out)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn column_index(headers: &csv::StringRecord) -> Result<HashMap<&'static str, usize>, CsvLoadError> {
    let mut idx = HashMap::new();
    for col in REQUIRED_COLUMNS {
        let pos = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(col))
            .ok_or(CsvLoadError::MissingHeader(col))?;
        idx.insert(col, pos);
    }
    Ok(idx)
}

/// Volumes are whole shares; vendors sometimes write `12345.0`.
fn parse_volume(raw: &str) -> Option<i64> {
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let (whole, frac) = raw.split_once('.')?;
    if frac.bytes().all(|b| b == b'0') {
        whole.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdk_portfolio::MICROS_SCALE;

    const GOOD: &str = "\
Date,Symbol,Open,High,Low,Close,Volume,Adj Close
2024-03-01,TCS,3700,3750,3690,3720,120000,3720
2024-03-01,INFY,1500.5,1510,1495.25,1505,90000.0,1505
2024-03-04,TCS,3725,3810,3720,3800,110000,3800
";

    #[test]
    fn parses_out_of_order_headers_and_extra_columns() {
        let bars = load_bars_str(GOOD).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].symbol, "TCS");
        assert_eq!(bars[0].close_micros, 3_720 * MICROS_SCALE);
        assert_eq!(bars[1].open_micros, 1_500_500_000);
        assert_eq!(bars[1].volume, 90_000);
        assert_eq!(bars[2].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    }

    #[test]
    fn missing_column_is_reported() {
        let err = load_bars_str("symbol,date,open,high,low,close\nTCS,2024-03-01,1,1,1,1\n")
            .unwrap_err();
        assert!(matches!(err, CsvLoadError::MissingHeader("volume")));
    }

    #[test]
    fn bad_date_carries_row_number() {
        let data = "symbol,date,open,high,low,close,volume\n\
                    TCS,2024-03-01,1,1,1,1,1\n\
                    TCS,01/03/2024,1,1,1,1,1\n";
        match load_bars_str(data).unwrap_err() {
            CsvLoadError::ParseField { row, field, raw } => {
                assert_eq!(row, 2);
                assert_eq!(field, "date");
                assert_eq!(raw, "01/03/2024");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn ohlc_violation_and_duplicates_fail() {
        let bad = "symbol,date,open,high,low,close,volume\nTCS,2024-03-01,10,9,8,9,1\n";
        assert!(matches!(
            load_bars_str(bad).unwrap_err(),
            CsvLoadError::InvalidBar { row: 1, .. }
        ));

        let dup = "symbol,date,open,high,low,close,volume\n\
                   TCS,2024-03-01,1,1,1,1,1\n\
                   TCS,2024-03-01,1,1,1,1,1\n";
        assert!(matches!(
            load_bars_str(dup).unwrap_err(),
            CsvLoadError::DuplicateBar { row: 2, .. }
        ));
    }

    #[test]
    fn fractional_volume_is_refused() {
        assert_eq!(parse_volume("100"), Some(100));
        assert_eq!(parse_volume("100.00"), Some(100));
        assert_eq!(parse_volume("100.5"), None);
        assert_eq!(parse_volume("abc"), None);
    }
}
