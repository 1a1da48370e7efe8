//! Decimal-string prices to fixed-point micros, and daily-bar sanity.
//!
//! No floating point is involved in the conversion: `"3720.55"` becomes
//! `3_720_550_000` exactly, and anything that would need rounding is refused.

use std::fmt;

use chrono::NaiveDate;
use pdk_portfolio::{micros_to_f64, MICROS_SCALE};
use pdk_schemas::Candle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizerError {
    EmptyPrice { field: &'static str },
    InvalidPrice { field: &'static str, raw: String },
    /// More than 6 fractional digits would need rounding.
    TooManyDecimalPlaces { field: &'static str, raw: String },
    /// Prices must be strictly positive.
    NonPositivePrice { field: &'static str, micros: i64 },
    /// low <= open/close <= high does not hold.
    OhlcViolation(String),
    NegativeVolume(i64),
}

impl fmt::Display for NormalizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerError::EmptyPrice { field } => write!(f, "price field '{field}' is empty"),
            NormalizerError::InvalidPrice { field, raw } => {
                write!(f, "price field '{field}' could not be parsed: '{raw}'")
            }
            NormalizerError::TooManyDecimalPlaces { field, raw } => write!(
                f,
                "price field '{field}' has more than 6 decimal places: '{raw}'"
            ),
            NormalizerError::NonPositivePrice { field, micros } => {
                write!(f, "price field '{field}' must be > 0, got {micros} micros")
            }
            NormalizerError::OhlcViolation(msg) => write!(f, "OHLC sanity violation: {msg}"),
            NormalizerError::NegativeVolume(v) => write!(f, "volume must be >= 0, got {v}"),
        }
    }
}

impl std::error::Error for NormalizerError {}

/// Convert a decimal price string to micros.
///
/// Accepts an optional sign and an optional fractional part of at most six
/// digits. Rejects empty input, stray characters and overflow.
pub fn price_to_micros(s: &str, field: &'static str) -> Result<i64, NormalizerError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(NormalizerError::EmptyPrice { field });
    }
    let invalid = || NormalizerError::InvalidPrice {
        field,
        raw: s.to_string(),
    };

    let (negative, digits) = match s.as_bytes()[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));

    let is_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !is_digits(int_part) || !is_digits(frac_part)
    {
        return Err(invalid());
    }
    if frac_part.len() > 6 {
        return Err(NormalizerError::TooManyDecimalPlaces {
            field,
            raw: s.to_string(),
        });
    }

    let whole: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    // Right-pad to six digits: "5" -> 500_000 micros.
    let frac: i64 = format!("{frac_part:0<6}").parse().map_err(|_| invalid())?;

    let micros = whole
        .checked_mul(MICROS_SCALE)
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(invalid)?;

    Ok(if negative { -micros } else { micros })
}

/// One validated daily bar in micros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open_micros: i64,
    pub high_micros: i64,
    pub low_micros: i64,
    pub close_micros: i64,
    pub volume: i64,
}

impl DailyBar {
    /// Build from decimal strings, enforcing positivity and OHLC ordering.
    #[allow(clippy::too_many_arguments)]
    pub fn from_strs(
        symbol: &str,
        date: NaiveDate,
        open: &str,
        high: &str,
        low: &str,
        close: &str,
        volume: i64,
    ) -> Result<Self, NormalizerError> {
        let bar = Self {
            symbol: symbol.trim().to_string(),
            date,
            open_micros: positive(price_to_micros(open, "open")?, "open")?,
            high_micros: positive(price_to_micros(high, "high")?, "high")?,
            low_micros: positive(price_to_micros(low, "low")?, "low")?,
            close_micros: positive(price_to_micros(close, "close")?, "close")?,
            volume,
        };
        bar.check()?;
        Ok(bar)
    }

    fn check(&self) -> Result<(), NormalizerError> {
        if self.volume < 0 {
            return Err(NormalizerError::NegativeVolume(self.volume));
        }
        if self.low_micros > self.high_micros {
            return Err(NormalizerError::OhlcViolation(format!(
                "{} {}: low > high",
                self.symbol, self.date
            )));
        }
        for (name, px) in [("open", self.open_micros), ("close", self.close_micros)] {
            if px < self.low_micros || px > self.high_micros {
                return Err(NormalizerError::OhlcViolation(format!(
                    "{} {}: {name} outside [low, high]",
                    self.symbol, self.date
                )));
            }
        }
        Ok(())
    }

    /// Wire form for the oracle input.
    pub fn to_candle(&self) -> Candle {
        Candle {
            symbol: self.symbol.clone(),
            date: self.date,
            open: micros_to_f64(self.open_micros),
            high: micros_to_f64(self.high_micros),
            low: micros_to_f64(self.low_micros),
            close: micros_to_f64(self.close_micros),
            volume: self.volume as f64,
        }
    }
}

fn positive(micros: i64, field: &'static str) -> Result<i64, NormalizerError> {
    if micros <= 0 {
        return Err(NormalizerError::NonPositivePrice { field, micros });
    }
    Ok(micros)
}
