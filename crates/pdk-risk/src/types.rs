use pdk_portfolio::{micros_from_f64, MICROS_SCALE};
use pdk_schemas::{OrderAction, RiskConfig, SlippageKind};

/// Basis-point scale: 10_000 bps = 100%.
pub const BPS_SCALE: i64 = 10_000;

/// Orders with lower confidence are never executed.
pub const MIN_CONFIDENCE: f64 = 0.25;

/// Tick size used when a symbol has none configured (0.01 currency unit).
pub const DEFAULT_TICK_MICROS: i64 = MICROS_SCALE / 100;

/// Reasons an order is refused. `as_str` is the exact text recorded in
/// `diagnostics.ruleViolations`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonCode {
    // Validation (buy)
    InsufficientCash,
    ExceedsMaxOrderValue,
    ExceedsMaxPositionPct,
    ExceedsMaxTotalExposure,
    ViolatesMinCashReserve,

    // Validation (sell)
    InsufficientPosition,

    // Screening
    UnknownSymbol,
    InvalidQuantity,
    InvalidPrice,
    ConfidenceBelowThreshold,
    LotSizeMismatch,
    OutsideCircuitLimit,
    LimitNotReached,
    StopNotTriggered,

    // Daily budget
    MaxDailyTradesExceeded,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InsufficientCash => "Insufficient cash",
            ReasonCode::ExceedsMaxOrderValue => "Exceeds max order value",
            ReasonCode::ExceedsMaxPositionPct => "Exceeds max position %",
            ReasonCode::ExceedsMaxTotalExposure => "Exceeds max total exposure",
            ReasonCode::ViolatesMinCashReserve => "Violates minimum cash reserve",
            ReasonCode::InsufficientPosition => "Insufficient position",
            ReasonCode::UnknownSymbol => "Unknown symbol",
            ReasonCode::InvalidQuantity => "Invalid quantity",
            ReasonCode::InvalidPrice => "Invalid price",
            ReasonCode::ConfidenceBelowThreshold => "Confidence below threshold",
            ReasonCode::LotSizeMismatch => "Quantity not a multiple of lot size",
            ReasonCode::OutsideCircuitLimit => "Price outside circuit limit",
            ReasonCode::LimitNotReached => "Limit price not reached",
            ReasonCode::StopNotTriggered => "Stop price not triggered",
            ReasonCode::MaxDailyTradesExceeded => "max_daily_trades_exceeded",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`crate::validate_order`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(ReasonCode),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    pub fn reason(&self) -> Option<ReasonCode> {
        match self {
            Validation::Valid => None,
            Validation::Invalid(r) => Some(*r),
        }
    }
}

/// A screened order in fixed-point units, ready for validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckedOrder {
    pub action: OrderAction,
    pub symbol: String,
    pub qty: i64,
    /// Price the order is checked and filled at: the day's close, or the
    /// slipped fill price once the caller has applied slippage.
    pub price_micros: i64,
}

/// Adverse execution-price adjustment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slippage {
    None,
    /// Absolute amount per share.
    Fixed { per_share_micros: i64 },
    /// Fraction of price in parts per million.
    Percent { ppm: i64 },
}

/// Integer-only form of [`RiskConfig`]; built once per run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskLimits {
    pub max_position_bps: i64,
    pub max_total_exposure_bps: i64,
    pub min_cash_reserve_bps: i64,
    pub max_daily_trades: u32,
    pub max_order_value_micros: i64,
    pub slippage: Slippage,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LimitsError {
    /// A fraction outside [0, 1] or not finite.
    FractionOutOfRange { field: &'static str, value: f64 },
    /// A currency amount that is negative, zero or not representable.
    InvalidAmount { field: &'static str, value: f64 },
    /// `allowMargin: true`; only cash accounts are simulated.
    MarginNotSupported,
}

impl std::fmt::Display for LimitsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitsError::FractionOutOfRange { field, value } => {
                write!(f, "risk config: {field} must be a fraction in [0, 1], got {value}")
            }
            LimitsError::InvalidAmount { field, value } => {
                write!(f, "risk config: {field} must be a positive amount, got {value}")
            }
            LimitsError::MarginNotSupported => {
                write!(f, "risk config: allow_margin=true is not supported")
            }
        }
    }
}

impl std::error::Error for LimitsError {}

/// Fraction (`0.2`) to basis points (`2000`), rounded to the nearest bp.
pub fn fraction_to_bps(v: f64) -> Option<i64> {
    if !v.is_finite() || !(0.0..=1.0).contains(&v) {
        return None;
    }
    Some((v * BPS_SCALE as f64).round() as i64)
}

fn fraction_field(field: &'static str, v: f64) -> Result<i64, LimitsError> {
    fraction_to_bps(v).ok_or(LimitsError::FractionOutOfRange { field, value: v })
}

impl TryFrom<&RiskConfig> for RiskLimits {
    type Error = LimitsError;

    fn try_from(cfg: &RiskConfig) -> Result<Self, Self::Error> {
        if cfg.allow_margin {
            return Err(LimitsError::MarginNotSupported);
        }

        let max_order_value_micros = micros_from_f64(cfg.max_order_value)
            .filter(|m| *m > 0)
            .ok_or(LimitsError::InvalidAmount {
                field: "max_order_value",
                value: cfg.max_order_value,
            })?;

        let sm = cfg.slippage_model;
        let slippage = match sm.kind {
            SlippageKind::None => Slippage::None,
            SlippageKind::Fixed => {
                let per_share_micros = micros_from_f64(sm.value).filter(|m| *m >= 0).ok_or(
                    LimitsError::InvalidAmount {
                        field: "slippage_model.value",
                        value: sm.value,
                    },
                )?;
                Slippage::Fixed { per_share_micros }
            }
            SlippageKind::Percent => {
                if !sm.value.is_finite() || !(0.0..=1.0).contains(&sm.value) {
                    return Err(LimitsError::FractionOutOfRange {
                        field: "slippage_model.value",
                        value: sm.value,
                    });
                }
                Slippage::Percent {
                    ppm: (sm.value * 1_000_000.0).round() as i64,
                }
            }
        };

        Ok(Self {
            max_position_bps: fraction_field("max_position_pct", cfg.max_position_pct)?,
            max_total_exposure_bps: fraction_field(
                "max_total_exposure_pct",
                cfg.max_total_exposure_pct,
            )?,
            min_cash_reserve_bps: fraction_field("min_cash_reserve_pct", cfg.min_cash_reserve_pct)?,
            max_daily_trades: cfg.max_daily_trades,
            max_order_value_micros,
            slippage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdk_schemas::SlippageModel;

    #[test]
    fn config_converts_to_integer_limits() {
        let cfg = RiskConfig {
            slippage_model: SlippageModel {
                kind: SlippageKind::Percent,
                value: 0.001,
            },
            ..RiskConfig::default()
        };
        let l = RiskLimits::try_from(&cfg).unwrap();
        assert_eq!(l.max_position_bps, 2_000);
        assert_eq!(l.max_total_exposure_bps, 9_000);
        assert_eq!(l.min_cash_reserve_bps, 500);
        assert_eq!(l.max_order_value_micros, 50_000 * MICROS_SCALE);
        assert_eq!(l.slippage, Slippage::Percent { ppm: 1_000 });
    }

    #[test]
    fn out_of_range_fraction_is_refused() {
        let cfg = RiskConfig {
            max_position_pct: 1.5,
            ..RiskConfig::default()
        };
        assert_eq!(
            RiskLimits::try_from(&cfg),
            Err(LimitsError::FractionOutOfRange {
                field: "max_position_pct",
                value: 1.5
            })
        );
    }

    #[test]
    fn margin_is_refused() {
        let cfg = RiskConfig {
            allow_margin: true,
            ..RiskConfig::default()
        };
        assert_eq!(
            RiskLimits::try_from(&cfg),
            Err(LimitsError::MarginNotSupported)
        );
    }

    #[test]
    fn reason_strings_are_stable() {
        assert_eq!(ReasonCode::InsufficientCash.to_string(), "Insufficient cash");
        assert_eq!(
            ReasonCode::ExceedsMaxPositionPct.as_str(),
            "Exceeds max position %"
        );
        assert_eq!(
            ReasonCode::MaxDailyTradesExceeded.as_str(),
            "max_daily_trades_exceeded"
        );
    }
}
