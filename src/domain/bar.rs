//! Price bar representation.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::SignalbenchError;

/// One fixed-duration OHLC observation plus the feature values aligned with
/// the owning [`Series`](crate::domain::series::Series)' feature names.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub features: Vec<f64>,
}

impl Bar {
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }

    pub(crate) fn check_prices(&self) -> Result<(), String> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} price {value} is not positive and finite"));
            }
        }
        Ok(())
    }
}

/// The bar price a backtest realizes returns against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceField {
    Open,
    High,
    Low,
    #[default]
    Close,
}

impl FromStr for PriceField {
    type Err = SignalbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            other => Err(SignalbenchError::configuration(format!(
                "unknown price field '{other}' (expected open, high, low or close)"
            ))),
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
        };
        write!(f, "{name}")
    }
}
