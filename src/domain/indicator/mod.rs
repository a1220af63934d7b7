//! Technical indicators over a price column.
//!
//! Every indicator returns one value per input price. Bars still inside the
//! warm-up window are `NaN`, which downstream rules treat as "no signal".

pub mod ema;
pub mod rsi;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    Rsi(usize),
}

impl IndicatorType {
    pub fn compute(&self, prices: &[f64]) -> Vec<f64> {
        match *self {
            IndicatorType::Ema(period) => ema::calculate_ema(prices, period),
            IndicatorType::Rsi(period) => rsi::calculate_rsi(prices, period),
        }
    }

    /// Conventional feature column name, e.g. `ema_20`.
    pub fn feature_name(&self) -> String {
        match self {
            IndicatorType::Ema(period) => format!("ema_{period}"),
            IndicatorType::Rsi(period) => format!("rsi_{period}"),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}
