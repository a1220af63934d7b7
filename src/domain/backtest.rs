//! Vectorized backtest engine.
//!
//! The position decided at bar `i-1` is the one held over the return from
//! `i-1` to `i`. The shift happens once, inside [`run`], so no caller can
//! multiply a position against its own bar's return.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::bar::PriceField;
use crate::domain::error::SignalbenchError;
use crate::domain::position::Position;
use crate::domain::series::Series;

pub const DEFAULT_TRANSACTION_COST: f64 = 0.00005;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub price_field: PriceField,
    /// Cost per unit of position change, as a fraction of notional.
    pub transaction_cost: f64,
    /// Reject out-of-range positions instead of clamping them.
    pub strict_positions: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            price_field: PriceField::Close,
            transaction_cost: DEFAULT_TRANSACTION_COST,
            strict_positions: false,
        }
    }
}

impl BacktestConfig {
    pub fn with_cost(transaction_cost: f64) -> Self {
        Self {
            transaction_cost,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SignalbenchError> {
        validate_transaction_cost(self.transaction_cost)
    }
}

pub(crate) fn validate_transaction_cost(cost: f64) -> Result<(), SignalbenchError> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(SignalbenchError::configuration(format!(
            "transaction cost must be non-negative and finite, got {cost}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRecord {
    pub timestamp: NaiveDateTime,
    pub log_return: f64,
    pub position_applied: i64,
    pub trade_magnitude: i64,
    pub cost: f64,
    pub net_return: f64,
    pub cumulative_equity: f64,
}

/// A position that had to be clamped into [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClampedPosition {
    pub index: usize,
    pub raw: i64,
    pub applied: Position,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BacktestResult {
    pub records: Vec<BacktestRecord>,
    pub clamped: Vec<ClampedPosition>,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.records.last().map(|r| r.cumulative_equity).unwrap_or(1.0)
    }

    pub fn equity_curve(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.cumulative_equity).collect()
    }

    /// Net returns of bars that realized a return; bar 0 is the seed and is
    /// left out.
    pub fn net_returns(&self) -> Vec<f64> {
        self.records.iter().skip(1).map(|r| r.net_return).collect()
    }

    /// Gross (pre-cost) return of every bar that realized a return.
    pub fn gross_returns(&self) -> Vec<f64> {
        self.records
            .iter()
            .skip(1)
            .map(|r| r.position_applied as f64 * r.log_return)
            .collect()
    }
}

/// Converts a raw position signal into positions, clamping (or rejecting, in
/// strict mode) anything outside [-1, 1].
pub fn normalize_positions(
    raw: &[i64],
    strict: bool,
) -> Result<(Vec<Position>, Vec<ClampedPosition>), SignalbenchError> {
    let mut positions = Vec::with_capacity(raw.len());
    let mut clamped = Vec::new();
    for (index, &value) in raw.iter().enumerate() {
        match Position::from_value(value) {
            Some(p) => positions.push(p),
            None if strict => return Err(SignalbenchError::PositionOutOfRange { index, value }),
            None => {
                let applied = Position::clamp(value);
                clamped.push(ClampedPosition {
                    index,
                    raw: value,
                    applied,
                });
                positions.push(applied);
            }
        }
    }
    Ok((positions, clamped))
}

pub fn run(
    series: &Series,
    positions: &[i64],
    config: &BacktestConfig,
) -> Result<BacktestResult, SignalbenchError> {
    config.validate()?;
    if positions.len() != series.len() {
        return Err(SignalbenchError::LengthMismatch {
            what: "positions".into(),
            series: series.len(),
            other: positions.len(),
        });
    }

    let (positions, clamped) = normalize_positions(positions, config.strict_positions)?;
    if let Some(first) = clamped.first() {
        warn!(
            count = clamped.len(),
            first_index = first.index,
            first_value = first.raw,
            "clamped out-of-range positions into [-1, 1]"
        );
    }

    let returns = series.log_returns(config.price_field);
    let mut records = Vec::with_capacity(series.len());
    let mut equity = 1.0_f64;

    for (i, bar) in series.bars().iter().enumerate() {
        if i == 0 {
            records.push(BacktestRecord {
                timestamp: bar.timestamp,
                log_return: 0.0,
                position_applied: 0,
                trade_magnitude: 0,
                cost: 0.0,
                net_return: 0.0,
                cumulative_equity: equity,
            });
            continue;
        }

        let applied = positions[i - 1];
        let prior = if i >= 2 { positions[i - 2] } else { Position::Flat };
        let trade_magnitude = (applied.value() - prior.value()).abs();
        let cost = trade_magnitude as f64 * config.transaction_cost;
        let net_return = applied.as_f64() * returns[i] - cost;
        equity *= net_return.exp();

        records.push(BacktestRecord {
            timestamp: bar.timestamp,
            log_return: returns[i],
            position_applied: applied.value(),
            trade_magnitude,
            cost,
            net_return,
            cumulative_equity: equity,
        });
    }

    debug!(
        bars = records.len(),
        final_equity = equity,
        "backtest complete"
    );

    Ok(BacktestResult { records, clamped })
}
