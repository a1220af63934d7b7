//! Performance metrics over a backtest trajectory.
//!
//! Every reducer skips non-finite inputs instead of treating them as zero.

use serde::Serialize;

use super::backtest::BacktestResult;

/// 15-minute bars, 24 hours a day, 365 days a year.
pub const PERIODS_PER_YEAR_M15: f64 = 4.0 * 24.0 * 365.0;

/// Fewer finite returns than this and the Sharpe ratio is reported as 0.
pub const MIN_SHARPE_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    pub periods_per_year: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: PERIODS_PER_YEAR_M15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub final_equity: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub sharpe: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub bars: usize,
}

impl Metrics {
    pub fn compute(result: &BacktestResult, config: &MetricsConfig) -> Self {
        let equity = result.equity_curve();
        let returns = result.net_returns();

        let final_equity = equity
            .iter()
            .rev()
            .copied()
            .find(|v| v.is_finite())
            .unwrap_or(1.0);

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&equity);

        let trade_count = result
            .records
            .iter()
            .filter(|r| r.trade_magnitude > 0)
            .count();

        Metrics {
            final_equity,
            total_return: final_equity - 1.0,
            max_drawdown,
            max_drawdown_duration,
            sharpe: sharpe_ratio(&returns, config.periods_per_year),
            profit_factor: profit_factor(&returns),
            trade_count,
            bars: result.records.len(),
        }
    }
}

/// Worst `equity / running_peak - 1` (a value in [-1, 0]) and the longest run
/// of bars spent below a prior peak.
pub fn compute_drawdown(equity: &[f64]) -> (f64, usize) {
    let mut peak: Option<f64> = None;
    let mut max_dd = 0.0_f64;
    let mut current_duration = 0usize;
    let mut max_duration = 0usize;

    for &value in equity.iter().filter(|v| v.is_finite()) {
        match peak {
            Some(p) if value < p => {
                if p > 0.0 {
                    let dd = value / p - 1.0;
                    if dd < max_dd {
                        max_dd = dd;
                    }
                }
                current_duration += 1;
                max_duration = max_duration.max(current_duration);
            }
            _ => {
                peak = Some(value);
                current_duration = 0;
            }
        }
    }

    (max_dd.max(-1.0), max_duration)
}

pub fn max_drawdown(equity: &[f64]) -> f64 {
    compute_drawdown(equity).0
}

/// Annualized `mean / std` of per-bar returns, using the sample standard
/// deviation. 0.0 when there are too few finite samples or no dispersion.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    let finite: Vec<f64> = returns.iter().copied().filter(|r| r.is_finite()).collect();
    if finite.len() < MIN_SHARPE_SAMPLES {
        return 0.0;
    }

    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev == 0.0 || !stddev.is_finite() {
        return 0.0;
    }
    mean / stddev * periods_per_year.sqrt()
}

/// Sum of gains over sum of absolute losses; +inf with gains and no losses,
/// 0.0 with neither.
pub fn profit_factor(returns: &[f64]) -> f64 {
    let mut gains = 0.0_f64;
    let mut losses = 0.0_f64;
    for &r in returns.iter().filter(|r| r.is_finite()) {
        if r > 0.0 {
            gains += r;
        } else if r < 0.0 {
            losses += r.abs();
        }
    }

    if losses > 0.0 {
        gains / losses
    } else if gains > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::BacktestRecord;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn make_result(net_returns: &[f64], trades: &[i64]) -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut equity = 1.0;
        let mut records = vec![BacktestRecord {
            timestamp: start,
            log_return: 0.0,
            position_applied: 0,
            trade_magnitude: 0,
            cost: 0.0,
            net_return: 0.0,
            cumulative_equity: 1.0,
        }];
        for (i, &r) in net_returns.iter().enumerate() {
            equity *= r.exp();
            records.push(BacktestRecord {
                timestamp: start + Duration::minutes(15 * (i as i64 + 1)),
                log_return: r,
                position_applied: 1,
                trade_magnitude: trades.get(i).copied().unwrap_or(0),
                cost: 0.0,
                net_return: r,
                cumulative_equity: equity,
            });
        }
        BacktestResult {
            records,
            clamped: vec![],
        }
    }

    #[test]
    fn metrics_empty_result() {
        let metrics = Metrics::compute(&BacktestResult::default(), &MetricsConfig::default());
        assert_eq!(metrics.final_equity, 1.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.sharpe, 0.0);
        assert_eq!(metrics.profit_factor, 0.0);
        assert_eq!(metrics.trade_count, 0);
    }

    #[test]
    fn default_periods_per_year_is_m15() {
        assert_eq!(MetricsConfig::default().periods_per_year, 35_040.0);
    }

    #[test]
    fn metrics_final_equity_and_trades() {
        let result = make_result(&[0.01, -0.02, 0.03], &[1, 0, 2]);
        let metrics = Metrics::compute(&result, &MetricsConfig::default());
        assert_abs_diff_eq!(metrics.final_equity, 0.02f64.exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(metrics.total_return, 0.02f64.exp() - 1.0, epsilon = 1e-12);
        assert_eq!(metrics.trade_count, 2);
        assert_eq!(metrics.bars, 4);
    }

    #[test]
    fn max_drawdown_matches_peak_to_trough() {
        let equity = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        let (dd, duration) = compute_drawdown(&equity);
        assert_abs_diff_eq!(dd, 80.0 / 110.0 - 1.0, epsilon = 1e-12);
        assert_eq!(duration, 4);
    }

    #[test]
    fn max_drawdown_zero_for_monotonic_curve() {
        assert_eq!(max_drawdown(&[1.0, 1.0, 1.1, 1.2, 1.2]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn max_drawdown_skips_non_finite() {
        let dd = max_drawdown(&[1.0, f64::NAN, 0.5, 1.0]);
        assert_abs_diff_eq!(dd, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_requires_five_samples() {
        assert_eq!(sharpe_ratio(&[0.01, 0.02, -0.01, 0.03], 35_040.0), 0.0);
    }

    #[test]
    fn sharpe_zero_for_constant_returns() {
        assert_eq!(sharpe_ratio(&[0.01; 10], 35_040.0), 0.0);
    }

    #[test]
    fn sharpe_uses_sample_std() {
        let returns: [f64; 5] = [0.01, 0.02, -0.01, 0.03, 0.0];
        let mean = 0.05 / 5.0;
        let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 4.0;
        let expected = mean / var.sqrt() * 252.0f64.sqrt();
        assert_abs_diff_eq!(sharpe_ratio(&returns, 252.0), expected, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_excludes_nan_rather_than_zeroing() {
        let clean = [0.01, 0.02, -0.01, 0.03, 0.0];
        let with_nan = [0.01, f64::NAN, 0.02, -0.01, 0.03, 0.0];
        assert_eq!(sharpe_ratio(&clean, 252.0), sharpe_ratio(&with_nan, 252.0));

        let with_zero = [0.01, 0.0, 0.02, -0.01, 0.03, 0.0];
        assert_ne!(sharpe_ratio(&clean, 252.0), sharpe_ratio(&with_zero, 252.0));
    }

    #[test]
    fn profit_factor_cases() {
        assert_abs_diff_eq!(profit_factor(&[0.03, -0.01, 0.03]), 6.0, epsilon = 1e-12);
        assert_eq!(profit_factor(&[0.01, 0.02]), f64::INFINITY);
        assert_eq!(profit_factor(&[0.0, 0.0]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[-0.01]), 0.0);
    }

    #[test]
    fn seed_bar_excluded_from_returns() {
        // Four realized returns; counting the seed bar would make five.
        let result = make_result(&[0.01, 0.02, 0.0, -0.01], &[]);
        let metrics = Metrics::compute(&result, &MetricsConfig::default());
        assert_eq!(metrics.sharpe, 0.0);
    }
}
