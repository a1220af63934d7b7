//! Side-by-side evaluation of several batch strategies on one series.

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::domain::backtest::{self, BacktestConfig, BacktestResult};
use crate::domain::error::SignalbenchError;
use crate::domain::metrics::{Metrics, MetricsConfig};
use crate::domain::position::to_signal;
use crate::domain::series::Series;
use crate::domain::strategy::BatchStrategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub strategy: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

pub fn evaluate(
    series: &Series,
    strategy: &dyn BatchStrategy,
    bt_config: &BacktestConfig,
) -> Result<BacktestResult, SignalbenchError> {
    let positions = strategy.produce_positions(series)?;
    backtest::run(series, &to_signal(&positions), bt_config)
}

/// Runs every strategy in parallel and ranks them by final equity, best
/// first. Any strategy error fails the whole comparison.
pub fn compare(
    series: &Series,
    strategies: &[Box<dyn BatchStrategy>],
    bt_config: &BacktestConfig,
    metrics_config: &MetricsConfig,
) -> Result<Vec<ComparisonRow>, SignalbenchError> {
    bt_config.validate()?;
    info!(
        strategies = strategies.len(),
        bars = series.len(),
        "comparing strategies"
    );

    let mut rows = strategies
        .par_iter()
        .map(|strategy| {
            let result = evaluate(series, strategy.as_ref(), bt_config)?;
            Ok(ComparisonRow {
                strategy: strategy.name().to_string(),
                metrics: Metrics::compute(&result, metrics_config),
            })
        })
        .collect::<Result<Vec<_>, SignalbenchError>>()?;

    rows.sort_by(|a, b| {
        b.metrics
            .final_equity
            .total_cmp(&a.metrics.final_equity)
            .then_with(|| a.strategy.cmp(&b.strategy))
    });
    Ok(rows)
}

/// The top-ranked row of a [`compare`] result.
pub fn best(rows: &[ComparisonRow]) -> Option<&ComparisonRow> {
    rows.first()
}
