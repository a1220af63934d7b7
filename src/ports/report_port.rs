//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::ComparisonRow;
use crate::domain::error::SignalbenchError;
use crate::domain::metrics::Metrics;

/// Port for writing evaluation output. Implementations choose the encoding.
pub trait ReportPort {
    fn write_trajectory(
        &self,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), SignalbenchError>;

    fn write_comparison(
        &self,
        rows: &[ComparisonRow],
        output_path: &str,
    ) -> Result<(), SignalbenchError>;

    fn write_summary(
        &self,
        strategy: &str,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), SignalbenchError>;
}
