//! CSV and JSON report adapter implementing ReportPort.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::comparison::ComparisonRow;
use crate::domain::error::SignalbenchError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

const COMPARISON_HEADER: [&str; 9] = [
    "strategy",
    "final_equity",
    "total_return",
    "max_drawdown",
    "max_drawdown_duration",
    "sharpe",
    "profit_factor",
    "trade_count",
    "bars",
];

fn io_error(e: csv::Error) -> SignalbenchError {
    SignalbenchError::Io(std::io::Error::other(e))
}

fn create_parent(output_path: &str) -> Result<(), SignalbenchError> {
    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Writes trajectories and comparisons as CSV, summaries as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write_trajectory(
        &self,
        result: &BacktestResult,
        output_path: &str,
    ) -> Result<(), SignalbenchError> {
        create_parent(output_path)?;
        let mut wtr = csv::Writer::from_path(output_path).map_err(io_error)?;
        for record in &result.records {
            wtr.serialize(record).map_err(io_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_comparison(
        &self,
        rows: &[ComparisonRow],
        output_path: &str,
    ) -> Result<(), SignalbenchError> {
        create_parent(output_path)?;
        let mut wtr = csv::Writer::from_path(output_path).map_err(io_error)?;
        wtr.write_record(COMPARISON_HEADER).map_err(io_error)?;
        for row in rows {
            let m = &row.metrics;
            wtr.write_record([
                row.strategy.clone(),
                m.final_equity.to_string(),
                m.total_return.to_string(),
                m.max_drawdown.to_string(),
                m.max_drawdown_duration.to_string(),
                m.sharpe.to_string(),
                m.profit_factor.to_string(),
                m.trade_count.to_string(),
                m.bars.to_string(),
            ])
            .map_err(io_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn write_summary(
        &self,
        strategy: &str,
        metrics: &Metrics,
        output_path: &str,
    ) -> Result<(), SignalbenchError> {
        create_parent(output_path)?;
        let summary = ComparisonRow {
            strategy: strategy.to_string(),
            metrics: metrics.clone(),
        };
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| SignalbenchError::Io(std::io::Error::other(e)))?;
        fs::write(output_path, json)?;
        Ok(())
    }
}
