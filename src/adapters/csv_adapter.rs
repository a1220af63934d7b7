//! CSV file data adapters.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;

use crate::domain::bar::Bar;
use crate::domain::error::SignalbenchError;
use crate::domain::position::PositionSignal;
use crate::domain::series::Series;
use crate::ports::data_port::{PositionSource, SeriesSource};

const PRICE_COLUMNS: [&str; 5] = ["timestamp", "open", "high", "low", "close"];

fn data_error(reason: impl Into<String>) -> SignalbenchError {
    SignalbenchError::Data {
        reason: reason.into(),
    }
}

fn read_file(path: &PathBuf) -> Result<String, SignalbenchError> {
    fs::read_to_string(path)
        .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Empty and `NaN` cells are missing values.
fn parse_cell(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    s.parse().ok()
}

/// Reads a bar series with header `timestamp,open,high,low,close,...`.
/// Every column after the price columns is a feature, in header order.
pub struct CsvSeriesAdapter {
    path: PathBuf,
}

impl CsvSeriesAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn column_positions(headers: &StringRecord) -> Result<[usize; 5], SignalbenchError> {
        let mut positions = [0usize; 5];
        for (slot, name) in positions.iter_mut().zip(PRICE_COLUMNS) {
            *slot = find_column(headers, name)
                .ok_or_else(|| data_error(format!("missing {name} column")))?;
        }
        Ok(positions)
    }
}

impl SeriesSource for CsvSeriesAdapter {
    fn load_series(&self) -> Result<Series, SignalbenchError> {
        let content = read_file(&self.path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error: {}", e)))?
            .clone();
        let [ts_col, open_col, high_col, low_col, close_col] = Self::column_positions(&headers)?;
        let price_cols = [ts_col, open_col, high_col, low_col, close_col];
        let feature_cols: Vec<usize> = (0..headers.len())
            .filter(|i| !price_cols.contains(i))
            .collect();
        let feature_names: Vec<String> = feature_cols
            .iter()
            .map(|&i| headers[i].trim().to_string())
            .collect();

        let mut bars = Vec::new();
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let field = |col: usize| record.get(col).unwrap_or("");

            let timestamp = parse_timestamp(field(ts_col)).ok_or_else(|| {
                data_error(format!(
                    "row {}: invalid timestamp '{}'",
                    row + 1,
                    field(ts_col)
                ))
            })?;

            let price = |col: usize, name: &str| -> Result<f64, SignalbenchError> {
                field(col).trim().parse::<f64>().map_err(|e| {
                    data_error(format!("row {}: invalid {} value: {}", row + 1, name, e))
                })
            };

            let features = feature_cols
                .iter()
                .zip(&feature_names)
                .map(|(&col, name)| {
                    parse_cell(field(col)).ok_or_else(|| {
                        data_error(format!(
                            "row {}: invalid {} value '{}'",
                            row + 1,
                            name,
                            field(col)
                        ))
                    })
                })
                .collect::<Result<Vec<f64>, _>>()?;

            bars.push(Bar {
                timestamp,
                open: price(open_col, "open")?,
                high: price(high_col, "high")?,
                low: price(low_col, "low")?,
                close: price(close_col, "close")?,
                features,
            });
        }

        Series::new(bars, feature_names)
    }
}

/// Reads a position signal from a `position` column, with an optional
/// `timestamp` column that pins each row to a bar. Other columns are ignored.
/// Values outside [-1, 1] are passed through for the engine to clamp or
/// reject.
pub struct CsvPositionAdapter {
    path: PathBuf,
}

impl CsvPositionAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn parse_position(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

impl PositionSource for CsvPositionAdapter {
    fn load_positions(&self) -> Result<PositionSignal, SignalbenchError> {
        let content = read_file(&self.path)?;
        let mut rdr = csv::Reader::from_reader(content.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error: {}", e)))?
            .clone();
        let col = find_column(&headers, "position")
            .ok_or_else(|| data_error("missing position column"))?;
        let ts_col = find_column(&headers, "timestamp");

        let mut values = Vec::new();
        let mut timestamps = ts_col.map(|_| Vec::new());
        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {}", e)))?;
            let raw = record.get(col).unwrap_or("");
            let value = parse_position(raw).ok_or_else(|| {
                data_error(format!("row {}: invalid position '{}'", row + 1, raw))
            })?;
            values.push(value);

            if let (Some(c), Some(ts)) = (ts_col, timestamps.as_mut()) {
                let raw_ts = record.get(c).unwrap_or("");
                ts.push(parse_timestamp(raw_ts).ok_or_else(|| {
                    data_error(format!("row {}: invalid timestamp '{}'", row + 1, raw_ts))
                })?);
            }
        }
        Ok(PositionSignal { values, timestamps })
    }
}
