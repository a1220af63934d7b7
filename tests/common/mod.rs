#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use signalbench::domain::bar::Bar;
use signalbench::domain::error::SignalbenchError;
use signalbench::domain::position::PositionSignal;
pub use signalbench::domain::series::Series;
use signalbench::ports::data_port::{PositionSource, SeriesSource};
use std::fs;
use std::path::{Path, PathBuf};

pub const FEATURE: &str = "momentum";

pub fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn timestamp(i: usize) -> NaiveDateTime {
    start() + Duration::minutes(15 * i as i64)
}

pub fn make_bar(i: usize, close: f64, features: Vec<f64>) -> Bar {
    Bar {
        timestamp: timestamp(i),
        open: close,
        high: close,
        low: close,
        close,
        features,
    }
}

pub fn series_from_closes(closes: &[f64]) -> Series {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i, c, vec![]))
        .collect();
    Series::new(bars, vec![]).unwrap()
}

/// Closes plus one feature column: the previous bar's log return (NaN on the
/// first bar).
pub fn series_with_momentum(closes: &[f64]) -> Series {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let momentum = if i == 0 {
                f64::NAN
            } else {
                (c / closes[i - 1]).ln()
            };
            make_bar(i, c, vec![momentum])
        })
        .collect();
    Series::new(bars, vec![FEATURE.to_string()]).unwrap()
}

pub fn random_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;
    (0..n)
        .map(|_| {
            price *= 1.0 + rng.gen_range(-0.01..0.01);
            price
        })
        .collect()
}

pub fn series_csv(closes: &[f64]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,momentum\n");
    for (i, &c) in closes.iter().enumerate() {
        let momentum = if i == 0 {
            String::new()
        } else {
            (c / closes[i - 1]).ln().to_string()
        };
        out.push_str(&format!(
            "{},{c},{c},{c},{c},{momentum}\n",
            timestamp(i).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    out
}

pub fn timed_positions_csv(timestamps: &[NaiveDateTime], positions: &[i64]) -> String {
    let mut out = String::from("timestamp,position\n");
    for (ts, p) in timestamps.iter().zip(positions) {
        out.push_str(&format!("{},{p}\n", ts.format("%Y-%m-%d %H:%M:%S")));
    }
    out
}

pub fn positions_csv(positions: &[i64]) -> String {
    let mut out = String::from("position\n");
    for p in positions {
        out.push_str(&format!("{p}\n"));
    }
    out
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub struct MockSeriesSource {
    pub series: Option<Series>,
}

impl SeriesSource for MockSeriesSource {
    fn load_series(&self) -> Result<Series, SignalbenchError> {
        self.series.clone().ok_or_else(|| SignalbenchError::Data {
            reason: "no series".into(),
        })
    }
}

pub struct MockPositionSource {
    pub positions: Vec<i64>,
}

impl PositionSource for MockPositionSource {
    fn load_positions(&self) -> Result<PositionSignal, SignalbenchError> {
        Ok(PositionSignal::from_values(self.positions.clone()))
    }
}
