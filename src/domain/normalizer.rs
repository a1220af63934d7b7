//! Per-feature standardization.
//!
//! Statistics are fitted once on training data and then reused unchanged for
//! every later normalization, so evaluation data never leaks into them.

use serde::{Deserialize, Serialize};

use crate::domain::error::SignalbenchError;
use crate::domain::series::Series;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl NormStats {
    /// Builds statistics supplied from outside (e.g. saved model metadata).
    /// Zero standard deviations are replaced by 1.0.
    pub fn new(
        feature_names: Vec<String>,
        mean: Vec<f64>,
        std: Vec<f64>,
    ) -> Result<Self, SignalbenchError> {
        if mean.len() != feature_names.len() || std.len() != feature_names.len() {
            return Err(SignalbenchError::configuration(format!(
                "normalization stats have {} means and {} stds for {} features",
                mean.len(),
                std.len(),
                feature_names.len()
            )));
        }
        if let Some(i) = mean.iter().chain(&std).position(|v| !v.is_finite()) {
            let name = &feature_names[i % feature_names.len()];
            return Err(SignalbenchError::configuration(format!(
                "normalization stats for '{name}' are not finite"
            )));
        }
        let std = std.into_iter().map(substitute_zero_std).collect();
        Ok(Self {
            feature_names,
            mean,
            std,
        })
    }

    pub fn dim(&self) -> usize {
        self.feature_names.len()
    }
}

fn substitute_zero_std(std: f64) -> f64 {
    if std == 0.0 { 1.0 } else { std }
}

/// Mean and population standard deviation of every named feature over all
/// bars. Missing (non-finite) values are skipped rather than counted as zero.
pub fn fit(series: &Series, feature_names: &[String]) -> Result<NormStats, SignalbenchError> {
    let mut mean = Vec::with_capacity(feature_names.len());
    let mut std = Vec::with_capacity(feature_names.len());

    for name in feature_names {
        let column = series.feature_column(name).ok_or_else(|| {
            SignalbenchError::configuration(format!("series has no feature column '{name}'"))
        })?;
        let finite: Vec<f64> = column.into_iter().filter(|v| v.is_finite()).collect();

        if finite.is_empty() {
            mean.push(0.0);
            std.push(1.0);
            continue;
        }

        let n = finite.len() as f64;
        let m = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
        mean.push(m);
        std.push(substitute_zero_std(variance.sqrt()));
    }

    Ok(NormStats {
        feature_names: feature_names.to_vec(),
        mean,
        std,
    })
}

/// `(x - mean) / std` elementwise. Non-finite results become 0.0.
pub fn apply(features: &[f64], stats: &NormStats) -> Result<Vec<f64>, SignalbenchError> {
    if features.len() != stats.dim() {
        return Err(SignalbenchError::configuration(format!(
            "feature vector has {} values, normalization stats expect {}",
            features.len(),
            stats.dim()
        )));
    }
    Ok(features
        .iter()
        .zip(stats.mean.iter().zip(&stats.std))
        .map(|(x, (m, s))| {
            let z = (x - m) / s;
            if z.is_finite() { z } else { 0.0 }
        })
        .collect())
}

/// Normalizes every bar of `series`, selecting the stats' feature columns by
/// name so the column order of the series itself does not matter.
pub fn normalize_series(
    series: &Series,
    stats: &NormStats,
) -> Result<Vec<Vec<f64>>, SignalbenchError> {
    let indices = stats
        .feature_names
        .iter()
        .map(|name| {
            series.feature_index(name).ok_or_else(|| {
                SignalbenchError::configuration(format!(
                    "series has no feature column '{name}' required by normalization stats"
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    series
        .bars()
        .iter()
        .map(|bar| {
            let selected: Vec<f64> = indices.iter().map(|&i| bar.features[i]).collect();
            apply(&selected, stats)
        })
        .collect()
}
