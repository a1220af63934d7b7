//! Immutable bar series and the preprocessing contract it enforces.
//!
//! A [`Series`] can only be built from bars that are already sorted by
//! strictly increasing timestamp, carry positive finite prices, and have one
//! value per named feature column. Repairing bad input belongs to the feature
//! pipeline, so construction fails with `MalformedSeries` instead.

use chrono::NaiveDateTime;

use crate::domain::bar::{Bar, PriceField};
use crate::domain::error::SignalbenchError;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    bars: Vec<Bar>,
    feature_names: Vec<String>,
}

impl Series {
    pub fn new(bars: Vec<Bar>, feature_names: Vec<String>) -> Result<Self, SignalbenchError> {
        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(SignalbenchError::configuration(format!(
                    "duplicate feature column '{name}'"
                )));
            }
        }

        for (i, bar) in bars.iter().enumerate() {
            bar.check_prices()
                .map_err(|reason| SignalbenchError::malformed(i, reason))?;
            if bar.features.len() != feature_names.len() {
                return Err(SignalbenchError::malformed(
                    i,
                    format!(
                        "bar has {} feature values, expected {}",
                        bar.features.len(),
                        feature_names.len()
                    ),
                ));
            }
            if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
                let reason = if bar.timestamp == bars[i - 1].timestamp {
                    format!("duplicate timestamp {}", bar.timestamp)
                } else {
                    format!(
                        "timestamp {} precedes {}",
                        bar.timestamp,
                        bars[i - 1].timestamp
                    )
                };
                return Err(SignalbenchError::malformed(i, reason));
            }
        }

        Ok(Self {
            bars,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    pub fn feature_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.feature_index(name)?;
        Some(self.bars.iter().map(|b| b.features[idx]).collect())
    }

    pub fn prices(&self, field: PriceField) -> Vec<f64> {
        self.bars.iter().map(|b| b.price(field)).collect()
    }

    /// `ln(p[i]) - ln(p[i-1])`, with 0.0 at index 0 where no prior bar exists.
    pub fn log_returns(&self, field: PriceField) -> Vec<f64> {
        let mut returns = Vec::with_capacity(self.bars.len());
        for i in 0..self.bars.len() {
            if i == 0 {
                returns.push(0.0);
            } else {
                let prev = self.bars[i - 1].price(field);
                let curr = self.bars[i].price(field);
                returns.push(curr.ln() - prev.ln());
            }
        }
        returns
    }

    /// Returns a copy of this series with one more feature column appended.
    pub fn with_feature(&self, name: &str, values: &[f64]) -> Result<Series, SignalbenchError> {
        if values.len() != self.bars.len() {
            return Err(SignalbenchError::LengthMismatch {
                what: format!("feature '{name}'"),
                series: self.bars.len(),
                other: values.len(),
            });
        }
        let mut feature_names = self.feature_names.clone();
        feature_names.push(name.to_string());
        let bars = self
            .bars
            .iter()
            .zip(values)
            .map(|(bar, &v)| {
                let mut bar = bar.clone();
                bar.features.push(v);
                bar
            })
            .collect();
        Series::new(bars, feature_names)
    }
}
