//! Saved model metadata consumed at construction time.
//!
//! A trained model ships the feature list it was fitted on, the training-set
//! normalization statistics, and the transaction cost it was trained with.

use serde::{Deserialize, Serialize};

use crate::domain::backtest::validate_transaction_cost;
use crate::domain::error::SignalbenchError;
use crate::domain::normalizer::NormStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    #[serde(default)]
    pub algo: Option<String>,
    pub features: Vec<String>,
    pub norm_mean: Vec<f64>,
    pub norm_std: Vec<f64>,
    pub transaction_cost: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ModelMetadata {
    pub fn validate(&self) -> Result<(), SignalbenchError> {
        validate_transaction_cost(self.transaction_cost)?;
        self.norm_stats().map(|_| ())
    }

    pub fn norm_stats(&self) -> Result<NormStats, SignalbenchError> {
        NormStats::new(
            self.features.clone(),
            self.norm_mean.clone(),
            self.norm_std.clone(),
        )
    }

    pub fn from_stats(stats: &NormStats, transaction_cost: f64) -> Self {
        Self {
            algo: None,
            features: stats.feature_names.clone(),
            norm_mean: stats.mean.clone(),
            norm_std: stats.std.clone(),
            transaction_cost,
            seed: None,
        }
    }
}
