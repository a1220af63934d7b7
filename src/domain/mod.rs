//! Core domain types and logic.

pub mod bar;
pub mod series;
pub mod normalizer;
pub mod position;
pub mod backtest;
pub mod metrics;
pub mod environment;
pub mod strategy;
pub mod baselines;
pub mod indicator;
pub mod comparison;
pub mod model_metadata;
pub mod config_validation;
pub mod error;
