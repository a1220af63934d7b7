//! Sequential trading environment.
//!
//! A finite-horizon Markov process over one [`Series`]. The state is the
//! cursor (current bar) and the position held before the current decision.
//! Choosing a position at cursor `t` earns the return from `t` to `t+1`,
//! minus the cost of changing position, which is bar `t+1`'s net return in
//! [`backtest::run`](crate::domain::backtest::run).
//!
//! The environment owns copies of everything it reads and is advanced through
//! `&mut self`, so each instance has exactly one driver. Run independent
//! episodes in parallel by building one environment per worker.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::backtest::{BacktestConfig, validate_transaction_cost};
use crate::domain::bar::PriceField;
use crate::domain::error::SignalbenchError;
use crate::domain::normalizer::{self, NormStats};
use crate::domain::position::Position;
use crate::domain::series::Series;

/// Decisions are positions; discrete index 0/1/2 maps to short/flat/long.
pub type Action = Position;

/// First cursor of an episode: bar 0 has no prior return.
pub const START_CURSOR: usize = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentConfig {
    pub price_field: PriceField,
    pub transaction_cost: f64,
}

impl From<&BacktestConfig> for EnvironmentConfig {
    fn from(config: &BacktestConfig) -> Self {
        Self {
            price_field: config.price_field,
            transaction_cost: config.transaction_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentState {
    pub cursor: usize,
    pub previous_position: Position,
    pub observation: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub position: Position,
    pub cost: f64,
    pub next_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub terminal: bool,
    pub info: StepInfo,
}

#[derive(Debug)]
pub struct TradingEnvironment {
    timestamps: Vec<NaiveDateTime>,
    returns: Vec<f64>,
    observations: Vec<Vec<f64>>,
    stats: NormStats,
    transaction_cost: f64,
    state: EnvironmentState,
}

impl TradingEnvironment {
    /// Builds an environment from a series and normalization statistics
    /// fitted elsewhere (normally on training data).
    pub fn new(
        series: &Series,
        stats: NormStats,
        config: &EnvironmentConfig,
    ) -> Result<Self, SignalbenchError> {
        validate_transaction_cost(config.transaction_cost)?;
        if series.len() <= START_CURSOR {
            return Err(SignalbenchError::malformed(
                series.len(),
                "environment needs at least two bars",
            ));
        }

        let observations = normalizer::normalize_series(series, &stats)?;
        let state = EnvironmentState {
            cursor: START_CURSOR,
            previous_position: Position::Flat,
            observation: observations[START_CURSOR].clone(),
        };

        Ok(Self {
            timestamps: series.timestamps(),
            returns: series.log_returns(config.price_field),
            observations,
            stats,
            transaction_cost: config.transaction_cost,
            state,
        })
    }

    /// Builds an environment whose statistics are fitted on `series` itself.
    /// Only appropriate for training data.
    pub fn with_fitted_stats(
        series: &Series,
        feature_names: &[String],
        config: &EnvironmentConfig,
    ) -> Result<Self, SignalbenchError> {
        let stats = normalizer::fit(series, feature_names)?;
        Self::new(series, stats, config)
    }

    pub fn reset(&mut self) -> Vec<f64> {
        self.state = EnvironmentState {
            cursor: START_CURSOR,
            previous_position: Position::Flat,
            observation: self.observations[START_CURSOR].clone(),
        };
        self.state.observation.clone()
    }

    pub fn step(&mut self, action: Action) -> Step {
        let position = action;
        let cursor = self.state.cursor;

        if cursor + 1 >= self.len() {
            return Step {
                observation: self.state.observation.clone(),
                reward: 0.0,
                terminal: true,
                info: StepInfo {
                    position,
                    cost: 0.0,
                    next_return: 0.0,
                },
            };
        }

        let next_return = self.returns[cursor + 1];
        let trade = (position.value() - self.state.previous_position.value()).abs();
        let cost = self.transaction_cost * trade as f64;
        let reward = position.as_f64() * next_return - cost;

        self.state.previous_position = position;
        self.state.cursor = cursor + 1;
        self.state.observation = self.observations[cursor + 1].clone();

        if self.state.cursor + 1 >= self.len() {
            debug!(cursor = self.state.cursor, "episode reached last bar");
        }

        Step {
            observation: self.state.observation.clone(),
            reward,
            terminal: false,
            info: StepInfo {
                position,
                cost,
                next_return,
            },
        }
    }

    /// True once no further reward can be realized from the current cursor.
    pub fn is_done(&self) -> bool {
        self.state.cursor + 1 >= self.len()
    }

    pub fn state(&self) -> &EnvironmentState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn observation_dim(&self) -> usize {
        self.stats.dim()
    }

    pub fn stats(&self) -> &NormStats {
        &self.stats
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamps[self.state.cursor]
    }
}
