//! Reference strategies and policies used to benchmark learned models.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::bar::PriceField;
use crate::domain::environment::Action;
use crate::domain::error::SignalbenchError;
use crate::domain::indicator::IndicatorType;
use crate::domain::position::Position;
use crate::domain::series::Series;
use crate::domain::strategy::{BatchStrategy, Policy};

pub const DEFAULT_SEED: u64 = 42;

pub struct AlwaysLong;

impl BatchStrategy for AlwaysLong {
    fn name(&self) -> &str {
        "always_long"
    }

    fn produce_positions(&self, series: &Series) -> Result<Vec<Position>, SignalbenchError> {
        Ok(vec![Position::Long; series.len()])
    }
}

pub struct AlwaysFlat;

impl BatchStrategy for AlwaysFlat {
    fn name(&self) -> &str {
        "always_flat"
    }

    fn produce_positions(&self, series: &Series) -> Result<Vec<Position>, SignalbenchError> {
        Ok(vec![Position::Flat; series.len()])
    }
}

/// Uniform draws from {-1, 0, 1}. The same seed always yields the same
/// sequence for the same series length.
pub struct RandomPositions {
    pub seed: u64,
}

impl BatchStrategy for RandomPositions {
    fn name(&self) -> &str {
        "random"
    }

    fn produce_positions(&self, series: &Series) -> Result<Vec<Position>, SignalbenchError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..series.len())
            .map(|_| Position::clamp(rng.gen_range(-1i64..=1)))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    pub fast_feature: String,
    pub slow_feature: String,
    pub oscillator_feature: String,
    pub fast_period: usize,
    pub slow_period: usize,
    pub oscillator_period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            fast_feature: "ema_20".into(),
            slow_feature: "ema_50".into(),
            oscillator_feature: "rsi_14".into(),
            fast_period: 20,
            slow_period: 50,
            oscillator_period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

/// Long when the fast trend line is above the slow one and the oscillator is
/// not overbought; short on the mirrored condition; flat otherwise.
///
/// Feature columns are read from the series when present. A missing column is
/// derived from the configured price (EMA for the trend lines, RSI for the
/// oscillator); its warm-up bars stay flat.
pub struct TrendMomentumRule {
    pub config: RuleConfig,
    pub price_field: PriceField,
}

impl TrendMomentumRule {
    pub fn new(config: RuleConfig) -> Self {
        Self {
            config,
            price_field: PriceField::Close,
        }
    }

    fn column(&self, series: &Series, name: &str, indicator: IndicatorType) -> Vec<f64> {
        match series.feature_column(name) {
            Some(values) => values,
            None => {
                info!(feature = name, %indicator, "feature column missing, deriving from prices");
                indicator.compute(&series.prices(self.price_field))
            }
        }
    }
}

impl BatchStrategy for TrendMomentumRule {
    fn name(&self) -> &str {
        "trend_momentum"
    }

    fn produce_positions(&self, series: &Series) -> Result<Vec<Position>, SignalbenchError> {
        let c = &self.config;
        let fast = self.column(series, &c.fast_feature, IndicatorType::Ema(c.fast_period));
        let slow = self.column(series, &c.slow_feature, IndicatorType::Ema(c.slow_period));
        let osc = self.column(
            series,
            &c.oscillator_feature,
            IndicatorType::Rsi(c.oscillator_period),
        );

        Ok(fast
            .iter()
            .zip(&slow)
            .zip(&osc)
            .map(|((&f, &s), &o)| {
                if f > s && o < c.overbought {
                    Position::Long
                } else if f < s && o > c.oversold {
                    Position::Short
                } else {
                    Position::Flat
                }
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityConfig {
    pub feature: String,
    pub long_above: f64,
    pub short_below: f64,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            feature: "proba_up".into(),
            long_above: 0.55,
            short_below: 0.45,
        }
    }
}

/// Dead-band mapping of a classifier's "price goes up" probability onto a
/// position.
pub struct ProbabilityBand {
    pub config: ProbabilityConfig,
}

impl BatchStrategy for ProbabilityBand {
    fn name(&self) -> &str {
        "probability_band"
    }

    fn produce_positions(&self, series: &Series) -> Result<Vec<Position>, SignalbenchError> {
        let c = &self.config;
        let proba = series.feature_column(&c.feature).ok_or_else(|| {
            SignalbenchError::configuration(format!(
                "series has no probability column '{}'",
                c.feature
            ))
        })?;

        Ok(proba
            .into_iter()
            .map(|p| {
                if p > c.long_above {
                    Position::Long
                } else if p < c.short_below {
                    Position::Short
                } else {
                    Position::Flat
                }
            })
            .collect())
    }
}

/// Always answers with the same action.
pub struct ConstantPolicy {
    pub action: Action,
}

impl Policy for ConstantPolicy {
    fn name(&self) -> &str {
        match self.action {
            Position::Long => "constant_long",
            Position::Flat => "constant_flat",
            Position::Short => "constant_short",
        }
    }

    fn act(&mut self, _observation: &[f64]) -> Action {
        self.action
    }
}

/// Uniformly random actions from a seeded generator.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn act(&mut self, _observation: &[f64]) -> Action {
        Position::clamp(self.rng.gen_range(-1i64..=1))
    }
}

/// Replays a fixed action list, then stays flat.
pub struct ScriptedPolicy {
    actions: Vec<Action>,
    next: usize,
}

impl ScriptedPolicy {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, next: 0 }
    }
}

impl Policy for ScriptedPolicy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn act(&mut self, _observation: &[f64]) -> Action {
        let action = self.actions.get(self.next).copied().unwrap_or(Position::Flat);
        self.next += 1;
        action
    }
}
