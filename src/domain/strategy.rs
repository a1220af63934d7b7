//! Strategy capabilities.
//!
//! A [`BatchStrategy`] turns a whole series into one position per bar and is
//! evaluated with the backtest engine. A [`Policy`] decides one action at a
//! time from an environment observation and is evaluated by [`rollout`].

use crate::domain::environment::{Action, TradingEnvironment};
use crate::domain::error::SignalbenchError;
use crate::domain::position::Position;
use crate::domain::series::Series;

pub trait BatchStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// One position per bar, each decided from information up to and
    /// including that bar.
    fn produce_positions(&self, series: &Series) -> Result<Vec<Position>, SignalbenchError>;
}

pub trait Policy {
    fn name(&self) -> &str;

    fn act(&mut self, observation: &[f64]) -> Action;
}

/// Outcome of driving one environment from reset to termination.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    /// Aligned with the series: index 0 is flat (no decision is taken before
    /// the first return exists), index `t` is the action chosen at cursor `t`.
    pub positions: Vec<Position>,
    pub rewards: Vec<f64>,
    pub total_reward: f64,
}

impl Episode {
    pub fn steps(&self) -> usize {
        self.rewards.len()
    }
}

pub fn rollout(env: &mut TradingEnvironment, policy: &mut dyn Policy) -> Episode {
    let mut observation = env.reset();
    let mut positions = vec![Position::Flat; env.len()];
    let mut rewards = Vec::with_capacity(env.len().saturating_sub(2));

    loop {
        let cursor = env.state().cursor;
        let action = policy.act(&observation);
        positions[cursor] = action;

        let step = env.step(action);
        if step.terminal {
            break;
        }
        rewards.push(step.reward);
        observation = step.observation;
    }

    let total_reward = rewards.iter().sum();
    Episode {
        positions,
        rewards,
        total_reward,
    }
}
