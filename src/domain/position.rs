//! Signed exposure held over a bar.

use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::error::SignalbenchError;
use crate::domain::series::Series;

/// Desired exposure: short, flat or long one unit of notional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn value(self) -> i64 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.value() as f64
    }

    /// Maps any integer onto the nearest of -1, 0, 1.
    pub fn clamp(raw: i64) -> Position {
        match raw {
            i64::MIN..=-1 => Position::Short,
            0 => Position::Flat,
            _ => Position::Long,
        }
    }

    /// Exact conversion; `None` for anything outside [-1, 1].
    pub fn from_value(raw: i64) -> Option<Position> {
        match raw {
            -1 => Some(Position::Short),
            0 => Some(Position::Flat),
            1 => Some(Position::Long),
            _ => None,
        }
    }

    /// Discrete action index used by policy learners: 0 short, 1 flat, 2 long.
    pub fn from_action_index(index: usize) -> Option<Position> {
        match index {
            0 => Some(Position::Short),
            1 => Some(Position::Flat),
            2 => Some(Position::Long),
            _ => None,
        }
    }

    pub fn action_index(self) -> usize {
        (self.value() + 1) as usize
    }
}

impl From<Position> for i64 {
    fn from(p: Position) -> i64 {
        p.value()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Short => write!(f, "short"),
            Position::Flat => write!(f, "flat"),
            Position::Long => write!(f, "long"),
        }
    }
}

/// Raw integer signal for a slice of positions, as fed to the backtest engine.
pub fn to_signal(positions: &[Position]) -> Vec<i64> {
    positions.iter().map(|p| p.value()).collect()
}

/// A raw position signal as produced by a model. Timestamps, when the source
/// carries them, pin each value to a bar.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionSignal {
    pub values: Vec<i64>,
    pub timestamps: Option<Vec<NaiveDateTime>>,
}

impl PositionSignal {
    pub fn from_values(values: Vec<i64>) -> Self {
        Self {
            values,
            timestamps: None,
        }
    }

    /// The values, once every carried timestamp matches the series bar at the
    /// same index. Untimed signals are taken in row order.
    pub fn aligned_to(&self, series: &Series) -> Result<&[i64], SignalbenchError> {
        if let Some(timestamps) = &self.timestamps {
            if timestamps.len() != series.len() {
                return Err(SignalbenchError::LengthMismatch {
                    what: "position timestamps".into(),
                    series: series.len(),
                    other: timestamps.len(),
                });
            }
            for (i, (ts, bar)) in timestamps.iter().zip(series.bars()).enumerate() {
                if *ts != bar.timestamp {
                    return Err(SignalbenchError::malformed(
                        i,
                        format!(
                            "position timestamp {ts} does not match bar timestamp {}",
                            bar.timestamp
                        ),
                    ));
                }
            }
        }
        Ok(&self.values)
    }
}
