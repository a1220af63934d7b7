//! Data access port traits.

use crate::domain::error::SignalbenchError;
use crate::domain::position::PositionSignal;
use crate::domain::series::Series;

/// Supplies a validated bar series produced by the feature pipeline.
pub trait SeriesSource {
    fn load_series(&self) -> Result<Series, SignalbenchError>;
}

/// Supplies a raw position signal (one integer per bar) produced by a model.
pub trait PositionSource {
    fn load_positions(&self) -> Result<PositionSignal, SignalbenchError>;
}
