//! Configuration validation.
//!
//! Validates every evaluation setting before any series is touched.

use crate::domain::bar::PriceField;
use crate::domain::error::SignalbenchError;
use crate::ports::config_port::{ConfigPort, parse_bool};

pub fn validate_evaluation_config(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    validate_price_field(config)?;
    validate_transaction_cost(config)?;
    validate_strict_positions(config)?;
    validate_periods_per_year(config)?;
    validate_rule(config)?;
    validate_probability_band(config)?;
    validate_seed(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SignalbenchError {
    SignalbenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Parses an optional numeric key, reporting unparsable or non-finite text
/// instead of silently falling back to the default.
fn parse_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, SignalbenchError> {
    let Some(s) = config.get_string(section, key) else {
        return Ok(None);
    };
    match s.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Err(invalid(section, key, format!("'{s}' must be a finite number"))),
        Err(_) => Err(invalid(section, key, format!("'{s}' is not a number"))),
    }
}

fn validate_price_field(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(s) = config.get_string("backtest", "price_field") {
        s.parse::<PriceField>()
            .map_err(|e| invalid("backtest", "price_field", e.to_string()))?;
    }
    Ok(())
}

fn validate_transaction_cost(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(cost) = parse_f64(config, "backtest", "transaction_cost")? {
        if !cost.is_finite() || cost < 0.0 {
            return Err(invalid(
                "backtest",
                "transaction_cost",
                "transaction_cost must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_strict_positions(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(s) = config.get_string("backtest", "strict_positions") {
        if parse_bool(&s).is_none() {
            return Err(invalid(
                "backtest",
                "strict_positions",
                format!("'{s}' is not a boolean"),
            ));
        }
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(v) = parse_f64(config, "metrics", "periods_per_year")? {
        if !v.is_finite() || v <= 0.0 {
            return Err(invalid(
                "metrics",
                "periods_per_year",
                "periods_per_year must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_rule(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let overbought = parse_f64(config, "rule", "overbought")?.unwrap_or(70.0);
    let oversold = parse_f64(config, "rule", "oversold")?.unwrap_or(30.0);
    if oversold >= overbought {
        return Err(invalid(
            "rule",
            "oversold",
            "oversold must be below overbought",
        ));
    }

    for key in ["fast_period", "slow_period", "oscillator_period"] {
        if let Some(s) = config.get_string("rule", key) {
            match s.trim().parse::<usize>() {
                Ok(p) if p > 0 => {}
                _ => return Err(invalid("rule", key, "period must be a positive integer")),
            }
        }
    }

    for key in ["fast_feature", "slow_feature", "oscillator_feature"] {
        if let Some(s) = config.get_string("rule", key) {
            if s.trim().is_empty() {
                return Err(invalid("rule", key, "feature name must not be empty"));
            }
        }
    }
    Ok(())
}

fn validate_probability_band(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let long_above = parse_f64(config, "probability", "long_above")?.unwrap_or(0.55);
    let short_below = parse_f64(config, "probability", "short_below")?.unwrap_or(0.45);
    if short_below > long_above {
        return Err(invalid(
            "probability",
            "short_below",
            "short_below must not exceed long_above",
        ));
    }
    Ok(())
}

fn validate_seed(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(s) = config.get_string("random", "seed") {
        s.trim()
            .parse::<u64>()
            .map_err(|_| invalid("random", "seed", "seed must be a non-negative integer"))?;
    }
    Ok(())
}
