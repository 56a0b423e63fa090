//! Configuration validation.
//!
//! Validates all config fields before the engine is built.

use crate::domain::contract::RolloverRule;
use crate::domain::error::ContangoError;
use crate::ports::config_port::ConfigPort;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    validate_dates(config)?;
    validate_price_field(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    validate_target(config)?;
    validate_rule(config)?;
    validate_minute_skip(config)?;
    validate_periods(config)?;
    validate_quantity(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> ContangoError {
    ContangoError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    config.get_date("backtest", "begin_day")?;
    config.get_date("backtest", "end_day")?;
    Ok(())
}

fn validate_price_field(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    match config.get_string("backtest", "price_field") {
        Some(s) if s.trim().is_empty() => Err(ContangoError::ConfigMissing {
            section: "backtest".to_string(),
            key: "price_field".to_string(),
        }),
        _ => Ok(()),
    }
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    if config.get_double("backtest", "commission_per_trade", 0.0) < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_trade",
            "commission_per_trade must be non-negative",
        ));
    }
    if config.get_double("backtest", "commission_pct", 0.0) < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_pct",
            "commission_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    let value = config.get_double("backtest", "slippage_pct", 0.0);
    if !(0.0..100.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "slippage_pct",
            "slippage_pct must be in [0, 100)",
        ));
    }
    Ok(())
}

fn validate_target(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    let set: Vec<&str> = ["product", "index", "symbol"]
        .into_iter()
        .filter(|key| {
            config
                .get_string("strategy", key)
                .is_some_and(|v| !v.trim().is_empty())
        })
        .collect();

    match set.as_slice() {
        [] => Err(ContangoError::ConfigMissing {
            section: "strategy".to_string(),
            key: "product".to_string(),
        }),
        [_] => Ok(()),
        [_, extra, ..] => Err(invalid(
            "strategy",
            extra,
            "set exactly one of product, index or symbol",
        )),
    }
}

fn validate_rule(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    if let Some(rule) = config.get_string("strategy", "rule") {
        rule.parse::<RolloverRule>()?;
    }
    Ok(())
}

fn validate_minute_skip(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    if config.get_int("strategy", "minute_skip", 1) < 0 {
        return Err(invalid(
            "strategy",
            "minute_skip",
            "minute_skip must be non-negative",
        ));
    }
    Ok(())
}

fn validate_periods(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    let fast = config.get_int("strategy", "fast", 5);
    let slow = config.get_int("strategy", "slow", 20);
    if fast < 1 {
        return Err(invalid("strategy", "fast", "fast must be at least 1"));
    }
    if slow <= fast {
        return Err(invalid("strategy", "slow", "slow must be greater than fast"));
    }
    Ok(())
}

fn validate_quantity(config: &dyn ConfigPort) -> Result<(), ContangoError> {
    if config.get_int("strategy", "quantity", 1) < 1 {
        return Err(invalid("strategy", "quantity", "quantity must be at least 1"));
    }
    Ok(())
}
