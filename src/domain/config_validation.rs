//! Configuration validation.
//!
//! Validates all config fields before a run.

use crate::domain::error::FxError;
use crate::domain::signal::RuleKind;
use crate::ports::config_port::ConfigPort;

const WINDOW_KEYS: [(&str, i64); 7] = [
    ("short_ma", 20),
    ("long_ma", 50),
    ("ema", 20),
    ("rsi", 14),
    ("bb_period", 20),
    ("atr", 14),
    ("volatility", 20),
];

pub fn validate_indicator_config(config: &dyn ConfigPort) -> Result<(), FxError> {
    validate_windows(config)?;
    validate_ma_order(config)?;
    validate_bb_stddev(config)?;
    validate_ewma_lambda(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), FxError> {
    validate_rule(config)?;
    validate_rsi_bounds(config)?;
    validate_distances(config)?;
    validate_reporting(config)?;
    validate_units(config)?;
    validate_atr_multiplier(config)?;
    validate_trend_bounds(config)?;
    Ok(())
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), FxError> {
    validate_indicator_config(config)?;
    validate_strategy_config(config)
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), FxError> {
    for (key, default) in WINDOW_KEYS {
        if config.get_int("indicators", key, default) <= 0 {
            return Err(FxError::invalid(
                "indicators",
                key,
                format!("{key} must be a positive window"),
            ));
        }
    }
    Ok(())
}

fn validate_ma_order(config: &dyn ConfigPort) -> Result<(), FxError> {
    let short = config.get_int("indicators", "short_ma", 20);
    let long = config.get_int("indicators", "long_ma", 50);
    if short >= long {
        return Err(FxError::invalid(
            "indicators",
            "short_ma",
            "short_ma must be less than long_ma",
        ));
    }
    Ok(())
}

/// Multipliers are held as hundredths; values are checked after rounding.
pub fn hundredths(value: f64) -> u32 {
    (value * 100.0).round() as u32
}

fn validate_bb_stddev(config: &dyn ConfigPort) -> Result<(), FxError> {
    let value = config.get_double("indicators", "bb_stddev", 2.0);
    if !(value > 0.0) || hundredths(value) == 0 {
        return Err(FxError::invalid(
            "indicators",
            "bb_stddev",
            "bb_stddev must be at least 0.01",
        ));
    }
    Ok(())
}

fn validate_ewma_lambda(config: &dyn ConfigPort) -> Result<(), FxError> {
    let value = config.get_double("indicators", "ewma_lambda", 0.94);
    if !(value > 0.0 && value < 1.0) || !(1..=99).contains(&hundredths(value)) {
        return Err(FxError::invalid(
            "indicators",
            "ewma_lambda",
            "ewma_lambda must lie in 0.01..=0.99",
        ));
    }
    Ok(())
}

fn validate_rule(config: &dyn ConfigPort) -> Result<(), FxError> {
    if let Some(name) = config.get_string("strategy", "rule") {
        name.parse::<RuleKind>()
            .map_err(|reason| FxError::invalid("strategy", "rule", reason))?;
    }
    Ok(())
}

fn validate_rsi_bounds(config: &dyn ConfigPort) -> Result<(), FxError> {
    let oversold = config.get_double("strategy", "rsi_oversold", 30.0);
    let overbought = config.get_double("strategy", "rsi_overbought", 70.0);
    if !(0.0..=100.0).contains(&oversold) {
        return Err(FxError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be between 0 and 100",
        ));
    }
    if !(0.0..=100.0).contains(&overbought) {
        return Err(FxError::invalid(
            "strategy",
            "rsi_overbought",
            "rsi_overbought must be between 0 and 100",
        ));
    }
    if oversold >= overbought {
        return Err(FxError::invalid(
            "strategy",
            "rsi_oversold",
            "rsi_oversold must be less than rsi_overbought",
        ));
    }
    Ok(())
}

fn validate_distances(config: &dyn ConfigPort) -> Result<(), FxError> {
    for (key, default) in [("take_profit", 0.0030), ("stop_loss", 0.0020)] {
        let value = config.get_double("strategy", key, default);
        if !(value > 0.0) {
            return Err(FxError::invalid(
                "strategy",
                key,
                format!("{key} must be a positive price distance"),
            ));
        }
    }
    Ok(())
}

fn validate_reporting(config: &dyn ConfigPort) -> Result<(), FxError> {
    if let Some(name) = config.get_string("strategy", "reporting") {
        match name.trim().to_lowercase().as_str() {
            "pips" | "compounding" => {}
            other => {
                return Err(FxError::invalid(
                    "strategy",
                    "reporting",
                    format!("unknown reporting mode '{other}' (expected pips or compounding)"),
                ));
            }
        }
    }
    let pip_factor = config.get_double("strategy", "pip_factor", 10_000.0);
    if !(pip_factor > 0.0) {
        return Err(FxError::invalid(
            "strategy",
            "pip_factor",
            "pip_factor must be positive",
        ));
    }
    Ok(())
}

fn validate_units(config: &dyn ConfigPort) -> Result<(), FxError> {
    if config.get_int("strategy", "units", 1000) <= 0 {
        return Err(FxError::invalid(
            "strategy",
            "units",
            "units must be positive",
        ));
    }
    Ok(())
}

fn validate_atr_multiplier(config: &dyn ConfigPort) -> Result<(), FxError> {
    let value = config.get_double("strategy", "atr_stop_multiplier", 1.5);
    if !(value >= 0.0) {
        return Err(FxError::invalid(
            "strategy",
            "atr_stop_multiplier",
            "atr_stop_multiplier must be non-negative",
        ));
    }
    Ok(())
}

fn validate_trend_bounds(config: &dyn ConfigPort) -> Result<(), FxError> {
    let buy = config.get_double("strategy", "trend_rsi_buy", 55.0);
    let sell = config.get_double("strategy", "trend_rsi_sell", 50.0);
    if sell > buy {
        return Err(FxError::invalid(
            "strategy",
            "trend_rsi_sell",
            "trend_rsi_sell must not exceed trend_rsi_buy",
        ));
    }
    Ok(())
}
