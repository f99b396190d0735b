//! Configuration validation.
//!
//! Checks the numeric and date fields of `[backtest]` and `[strategy]`
//! before any data is loaded. Symbolic choices (data type, strategy name)
//! are checked where they are parsed.

use crate::domain::error::BacktestError;
use crate::domain::observation::parse_timestamp;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::check_range;
use chrono::NaiveDateTime;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_capital(config)?;
    validate_window(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_buy_probability(config)?;
    parse_seed(config)?;
    Ok(())
}

/// `[data] path` must be present.
pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    match config.get_value("data", "path") {
        Some(_) => Ok(()),
        None => Err(BacktestError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn validate_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if config.get_value("backtest", "capital").is_none() {
        return Ok(());
    }
    let value = config.get_double("backtest", "capital", f64::NAN);
    if !value.is_finite() || value <= 0.0 {
        return Err(BacktestError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "capital".to_string(),
            reason: "capital must be a positive number".to_string(),
        });
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    check_range(start, end)
}

fn validate_buy_probability(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if config.get_value("strategy", "buy_probability").is_none() {
        return Ok(());
    }
    let value = config.get_double("strategy", "buy_probability", f64::NAN);
    if !(0.0..=1.0).contains(&value) {
        return Err(BacktestError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "buy_probability".to_string(),
            reason: "buy_probability must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

/// Optional `[backtest] <key>` as a timestamp.
pub fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDateTime>, BacktestError> {
    match config.get_value("backtest", key) {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| BacktestError::ConfigInvalid {
                section: "backtest".to_string(),
                key: key.to_string(),
                reason: format!("invalid {key} format, expected YYYY-MM-DD [HH:MM[:SS]]"),
            }),
    }
}

/// Optional `[strategy] seed` as an unsigned integer.
pub fn parse_seed(config: &dyn ConfigPort) -> Result<Option<u64>, BacktestError> {
    match config.get_value("strategy", "seed") {
        None => Ok(None),
        Some(s) => s
            .parse::<u64>()
            .map(Some)
            .map_err(|_| BacktestError::ConfigInvalid {
                section: "strategy".to_string(),
                key: "seed".to_string(),
                reason: "seed must be a non-negative integer".to_string(),
            }),
    }
}
