//! Reading and validating INI run configuration.
//!
//! Everything is checked before a run starts, so a bad value fails fast with
//! the section and key that caused it.

use crate::domain::error::QuantError;
use crate::domain::parameters::{ParameterGrid, StrategyParameters};
use crate::ports::config_port::ConfigPort;

/// Capital and rate settings from `[backtest]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

/// Inputs for a mean-variance allocation from `[portfolio]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioInputs {
    pub expected_returns: Vec<f64>,
    pub covariance: Vec<Vec<f64>>,
    pub target_return: Option<f64>,
    pub allow_short: bool,
}

/// Validate every section present in `config`.
///
/// `[backtest]` is always checked; `[strategy]`, `[grid]` and `[portfolio]`
/// only when they carry keys.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), QuantError> {
    backtest_settings(config)?;
    if !config.keys("strategy").is_empty() {
        strategy_selection(config)?;
    }
    if !config.keys("grid").is_empty() {
        parameter_grid(config)?;
    }
    if !config.keys("portfolio").is_empty() {
        portfolio_inputs(config)?;
    }
    for store in ["sqlite", "postgres"] {
        if !config.keys(store).is_empty() {
            pool_size(config, store)?;
        }
    }
    Ok(())
}

pub fn backtest_settings(config: &dyn ConfigPort) -> Result<BacktestSettings, QuantError> {
    let initial_capital = number(config, "backtest", "initial_capital")?.unwrap_or(0.0);
    let risk_free_rate = number(config, "backtest", "risk_free_rate")?.unwrap_or(0.0);
    Ok(BacktestSettings {
        initial_capital,
        risk_free_rate,
    })
}

/// Strategy identifier and its parameter overrides from `[strategy]`.
pub fn strategy_selection(
    config: &dyn ConfigPort,
) -> Result<(String, StrategyParameters), QuantError> {
    let name = match config.get_string("strategy", "name") {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => return Err(missing("strategy", "name")),
    };
    Ok((name, strategy_parameters(config)?))
}

/// Numeric keys of `[strategy]`, everything except `name`.
pub fn strategy_parameters(config: &dyn ConfigPort) -> Result<StrategyParameters, QuantError> {
    let mut parameters = StrategyParameters::new();
    for key in config.keys("strategy") {
        if key == "name" {
            continue;
        }
        if let Some(value) = number(config, "strategy", &key)? {
            parameters.insert(&key, value);
        }
    }
    Ok(parameters)
}

/// Candidate lists from `[grid]`, one axis per key.
///
/// Axes are ordered by key name so sweeps are reproducible.
pub fn parameter_grid(config: &dyn ConfigPort) -> Result<ParameterGrid, QuantError> {
    let mut keys = config.keys("grid");
    keys.sort();

    let mut grid = ParameterGrid::new();
    for key in keys {
        let raw = config.get_string("grid", &key).unwrap_or_default();
        grid = grid.axis(&key, parse_list("grid", &key, &raw)?);
    }
    Ok(grid)
}

pub fn portfolio_inputs(config: &dyn ConfigPort) -> Result<PortfolioInputs, QuantError> {
    let raw_returns = config
        .get_string("portfolio", "expected_returns")
        .ok_or_else(|| missing("portfolio", "expected_returns"))?;
    let expected_returns = parse_list("portfolio", "expected_returns", &raw_returns)?;

    let raw_covariance = config
        .get_string("portfolio", "covariance")
        .ok_or_else(|| missing("portfolio", "covariance"))?;
    let covariance = parse_matrix("portfolio", "covariance", &raw_covariance)?;

    let n = expected_returns.len();
    if covariance.len() != n || covariance.iter().any(|row| row.len() != n) {
        return Err(invalid(
            "portfolio",
            "covariance",
            format!("covariance must be {n}x{n} to match expected_returns"),
        ));
    }

    Ok(PortfolioInputs {
        expected_returns,
        covariance,
        target_return: number(config, "portfolio", "target_return")?,
        allow_short: flag(config, "portfolio", "allow_short")?.unwrap_or(true),
    })
}

/// Connection pool size of a result store section. Defaults to 4.
pub fn pool_size(config: &dyn ConfigPort, section: &str) -> Result<u32, QuantError> {
    let Some(raw) = config.get_string(section, "pool_size") else {
        return Ok(4);
    };
    match raw.trim().parse::<u32>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(invalid(
            section,
            "pool_size",
            format!("{raw:?} is not a positive whole number"),
        )),
    }
}

/// `true`/`yes`/`on`/`1` or `false`/`no`/`off`/`0`, case-insensitive.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated list of finite numbers. Empty lists are rejected.
pub fn parse_list(section: &str, key: &str, raw: &str) -> Result<Vec<f64>, QuantError> {
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_number(section, key, s))
        .collect::<Result<Vec<f64>, QuantError>>()?;
    if values.is_empty() {
        return Err(invalid(section, key, format!("{key} must list at least one value")));
    }
    Ok(values)
}

/// Parse `|`-separated rows of comma-separated numbers.
pub fn parse_matrix(section: &str, key: &str, raw: &str) -> Result<Vec<Vec<f64>>, QuantError> {
    raw.split('|')
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .map(|row| parse_list(section, key, row))
        .collect()
}

fn number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, QuantError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_number(section, key, raw.trim()).map(Some),
    }
}

fn flag(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<bool>, QuantError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => parse_flag(&raw)
            .map(Some)
            .ok_or_else(|| invalid(section, key, format!("{raw:?} is not a boolean"))),
    }
}

fn parse_number(section: &str, key: &str, raw: &str) -> Result<f64, QuantError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(section, key, format!("{raw:?} is not a finite number"))),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> QuantError {
    QuantError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> QuantError {
    QuantError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}
