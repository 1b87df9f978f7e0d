//! Closed-form Black-Scholes pricing of European options.
//!
//! Registered alongside the signal strategies so it can be looked up by name,
//! but it never produces trading signals.

use crate::domain::error::QuantError;
use crate::domain::parameters::StrategyParameters;
use crate::domain::strategy::Strategy;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

impl FromStr for OptionType {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "call" => Ok(OptionType::Call),
            "put" => Ok(OptionType::Put),
            other => Err(QuantError::invalid_parameter(
                BlackScholesPricer::NAME,
                "option_type",
                format!("expected call or put, got {other:?}"),
            )),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// Market data and contract terms for one valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionParameters {
    pub spot: f64,
    pub strike: f64,
    /// Years to expiry.
    pub time_to_maturity: f64,
    /// Continuously compounded annual rate.
    pub risk_free_rate: f64,
    /// Annualised volatility.
    pub volatility: f64,
    pub option_type: OptionType,
}

impl OptionParameters {
    /// Copy of `self` with the scenario's numeric overrides and option type applied.
    pub fn apply(&self, scenario: &OptionScenario) -> Result<OptionParameters, QuantError> {
        let mut out = *self;
        for (name, value) in scenario.overrides.iter() {
            match name {
                "spot" => out.spot = value,
                "strike" => out.strike = value,
                "time_to_maturity" => out.time_to_maturity = value,
                "risk_free_rate" => out.risk_free_rate = value,
                "volatility" => out.volatility = value,
                _ => {
                    return Err(QuantError::UnknownParameter {
                        strategy: BlackScholesPricer::NAME.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
        if let Some(option_type) = scenario.option_type {
            out.option_type = option_type;
        }
        Ok(out)
    }
}

/// Partial overrides of a base [`OptionParameters`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionScenario {
    pub overrides: StrategyParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_type: Option<OptionType>,
}

impl OptionScenario {
    pub fn new(overrides: StrategyParameters) -> Self {
        Self {
            overrides,
            option_type: None,
        }
    }

    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = Some(option_type);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlackScholesPricer {
    parameters: StrategyParameters,
}

impl BlackScholesPricer {
    pub const NAME: &'static str = "black_scholes";

    pub fn new() -> Self {
        Self::default()
    }

    /// Registry constructor. The pricer takes no strategy parameters.
    pub fn boxed(parameters: &StrategyParameters) -> Result<Box<dyn Strategy>, QuantError> {
        let parameters = parameters.resolve(Self::NAME, &[])?;
        Ok(Box::new(Self { parameters }))
    }

    pub fn price(&self, params: &OptionParameters) -> Result<f64, QuantError> {
        let d1 = d1(params)?;
        let d2 = d1 - params.volatility * params.time_to_maturity.sqrt();
        let discounted_strike =
            params.strike * (-params.risk_free_rate * params.time_to_maturity).exp();

        let price = match params.option_type {
            OptionType::Call => norm_cdf(d1) * params.spot - norm_cdf(d2) * discounted_strike,
            OptionType::Put => norm_cdf(-d2) * discounted_strike - norm_cdf(-d1) * params.spot,
        };
        Ok(price)
    }
}

impl Strategy for BlackScholesPricer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> &StrategyParameters {
        &self.parameters
    }
}

fn d1(params: &OptionParameters) -> Result<f64, QuantError> {
    if !(params.spot > 0.0 && params.strike > 0.0) {
        return Err(QuantError::DegenerateOption {
            reason: "spot and strike must be positive".into(),
        });
    }
    if !(params.volatility > 0.0 && params.time_to_maturity > 0.0) {
        return Err(QuantError::DegenerateOption {
            reason: "volatility and time to maturity must be positive".into(),
        });
    }
    let denominator = params.volatility * params.time_to_maturity.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(QuantError::DegenerateOption {
            reason: "volatility * sqrt(time to maturity) must be non-zero".into(),
        });
    }
    let numerator = (params.spot / params.strike).ln()
        + (params.risk_free_rate + 0.5 * params.volatility.powi(2)) * params.time_to_maturity;
    Ok(numerator / denominator)
}

/// Standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(option_type: OptionType) -> OptionParameters {
        OptionParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.2,
            option_type,
        }
    }

    #[test]
    fn at_the_money_call_reference_value() {
        let price = BlackScholesPricer::new().price(&params(OptionType::Call)).unwrap();
        assert_abs_diff_eq!(price, 10.450583572185565, epsilon = 1e-6);
    }

    #[test]
    fn at_the_money_put_reference_value() {
        let price = BlackScholesPricer::new().price(&params(OptionType::Put)).unwrap();
        assert_abs_diff_eq!(price, 5.573526022256971, epsilon = 1e-6);
    }

    #[test]
    fn put_call_parity() {
        let pricer = BlackScholesPricer::new();
        let call = pricer.price(&params(OptionType::Call)).unwrap();
        let put = pricer.price(&params(OptionType::Put)).unwrap();
        let forward_gap = 100.0 - 100.0 * (-0.05_f64).exp();
        assert_abs_diff_eq!(call - put, forward_gap, epsilon = 1e-9);
    }

    #[test]
    fn zero_volatility_is_degenerate() {
        let mut p = params(OptionType::Call);
        p.volatility = 0.0;
        assert!(matches!(
            BlackScholesPricer::new().price(&p),
            Err(QuantError::DegenerateOption { .. })
        ));
    }

    #[test]
    fn zero_maturity_is_degenerate() {
        let mut p = params(OptionType::Put);
        p.time_to_maturity = 0.0;
        assert!(BlackScholesPricer::new().price(&p).is_err());
    }

    #[test]
    fn option_type_parsing_is_case_insensitive() {
        assert_eq!("CALL".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!(" Put ".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!("straddle".parse::<OptionType>().is_err());
    }

    #[test]
    fn norm_cdf_symmetry() {
        assert_abs_diff_eq!(norm_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_abs_diff_eq!(norm_cdf(1.3) + norm_cdf(-1.3), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(norm_cdf(1.959963984540054), 0.975, epsilon = 1e-9);
    }

    #[test]
    fn scenario_overrides() {
        let base = params(OptionType::Call);
        let scenario = OptionScenario::new(StrategyParameters::from([("spot", 110.0), ("volatility", 0.3)]))
            .with_option_type(OptionType::Put);
        let applied = base.apply(&scenario).unwrap();
        assert_eq!(applied.spot, 110.0);
        assert_eq!(applied.volatility, 0.3);
        assert_eq!(applied.strike, 100.0);
        assert_eq!(applied.option_type, OptionType::Put);
    }

    #[test]
    fn scenario_unknown_key() {
        let scenario = OptionScenario::new(StrategyParameters::from([("dividend", 0.01)]));
        assert!(matches!(
            params(OptionType::Call).apply(&scenario),
            Err(QuantError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn registry_constructor_rejects_parameters() {
        assert!(BlackScholesPricer::boxed(&StrategyParameters::from([("lookback", 3.0)])).is_err());
        assert!(BlackScholesPricer::boxed(&StrategyParameters::new()).is_ok());
    }
}
