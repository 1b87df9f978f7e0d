//! Strategy abstraction, hysteresis band rule and the string-keyed registry.

use crate::domain::black_scholes::BlackScholesPricer;
use crate::domain::error::QuantError;
use crate::domain::mean_reversion::MeanReversionStrategy;
use crate::domain::parameters::StrategyParameters;
use crate::domain::series::{PairPosition, PairSeries, Position, PriceSeries, SignalSeries};
use crate::domain::simulator;
use crate::domain::stat_arb::StatisticalArbitrageStrategy;
use std::collections::BTreeMap;

/// Signals and the simulated P&L path of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub signals: SignalSeries,
    pub pnl: Vec<f64>,
    pub parameters: StrategyParameters,
}

/// A signal generator over a fixed, validated parameter set.
///
/// Variants that cannot consume a given input shape keep the default
/// implementation, which fails with [`QuantError::UnsupportedOperation`].
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parameters after defaults were applied.
    fn parameters(&self) -> &StrategyParameters;

    fn generate_signals(&self, _prices: &PriceSeries) -> Result<Vec<Position>, QuantError> {
        Err(QuantError::unsupported(self.name(), "single-asset signal generation"))
    }

    fn generate_pair_signals(&self, _pair: &PairSeries) -> Result<Vec<PairPosition>, QuantError> {
        Err(QuantError::unsupported(self.name(), "paired signal generation"))
    }

    fn backtest(&self, prices: &PriceSeries, initial_capital: f64) -> Result<StrategyRun, QuantError> {
        let signals = self.generate_signals(prices)?;
        let pnl = simulator::simulate_pnl(prices, &signals, initial_capital)?;
        Ok(StrategyRun {
            signals: SignalSeries::Single(signals),
            pnl,
            parameters: self.parameters().clone(),
        })
    }

    fn backtest_pair(&self, pair: &PairSeries, initial_capital: f64) -> Result<StrategyRun, QuantError> {
        let signals = self.generate_pair_signals(pair)?;
        let pnl = simulator::simulate_pair_pnl(pair, &signals, initial_capital)?;
        Ok(StrategyRun {
            signals: SignalSeries::Pair(signals),
            pnl,
            parameters: self.parameters().clone(),
        })
    }
}

/// Builds a strategy from raw parameters, validating them up front.
pub type StrategyConstructor = fn(&StrategyParameters) -> Result<Box<dyn Strategy>, QuantError>;

/// Outcome of comparing a z-score against the entry/exit band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandAction {
    /// Price (or spread) is rich: short it.
    EnterShort,
    /// Price (or spread) is cheap: go long.
    EnterLong,
    Flatten,
    /// Inside the dead zone between exit and entry: keep the previous position.
    Hold,
}

pub fn band_action(z: f64, entry_z: f64, exit_z: f64) -> BandAction {
    if z.abs() >= entry_z {
        if z > 0.0 {
            BandAction::EnterShort
        } else {
            BandAction::EnterLong
        }
    } else if z.abs() <= exit_z {
        BandAction::Flatten
    } else {
        BandAction::Hold
    }
}

/// Strategy constructors keyed by identifier.
#[derive(Clone)]
pub struct StrategyRegistry {
    constructors: BTreeMap<String, StrategyConstructor>,
}

impl StrategyRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, constructor: StrategyConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn get(&self, name: &str) -> Result<StrategyConstructor, QuantError> {
        self.constructors
            .get(name)
            .copied()
            .ok_or_else(|| QuantError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    pub fn build(
        &self,
        name: &str,
        parameters: &StrategyParameters,
    ) -> Result<Box<dyn Strategy>, QuantError> {
        (self.get(name)?)(parameters)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.constructors.keys().map(String::as_str)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(MeanReversionStrategy::NAME, MeanReversionStrategy::boxed);
        registry.register(StatisticalArbitrageStrategy::NAME, StatisticalArbitrageStrategy::boxed);
        registry.register(BlackScholesPricer::NAME, BlackScholesPricer::boxed);
        registry
    }
}

impl std::fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}
