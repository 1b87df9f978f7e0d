//! Two-asset statistical arbitrage on a rolling hedged spread.
//!
//! Each full window fits an OLS hedge ratio of asset A on asset B, builds the
//! spread `a - beta * b` and scores the latest spread against the window. The
//! band rule matches [`MeanReversionStrategy`](crate::domain::mean_reversion::MeanReversionStrategy),
//! but positions are opposite unit legs: beta shapes the spread only and is
//! not used for sizing.

use crate::domain::error::QuantError;
use crate::domain::parameters::StrategyParameters;
use crate::domain::rolling::{z_score, RollingWindow};
use crate::domain::series::{PairPosition, PairSeries, Position};
use crate::domain::strategy::{band_action, BandAction, Strategy};

#[derive(Debug, Clone)]
pub struct StatisticalArbitrageStrategy {
    lookback: usize,
    entry_z: f64,
    exit_z: f64,
    parameters: StrategyParameters,
}

impl StatisticalArbitrageStrategy {
    pub const NAME: &'static str = "statistical_arbitrage";

    pub const DEFAULTS: &'static [(&'static str, f64)] =
        &[("lookback", 20.0), ("entry_z", 2.0), ("exit_z", 0.5)];

    pub fn new(parameters: &StrategyParameters) -> Result<Self, QuantError> {
        let parameters = parameters.resolve(Self::NAME, Self::DEFAULTS)?;
        let lookback = parameters.lookback(Self::NAME, "lookback", 2)?;
        Ok(Self {
            lookback,
            entry_z: parameters.get("entry_z").unwrap_or_default(),
            exit_z: parameters.get("exit_z").unwrap_or_default(),
            parameters,
        })
    }

    pub fn boxed(parameters: &StrategyParameters) -> Result<Box<dyn Strategy>, QuantError> {
        Ok(Box::new(Self::new(parameters)?))
    }
}

impl Strategy for StatisticalArbitrageStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> &StrategyParameters {
        &self.parameters
    }

    fn generate_pair_signals(&self, pair: &PairSeries) -> Result<Vec<PairPosition>, QuantError> {
        let (prices_a, prices_b) = (pair.asset_a(), pair.asset_b());
        let mut signals = vec![PairPosition::FLAT; pair.len()];
        let mut window_a = RollingWindow::new(self.lookback);
        let mut window_b = RollingWindow::new(self.lookback);

        for (idx, (&a, &b)) in prices_a.iter().zip(prices_b).enumerate() {
            window_a.push(a);
            window_b.push(b);
            if !window_a.is_full() {
                continue;
            }

            let beta = hedge_ratio(&window_a, &window_b);
            let spreads: Vec<f64> = window_a
                .iter()
                .zip(window_b.iter())
                .map(|(wa, wb)| wa - beta * wb)
                .collect();
            let n = spreads.len() as f64;
            let mean = spreads.iter().sum::<f64>() / n;
            let variance = spreads.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
            let z = z_score(a - beta * b, mean, variance);

            let previous = if idx > 0 { signals[idx - 1] } else { PairPosition::FLAT };
            signals[idx] = match band_action(z, self.entry_z, self.exit_z) {
                BandAction::EnterShort => PairPosition::new(Position::Short, Position::Long),
                BandAction::EnterLong => PairPosition::new(Position::Long, Position::Short),
                BandAction::Flatten => PairPosition::FLAT,
                BandAction::Hold => previous,
            };
        }

        Ok(signals)
    }
}

/// OLS slope of `a` regressed on `b`; zero when `b` has no variance.
fn hedge_ratio(a: &RollingWindow, b: &RollingWindow) -> f64 {
    let mean_a = a.mean();
    let mean_b = b.mean();
    let covariance: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(xa, xb)| (xa - mean_a) * (xb - mean_b))
        .sum();
    let variance_b: f64 = b.iter().map(|xb| (xb - mean_b).powi(2)).sum();
    if variance_b == 0.0 {
        0.0
    } else {
        covariance / variance_b
    }
}
