//! Single-asset mean reversion on a rolling z-score band.
//!
//! Once `lookback` prices are available the latest price is scored against
//! the window mean and population standard deviation. Scores beyond
//! `entry_z` take a position against the move, scores within `exit_z` go
//! flat, and anything in between keeps the previous signal.

use crate::domain::error::QuantError;
use crate::domain::parameters::StrategyParameters;
use crate::domain::rolling::{z_score, RollingWindow};
use crate::domain::series::{Position, PriceSeries};
use crate::domain::strategy::{band_action, BandAction, Strategy};

#[derive(Debug, Clone)]
pub struct MeanReversionStrategy {
    lookback: usize,
    entry_z: f64,
    exit_z: f64,
    parameters: StrategyParameters,
}

impl MeanReversionStrategy {
    pub const NAME: &'static str = "mean_reversion";

    pub const DEFAULTS: &'static [(&'static str, f64)] =
        &[("lookback", 5.0), ("entry_z", 1.0), ("exit_z", 0.2)];

    pub fn new(parameters: &StrategyParameters) -> Result<Self, QuantError> {
        let parameters = parameters.resolve(Self::NAME, Self::DEFAULTS)?;
        let lookback = parameters.lookback(Self::NAME, "lookback", 1)?;
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

    pub fn lookback(&self) -> usize {
        self.lookback
    }
}

impl Strategy for MeanReversionStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> &StrategyParameters {
        &self.parameters
    }

    fn generate_signals(&self, prices: &PriceSeries) -> Result<Vec<Position>, QuantError> {
        let prices = prices.as_slice();
        let mut signals = vec![Position::Flat; prices.len()];
        let mut window = RollingWindow::new(self.lookback);

        for (idx, &price) in prices.iter().enumerate() {
            window.push(price);
            if !window.is_full() {
                continue;
            }

            let z = z_score(price, window.mean(), window.population_variance());
            let previous = if idx > 0 { signals[idx - 1] } else { Position::Flat };
            signals[idx] = match band_action(z, self.entry_z, self.exit_z) {
                BandAction::EnterShort => Position::Short,
                BandAction::EnterLong => Position::Long,
                BandAction::Flatten => Position::Flat,
                BandAction::Hold => previous,
            };
        }

        Ok(signals)
    }
}
