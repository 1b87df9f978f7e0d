//! Price data access port.

use crate::domain::error::QuantError;
use crate::domain::series::{PairSeries, PriceSeries};

pub trait DataPort {
    /// Load the price history identified by `symbol`, oldest first.
    fn load_prices(&self, symbol: &str) -> Result<PriceSeries, QuantError>;

    /// Load two aligned legs. Lengths must match.
    fn load_pair(&self, asset_a: &str, asset_b: &str) -> Result<PairSeries, QuantError> {
        PairSeries::new(self.load_prices(asset_a)?, self.load_prices(asset_b)?)
    }
}
