//! Mark-to-market P&L paths from signals.
//!
//! The signal at step `i` is the position held over the move from `i` to
//! `i + 1`. The path starts at the initial capital and has one entry per
//! price. No transaction costs, slippage or leverage limits are modelled.

use crate::domain::error::QuantError;
use crate::domain::series::{PairPosition, PairSeries, Position, PriceSeries};

/// Accepts `n` signals, or `n - 1` signals with an implicit leading flat step.
fn align<T: Copy>(prices: usize, signals: &[T], flat: T) -> Result<Vec<T>, QuantError> {
    if signals.len() == prices {
        Ok(signals.to_vec())
    } else if signals.len() + 1 == prices {
        let mut aligned = Vec::with_capacity(prices);
        aligned.push(flat);
        aligned.extend_from_slice(signals);
        Ok(aligned)
    } else {
        Err(QuantError::SignalLengthMismatch {
            prices,
            signals: signals.len(),
        })
    }
}

pub fn simulate_pnl(
    prices: &PriceSeries,
    signals: &[Position],
    initial_capital: f64,
) -> Result<Vec<f64>, QuantError> {
    let prices = prices.as_slice();
    let signals = align(prices.len(), signals, Position::Flat)?;

    let mut pnl = Vec::with_capacity(prices.len());
    let mut capital = initial_capital;
    pnl.push(capital);
    for (i, step) in prices.windows(2).enumerate() {
        capital += signals[i].as_f64() * (step[1] - step[0]);
        pnl.push(capital);
    }
    Ok(pnl)
}

pub fn simulate_pair_pnl(
    pair: &PairSeries,
    signals: &[PairPosition],
    initial_capital: f64,
) -> Result<Vec<f64>, QuantError> {
    let signals = align(pair.len(), signals, PairPosition::FLAT)?;
    let (a, b) = (pair.asset_a(), pair.asset_b());

    let mut pnl = Vec::with_capacity(pair.len());
    let mut capital = initial_capital;
    pnl.push(capital);
    for i in 1..pair.len() {
        let held = signals[i - 1];
        capital += held.a.as_f64() * (a[i] - a[i - 1]);
        capital += held.b.as_f64() * (b[i] - b[i - 1]);
        pnl.push(capital);
    }
    Ok(pnl)
}
