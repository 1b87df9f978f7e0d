//! Return, risk and performance statistics.
//!
//! Degenerate inputs resolve to defined values rather than NaN or infinity:
//! zero deviation gives a zero Sharpe ratio, fewer than two observations give
//! zero volatility, and empty tails give a zero VaR/CVaR.

use serde::Serialize;

pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// Simple returns `(p[i] - p[i-1]) / p[i-1]`, zero where the prior price is zero.
pub fn compute_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            let previous = w[0];
            if previous == 0.0 {
                0.0
            } else {
                (w[1] - previous) / previous
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() <= 1 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

pub fn volatility(returns: &[f64]) -> f64 {
    sample_stdev(returns)
}

pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    let stdev = sample_stdev(&excess);
    if stdev == 0.0 {
        return 0.0;
    }
    mean(&excess) / stdev
}

/// Largest peak-to-trough decline as a fraction of the running peak.
///
/// Points where the running peak is zero contribute no drawdown.
pub fn max_drawdown(pnl: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for &value in pnl {
        peak = peak.max(value);
        let drawdown = if peak == 0.0 || peak == f64::NEG_INFINITY {
            0.0
        } else {
            (value - peak) / peak
        };
        worst = worst.min(drawdown);
    }
    worst.abs()
}

fn sorted_ascending(returns: &[f64]) -> Vec<f64> {
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Historical VaR as a positive loss magnitude.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sorted = sorted_ascending(returns);
    let last = sorted.len() - 1;
    let raw = ((1.0 - confidence) * last as f64).floor();
    let index = if raw > 0.0 { (raw as usize).min(last) } else { 0 };
    -sorted[index]
}

/// Mean loss over the worst `max(1, floor((1 - confidence) * n))` returns.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sorted = sorted_ascending(returns);
    let raw = ((1.0 - confidence) * sorted.len() as f64).floor();
    let cutoff = if raw > 1.0 { (raw as usize).min(sorted.len()) } else { 1 };
    -mean(&sorted[..cutoff])
}

/// The standard metric set attached to every backtest result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsReport {
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub volatility: f64,
    pub value_at_risk: f64,
    pub conditional_value_at_risk: f64,
}

impl MetricsReport {
    /// Metrics of a P&L path, using its simple returns.
    pub fn compute(pnl: &[f64], risk_free_rate: f64) -> Self {
        let returns = compute_returns(pnl);
        MetricsReport {
            sharpe: sharpe_ratio(&returns, risk_free_rate),
            max_drawdown: max_drawdown(pnl),
            volatility: volatility(&returns),
            value_at_risk: value_at_risk(&returns, DEFAULT_CONFIDENCE),
            conditional_value_at_risk: conditional_value_at_risk(&returns, DEFAULT_CONFIDENCE),
        }
    }
}
