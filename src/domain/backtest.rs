//! Parameter sweeps over registered strategies.
//!
//! A sweep enumerates every combination of a [`ParameterGrid`] in grid order,
//! builds the strategy for it and records the run. The first failing
//! combination aborts the sweep.

use crate::domain::black_scholes::{BlackScholesPricer, OptionParameters, OptionScenario};
use crate::domain::error::QuantError;
use crate::domain::parameters::{ParameterGrid, StrategyParameters};
use crate::domain::series::{PairSeries, PriceSeries, SignalSeries};
use crate::domain::strategy::{StrategyConstructor, StrategyRun};
use std::str::FromStr;

/// One grid point of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRecord {
    pub strategy: String,
    /// Parameters after defaults were applied.
    pub parameters: StrategyParameters,
    pub pnl: Vec<f64>,
    pub signals: SignalSeries,
}

impl BacktestRecord {
    fn from_run(strategy: &str, run: StrategyRun) -> Self {
        Self {
            strategy: strategy.to_string(),
            parameters: run.parameters,
            pnl: run.pnl,
            signals: run.signals,
        }
    }

    /// Last P&L value, or negative infinity for an empty path.
    pub fn terminal_pnl(&self) -> f64 {
        self.pnl.last().copied().unwrap_or(f64::NEG_INFINITY)
    }
}

/// Ranking keys understood by [`BacktestSummary::best_record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKey {
    TerminalPnl,
}

impl FromStr for RankKey {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pnl" => Ok(RankKey::TerminalPnl),
            other => Err(QuantError::UnsupportedMetric {
                key: other.to_string(),
            }),
        }
    }
}

/// Records of one sweep, in grid order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestSummary {
    pub records: Vec<BacktestRecord>,
}

impl BacktestSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: BacktestRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn best_record(&self, key: &str) -> Result<&BacktestRecord, QuantError> {
        self.best_by(key.parse()?)
    }

    /// Highest-ranked record. Ties keep the earliest record.
    pub fn best_by(&self, key: RankKey) -> Result<&BacktestRecord, QuantError> {
        let score = |record: &BacktestRecord| match key {
            RankKey::TerminalPnl => record.terminal_pnl(),
        };

        let mut records = self.records.iter();
        let mut best = records.next().ok_or(QuantError::NoRecords)?;
        for record in records {
            if score(record) > score(best) {
                best = record;
            }
        }
        Ok(best)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Backtester;

impl Backtester {
    pub fn new() -> Self {
        Self
    }

    /// Sweep a single-asset strategy over every grid combination.
    pub fn run_strategy(
        &self,
        constructor: StrategyConstructor,
        prices: &PriceSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
    ) -> Result<BacktestSummary, QuantError> {
        let mut summary = BacktestSummary::new();
        for params in grid.combinations() {
            let strategy = constructor(&params)?;
            let run = strategy.backtest(prices, initial_capital)?;
            summary.push(BacktestRecord::from_run(strategy.name(), run));
        }
        Ok(summary)
    }

    /// Sweep a pairs strategy over every grid combination.
    pub fn run_pairs(
        &self,
        constructor: StrategyConstructor,
        pair: &PairSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
    ) -> Result<BacktestSummary, QuantError> {
        let mut summary = BacktestSummary::new();
        for params in grid.combinations() {
            let strategy = constructor(&params)?;
            let run = strategy.backtest_pair(pair, initial_capital)?;
            summary.push(BacktestRecord::from_run(strategy.name(), run));
        }
        Ok(summary)
    }

    /// Price each scenario overlaid on `base`, in the given order.
    pub fn price_option_grid(
        &self,
        pricer: &BlackScholesPricer,
        base: &OptionParameters,
        scenarios: &[OptionScenario],
    ) -> Result<Vec<(OptionScenario, f64)>, QuantError> {
        scenarios
            .iter()
            .map(|scenario| {
                let params = base.apply(scenario)?;
                Ok((scenario.clone(), pricer.price(&params)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::black_scholes::OptionType;
    use crate::domain::mean_reversion::MeanReversionStrategy;
    use crate::domain::stat_arb::StatisticalArbitrageStrategy;
    use approx::assert_abs_diff_eq;

    fn prices() -> PriceSeries {
        PriceSeries::new(vec![
            100.0, 102.0, 101.0, 105.0, 107.0, 106.0, 103.0, 99.0, 101.0, 104.0,
        ])
        .unwrap()
    }

    fn record(pnl: Vec<f64>, lookback: f64) -> BacktestRecord {
        BacktestRecord {
            strategy: "test".into(),
            parameters: StrategyParameters::from([("lookback", lookback)]),
            pnl,
            signals: SignalSeries::Single(vec![]),
        }
    }

    #[test]
    fn sweep_covers_grid_in_order() {
        let grid = ParameterGrid::new()
            .axis("lookback", [3.0, 5.0])
            .axis("entry_z", [0.5, 1.0]);
        let summary = Backtester::new()
            .run_strategy(MeanReversionStrategy::boxed, &prices(), &grid, 1000.0)
            .unwrap();

        assert_eq!(summary.len(), 4);
        let seen: Vec<(f64, f64)> = summary
            .records
            .iter()
            .map(|r| {
                (
                    r.parameters.get("lookback").unwrap(),
                    r.parameters.get("entry_z").unwrap(),
                )
            })
            .collect();
        assert_eq!(seen, vec![(3.0, 0.5), (3.0, 1.0), (5.0, 0.5), (5.0, 1.0)]);

        for r in &summary.records {
            assert_eq!(r.strategy, MeanReversionStrategy::NAME);
            assert_eq!(r.pnl.len(), 10);
            assert_eq!(r.signals.len(), 10);
            assert_eq!(r.pnl[0], 1000.0);
            assert_eq!(r.parameters.get("exit_z"), Some(0.2));
        }
    }

    #[test]
    fn invalid_combination_aborts_sweep() {
        let grid = ParameterGrid::new().axis("lookback", [3.0, 1.0]);
        let result =
            Backtester::new().run_strategy(MeanReversionStrategy::boxed, &prices(), &grid, 0.0);
        assert!(matches!(result, Err(QuantError::InvalidParameter { .. })));
    }

    #[test]
    fn empty_grid_runs_defaults_once() {
        let summary = Backtester::new()
            .run_strategy(MeanReversionStrategy::boxed, &prices(), &ParameterGrid::new(), 0.0)
            .unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.records[0].parameters.get("lookback"), Some(5.0));
    }

    #[test]
    fn pairs_strategy_rejects_single_series() {
        let grid = ParameterGrid::new();
        let result = Backtester::new().run_strategy(
            StatisticalArbitrageStrategy::boxed,
            &prices(),
            &grid,
            0.0,
        );
        assert!(matches!(result, Err(QuantError::UnsupportedOperation { .. })));
    }

    #[test]
    fn pairs_sweep_records_pair_signals() {
        let a: Vec<f64> = (0..30).map(|i| 50.0 + (i as f64 * 0.7).sin() * 3.0).collect();
        let b: Vec<f64> = (0..30).map(|i| 25.0 + (i as f64 * 0.3).cos()).collect();
        let pair = PairSeries::from_vecs(a, b).unwrap();
        let grid = ParameterGrid::new().axis("lookback", [5.0, 10.0]);
        let summary = Backtester::new()
            .run_pairs(StatisticalArbitrageStrategy::boxed, &pair, &grid, 100.0)
            .unwrap();

        assert_eq!(summary.len(), 2);
        for r in &summary.records {
            assert!(matches!(r.signals, SignalSeries::Pair(_)));
            assert_eq!(r.pnl.len(), 30);
        }
    }

    #[test]
    fn best_record_by_terminal_pnl() {
        let mut summary = BacktestSummary::new();
        summary.push(record(vec![0.0, 5.0], 3.0));
        summary.push(record(vec![0.0, 9.0, 7.0], 4.0));
        summary.push(record(vec![0.0, 7.0], 5.0));

        let best = summary.best_record("pnl").unwrap();
        assert_eq!(best.parameters.get("lookback"), Some(4.0));
    }

    #[test]
    fn best_record_ties_keep_first() {
        let mut summary = BacktestSummary::new();
        summary.push(record(vec![1.0, 2.0], 3.0));
        summary.push(record(vec![0.0, 2.0], 4.0));
        let best = summary.best_by(RankKey::TerminalPnl).unwrap();
        assert_eq!(best.parameters.get("lookback"), Some(3.0));
    }

    #[test]
    fn empty_pnl_ranks_last() {
        let mut summary = BacktestSummary::new();
        summary.push(record(vec![], 3.0));
        summary.push(record(vec![-50.0], 4.0));
        let best = summary.best_record("pnl").unwrap();
        assert_eq!(best.parameters.get("lookback"), Some(4.0));
    }

    #[test]
    fn best_record_errors() {
        let empty = BacktestSummary::new();
        assert!(matches!(empty.best_record("pnl"), Err(QuantError::NoRecords)));

        let mut summary = BacktestSummary::new();
        summary.push(record(vec![1.0], 3.0));
        match summary.best_record("sharpe") {
            Err(QuantError::UnsupportedMetric { key }) => assert_eq!(key, "sharpe"),
            other => panic!("expected UnsupportedMetric, got {other:?}"),
        }
    }

    #[test]
    fn option_grid_prices_each_scenario() {
        let base = OptionParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.2,
            option_type: OptionType::Call,
        };
        let scenarios = vec![
            OptionScenario::default(),
            OptionScenario::new(StrategyParameters::from([("spot", 110.0)])),
            OptionScenario::default().with_option_type(OptionType::Put),
        ];
        let priced = Backtester::new()
            .price_option_grid(&BlackScholesPricer::new(), &base, &scenarios)
            .unwrap();

        assert_eq!(priced.len(), 3);
        assert_eq!(priced[1].0, scenarios[1]);
        assert_abs_diff_eq!(priced[0].1, 10.450583572185565, epsilon = 1e-9);
        assert!(priced[1].1 > priced[0].1);
        assert_abs_diff_eq!(priced[2].1, 5.573526022256971, epsilon = 1e-9);
    }

    #[test]
    fn option_grid_rejects_unknown_keys() {
        let base = OptionParameters {
            spot: 100.0,
            strike: 100.0,
            time_to_maturity: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.2,
            option_type: OptionType::Call,
        };
        let scenarios = [OptionScenario::new(StrategyParameters::from([("vol", 0.3)]))];
        let result =
            Backtester::new().price_option_grid(&BlackScholesPricer::new(), &base, &scenarios);
        assert!(matches!(result, Err(QuantError::UnknownParameter { .. })));
    }
}
