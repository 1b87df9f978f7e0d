//! Orchestration of strategies, sweeps, metrics, optimization and pricing.
//!
//! Every completed result is appended to the configured [`ResultSink`], one
//! payload per result, tagged with its `type`.

use crate::domain::backtest::{BacktestRecord, BacktestSummary, Backtester, RankKey};
use crate::domain::black_scholes::{BlackScholesPricer, OptionParameters, OptionScenario};
use crate::domain::error::QuantError;
use crate::domain::metrics::MetricsReport;
use crate::domain::optimizer::{MarkowitzOptimizer, OptimizationResult};
use crate::domain::parameters::{ParameterGrid, StrategyParameters};
use crate::domain::series::{PairSeries, PriceSeries, SignalSeries};
use crate::domain::strategy::{StrategyConstructor, StrategyRegistry};
use crate::ports::result_port::ResultSink;
use crate::ports::solver_port::SolverPort;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResponse {
    pub strategy: String,
    pub pnl: Vec<f64>,
    pub signals: SignalSeries,
    pub metrics: MetricsReport,
    pub parameters: StrategyParameters,
}

/// One grid point of a sweep with its metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub parameters: StrategyParameters,
    pub pnl: Vec<f64>,
    pub metrics: MetricsReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResponse {
    pub strategy: String,
    pub results: Vec<SweepResult>,
    /// Highest terminal P&L; `None` only for an empty grid.
    pub best: Option<SweepResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingResponse {
    pub parameters: OptionParameters,
    pub price: f64,
}

pub struct QuantEngine {
    backtester: Backtester,
    optimizer: MarkowitzOptimizer,
    pricer: BlackScholesPricer,
    registry: StrategyRegistry,
    sink: Option<Box<dyn ResultSink>>,
    table: Option<String>,
    risk_free_rate: f64,
}

impl Default for QuantEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantEngine {
    pub fn new() -> Self {
        Self {
            backtester: Backtester::new(),
            optimizer: MarkowitzOptimizer::new(),
            pricer: BlackScholesPricer::new(),
            registry: StrategyRegistry::default(),
            sink: None,
            table: None,
            risk_free_rate: 0.0,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Table results are written to. The sink's default is used otherwise.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn SolverPort>) -> Self {
        self.optimizer = MarkowitzOptimizer::with_solver(solver);
        self
    }

    /// Per-period risk-free rate used by the Sharpe ratio in metric reports.
    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn register_strategy(&mut self, name: &str, constructor: StrategyConstructor) {
        self.registry.register(name, constructor);
    }

    pub fn run_backtest(
        &self,
        strategy_id: &str,
        prices: &PriceSeries,
        parameters: &StrategyParameters,
        initial_capital: f64,
    ) -> Result<BacktestResponse, QuantError> {
        let strategy = self.registry.build(strategy_id, parameters)?;
        let run = strategy.backtest(prices, initial_capital)?;
        let metrics = self.metrics(&run.pnl);

        self.persist(json!({
            "type": "backtest",
            "strategy": strategy.name(),
            "parameters": run.parameters,
            "metrics": metrics,
        }))?;

        Ok(BacktestResponse {
            strategy: strategy.name().to_string(),
            pnl: run.pnl,
            signals: run.signals,
            metrics,
            parameters: run.parameters,
        })
    }

    pub fn run_parameter_sweep(
        &self,
        strategy_id: &str,
        prices: &PriceSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
    ) -> Result<SweepResponse, QuantError> {
        let constructor = self.registry.get(strategy_id)?;
        let summary = self
            .backtester
            .run_strategy(constructor, prices, grid, initial_capital)?;
        self.summarize(strategy_id, "parameter_sweep", &summary)
    }

    pub fn run_statistical_arbitrage(
        &self,
        strategy_id: &str,
        pair: &PairSeries,
        grid: &ParameterGrid,
        initial_capital: f64,
    ) -> Result<SweepResponse, QuantError> {
        let constructor = self.registry.get(strategy_id)?;
        let summary = self
            .backtester
            .run_pairs(constructor, pair, grid, initial_capital)?;
        self.summarize(strategy_id, "stat_arb", &summary)
    }

    pub fn optimize_portfolio(
        &self,
        expected_returns: &[f64],
        covariance: &[Vec<f64>],
        target_return: Option<f64>,
        allow_short: bool,
    ) -> Result<OptimizationResult, QuantError> {
        let result =
            self.optimizer
                .optimize(expected_returns, covariance, target_return, allow_short)?;

        self.persist(json!({
            "type": "optimization",
            "weights": result.weights,
            "status": result.status,
            "target_return": target_return,
        }))?;

        Ok(result)
    }

    pub fn price_option(&self, params: &OptionParameters) -> Result<PricingResponse, QuantError> {
        let price = self.pricer.price(params)?;
        self.persist(json!({
            "type": "pricing",
            "parameters": params,
            "price": price,
        }))?;
        Ok(PricingResponse {
            parameters: *params,
            price,
        })
    }

    /// Price each scenario overlaid on `base`; one pricing payload per scenario.
    pub fn price_scenarios(
        &self,
        base: &OptionParameters,
        scenarios: &[OptionScenario],
    ) -> Result<Vec<PricingResponse>, QuantError> {
        let priced = self
            .backtester
            .price_option_grid(&self.pricer, base, scenarios)?;

        let mut responses = Vec::with_capacity(priced.len());
        for (scenario, price) in priced {
            let parameters = base.apply(&scenario)?;
            self.persist(json!({
                "type": "pricing",
                "parameters": parameters,
                "price": price,
            }))?;
            responses.push(PricingResponse { parameters, price });
        }
        Ok(responses)
    }

    fn summarize(
        &self,
        strategy_id: &str,
        kind: &str,
        summary: &BacktestSummary,
    ) -> Result<SweepResponse, QuantError> {
        let mut results = Vec::with_capacity(summary.len());
        for record in &summary.records {
            let result = self.sweep_result(record);
            self.persist(json!({
                "type": kind,
                "strategy": record.strategy,
                "parameters": result.parameters,
                "metrics": result.metrics,
            }))?;
            results.push(result);
        }

        let best = summary
            .best_by(RankKey::TerminalPnl)
            .ok()
            .map(|record| self.sweep_result(record));

        Ok(SweepResponse {
            strategy: strategy_id.to_string(),
            results,
            best,
        })
    }

    fn sweep_result(&self, record: &BacktestRecord) -> SweepResult {
        SweepResult {
            parameters: record.parameters.clone(),
            pnl: record.pnl.clone(),
            metrics: self.metrics(&record.pnl),
        }
    }

    fn metrics(&self, pnl: &[f64]) -> MetricsReport {
        MetricsReport::compute(pnl, self.risk_free_rate)
    }

    fn persist(&self, payload: Value) -> Result<(), QuantError> {
        if let Some(sink) = &self.sink {
            sink.log_result(&payload, self.table.as_deref())?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for QuantEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuantEngine")
            .field("registry", &self.registry)
            .field("optimizer", &self.optimizer)
            .field("sink", &self.sink.is_some())
            .field("table", &self.table)
            .field("risk_free_rate", &self.risk_free_rate)
            .finish()
    }
}
