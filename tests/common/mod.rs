#![allow(dead_code)]

use quantlab::domain::black_scholes::{OptionParameters, OptionType};
use quantlab::domain::error::QuantError;
use quantlab::domain::linalg::SquareMatrix;
use quantlab::domain::series::PriceSeries;
use quantlab::ports::data_port::DataPort;
use quantlab::ports::result_port::{ResultRecord, ResultSink, DEFAULT_TABLE};
use quantlab::ports::solver_port::{MeanVarianceProblem, SolverPort, SolverSolution};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct MockDataPort {
    pub data: HashMap<String, Vec<f64>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, symbol: &str, prices: Vec<f64>) -> Self {
        self.data.insert(symbol.to_string(), prices);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_prices(&self, symbol: &str) -> Result<PriceSeries, QuantError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(QuantError::DataLoad {
                reason: reason.clone(),
            });
        }
        PriceSeries::try_from(self.data.get(symbol).cloned().unwrap_or_default())
    }
}

/// Sink that keeps every payload in memory; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Arc<Mutex<Vec<ResultRecord>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn payload_types(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|r| r.payload["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl ResultSink for RecordingSink {
    fn log_result(&self, payload: &Value, table: Option<&str>) -> Result<ResultRecord, QuantError> {
        let record = ResultRecord::new(table.unwrap_or(DEFAULT_TABLE), payload.clone());
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }
}

/// Solver returning a fixed answer (or failure) and counting its calls.
pub struct ScriptedSolver {
    outcome: Result<SolverSolution, String>,
    calls: AtomicUsize,
}

impl ScriptedSolver {
    pub fn solving(weights: Vec<f64>) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("objective".to_string(), 0.042);
        Self {
            outcome: Ok(SolverSolution {
                weights,
                status: "optimal".to_string(),
                metadata,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            outcome: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SolverPort for ScriptedSolver {
    fn solve(&self, _problem: &MeanVarianceProblem<'_>) -> Result<SolverSolution, QuantError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map_err(|reason| QuantError::Solver { reason })
    }
}

/// Records the covariance it is handed, then fails so the closed form runs.
pub struct InspectingSolver {
    pub seen: Mutex<Option<SquareMatrix>>,
}

impl SolverPort for InspectingSolver {
    fn solve(&self, problem: &MeanVarianceProblem<'_>) -> Result<SolverSolution, QuantError> {
        *self.seen.lock().unwrap() = Some(problem.covariance.clone());
        Err(QuantError::Solver {
            reason: "inspection only".into(),
        })
    }
}

pub const SAMPLE_PRICES: [f64; 6] = [100.0, 102.0, 101.0, 105.0, 107.0, 106.0];

pub fn sample_prices() -> PriceSeries {
    PriceSeries::new(SAMPLE_PRICES.to_vec()).unwrap()
}

/// A longer oscillating series that makes the z-score band trade.
pub fn oscillating_prices(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 100.0 + 5.0 * (i as f64 * 0.9).sin() + 0.1 * i as f64)
        .collect()
}

pub fn example_portfolio() -> (Vec<f64>, Vec<Vec<f64>>) {
    (
        vec![0.05, 0.07, 0.02],
        vec![
            vec![0.1, 0.02, 0.04],
            vec![0.02, 0.08, 0.01],
            vec![0.04, 0.01, 0.07],
        ],
    )
}

pub fn atm_call() -> OptionParameters {
    OptionParameters {
        spot: 100.0,
        strike: 100.0,
        time_to_maturity: 1.0,
        risk_free_rate: 0.05,
        volatility: 0.2,
        option_type: OptionType::Call,
    }
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
