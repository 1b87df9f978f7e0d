//! Mean-variance (Markowitz) portfolio allocation.
//!
//! An injected [`SolverPort`] is tried first. Any solver error, or a solution
//! that breaks the result contract, falls through to the closed-form
//! Lagrangian solution, optionally projected onto the probability simplex
//! when short selling is disallowed.

use crate::domain::error::QuantError;
use crate::domain::linalg::{dot, SquareMatrix};
use crate::ports::solver_port::{MeanVarianceProblem, SolverPort};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Status tag of results produced by the closed-form path.
pub const FALLBACK_STATUS: &str = "fallback";

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    /// One weight per asset, in input order.
    pub weights: Vec<f64>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, f64>>,
}

#[derive(Clone, Default)]
pub struct MarkowitzOptimizer {
    solver: Option<Arc<dyn SolverPort>>,
}

impl MarkowitzOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(solver: Arc<dyn SolverPort>) -> Self {
        Self {
            solver: Some(solver),
        }
    }

    pub fn optimize(
        &self,
        expected_returns: &[f64],
        covariance: &[Vec<f64>],
        target_return: Option<f64>,
        allow_short: bool,
    ) -> Result<OptimizationResult, QuantError> {
        let covariance = validate_inputs(expected_returns, covariance)?.symmetrized();
        let problem = MeanVarianceProblem {
            expected_returns,
            covariance: &covariance,
            target_return,
            allow_short,
        };

        if let Some(solver) = &self.solver {
            if let Ok(solution) = solver.solve(&problem) {
                if satisfies_contract(&solution.weights, expected_returns.len(), allow_short) {
                    return Ok(OptimizationResult {
                        weights: solution.weights,
                        status: solution.status,
                        metadata: Some(solution.metadata),
                    });
                }
            }
        }

        closed_form(&problem)
    }
}

impl std::fmt::Debug for MarkowitzOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkowitzOptimizer")
            .field("solver", &self.solver.is_some())
            .finish()
    }
}

fn validate_inputs(
    expected_returns: &[f64],
    covariance: &[Vec<f64>],
) -> Result<SquareMatrix, QuantError> {
    if expected_returns.is_empty() {
        return Err(QuantError::DimensionMismatch {
            reason: "at least one asset is required".into(),
        });
    }
    let matrix = SquareMatrix::from_rows(covariance)?;
    if matrix.dim() != expected_returns.len() {
        return Err(QuantError::DimensionMismatch {
            reason: format!(
                "{} expected returns against a {n}x{n} covariance matrix",
                expected_returns.len(),
                n = matrix.dim()
            ),
        });
    }
    Ok(matrix)
}

fn satisfies_contract(weights: &[f64], assets: usize, allow_short: bool) -> bool {
    weights.len() == assets
        && weights.iter().all(|w| w.is_finite())
        && (weights.iter().sum::<f64>() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
        && (allow_short || weights.iter().all(|&w| w >= 0.0))
}

/// Closed-form minimum-variance weights via the two-multiplier Lagrangian.
/// Relative size below which `ac - b^2` counts as zero.
const DET_TOLERANCE: f64 = 1e-12;

pub fn closed_form(problem: &MeanVarianceProblem<'_>) -> Result<OptimizationResult, QuantError> {
    let mu = problem.expected_returns;
    let inverse = problem.covariance.inverse()?;
    let ones = vec![1.0; mu.len()];
    let inv_ones = inverse.mul_vec(&ones)?;
    let inv_mu = inverse.mul_vec(mu)?;
    let c = dot(&ones, &inv_ones);
    let a = dot(mu, &inv_mu);
    let b = dot(mu, &inv_ones);

    let weights: Vec<f64> = match problem.target_return {
        None => {
            if c == 0.0 || !c.is_finite() {
                return Err(QuantError::SingularSystem);
            }
            inv_ones.iter().map(|w| w / c).collect()
        }
        Some(target) => {
            let det = a * c - b * b;
            if det == 0.0 || det.abs() <= DET_TOLERANCE * ((a * c).abs() + b * b) {
                return Err(QuantError::SingularSystem);
            }
            let lambda1 = (a - target * b) / det;
            let lambda2 = (target * c - b) / det;
            inv_ones
                .iter()
                .zip(&inv_mu)
                .map(|(o, m)| lambda1 * o + lambda2 * m)
                .collect()
        }
    };

    let weights = if problem.allow_short {
        weights
    } else {
        project_to_simplex(&weights)
    };

    Ok(OptimizationResult {
        weights,
        status: FALLBACK_STATUS.to_string(),
        metadata: None,
    })
}

/// Euclidean projection onto `{w : w >= 0, sum(w) = 1}`.
///
/// Falls back to equal weights if nothing survives the projection.
pub fn project_to_simplex(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }

    let mut sorted = weights.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut rho: Option<usize> = None;
    for (idx, &value) in sorted.iter().enumerate() {
        cumulative += value;
        let t = (cumulative - 1.0) / (idx + 1) as f64;
        if value - t > 0.0 {
            rho = Some(idx);
        }
    }

    let theta = match rho {
        Some(rho) => (sorted[..=rho].iter().sum::<f64>() - 1.0) / (rho + 1) as f64,
        None => 0.0,
    };

    let projected: Vec<f64> = weights.iter().map(|w| (w - theta).max(0.0)).collect();
    let total: f64 = projected.iter().sum();
    if total == 0.0 {
        let uniform = 1.0 / weights.len() as f64;
        return vec![uniform; weights.len()];
    }
    projected.iter().map(|w| w / total).collect()
}
