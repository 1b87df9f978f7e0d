//! External convex solver port for mean-variance allocation.

use crate::domain::error::QuantError;
use crate::domain::linalg::SquareMatrix;
use std::collections::BTreeMap;

/// Minimise `w' S w` subject to `sum(w) = 1`, optionally `w' mu >= target`
/// and, when short selling is disallowed, `w >= 0`.
#[derive(Debug, Clone, Copy)]
pub struct MeanVarianceProblem<'a> {
    pub expected_returns: &'a [f64],
    /// Already symmetrized.
    pub covariance: &'a SquareMatrix,
    pub target_return: Option<f64>,
    pub allow_short: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverSolution {
    pub weights: Vec<f64>,
    /// Solver-specific status tag, e.g. "optimal".
    pub status: String,
    pub metadata: BTreeMap<String, f64>,
}

pub trait SolverPort: Send + Sync {
    fn solve(&self, problem: &MeanVarianceProblem<'_>) -> Result<SolverSolution, QuantError>;
}
