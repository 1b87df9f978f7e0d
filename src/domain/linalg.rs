//! Small dense linear-algebra kernel for the portfolio optimizer.

use crate::domain::error::QuantError;

/// Magnitude below which a pivot is treated as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// Row-major square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    n: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    pub fn identity(n: usize) -> Self {
        let mut data = vec![0.0; n * n];
        for i in 0..n {
            data[i * n + i] = 1.0;
        }
        Self { n, data }
    }

    /// Build from rows; every row must have as many entries as there are rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, QuantError> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(QuantError::DimensionMismatch {
                    reason: format!("row {i} has {} entries, expected {n}", row.len()),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n, data })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n + col]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.n + col] = value;
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.n.max(1)).map(<[f64]>::to_vec).collect()
    }

    /// `(M + M^T) / 2`.
    pub fn symmetrized(&self) -> Self {
        let mut out = self.clone();
        for i in 0..self.n {
            for j in 0..self.n {
                out.set(i, j, (self.get(i, j) + self.get(j, i)) / 2.0);
            }
        }
        out
    }

    /// Gauss-Jordan inversion with partial pivoting.
    ///
    /// Fails with [`QuantError::SingularCovariance`] when the best available
    /// pivot in a column is smaller than [`PIVOT_TOLERANCE`].
    pub fn inverse(&self) -> Result<Self, QuantError> {
        let n = self.n;
        let width = 2 * n;
        let mut aug = vec![0.0; n * width];
        for i in 0..n {
            for j in 0..n {
                aug[i * width + j] = self.get(i, j);
            }
            aug[i * width + n + i] = 1.0;
        }

        for col in 0..n {
            let mut pivot_row = col;
            for row in col + 1..n {
                if aug[row * width + col].abs() > aug[pivot_row * width + col].abs() {
                    pivot_row = row;
                }
            }
            if aug[pivot_row * width + col].abs() < PIVOT_TOLERANCE {
                return Err(QuantError::SingularCovariance);
            }
            if pivot_row != col {
                for k in 0..width {
                    aug.swap(col * width + k, pivot_row * width + k);
                }
            }

            let pivot = aug[col * width + col];
            for k in 0..width {
                aug[col * width + k] /= pivot;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = aug[row * width + col];
                if factor == 0.0 {
                    continue;
                }
                for k in 0..width {
                    aug[row * width + k] -= factor * aug[col * width + k];
                }
            }
        }

        let mut inverse = SquareMatrix::identity(n);
        for i in 0..n {
            for j in 0..n {
                inverse.set(i, j, aug[i * width + n + j]);
            }
        }
        Ok(inverse)
    }

    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>, QuantError> {
        if v.len() != self.n {
            return Err(QuantError::DimensionMismatch {
                reason: format!("vector of length {} against {n}x{n} matrix", v.len(), n = self.n),
            });
        }
        Ok((0..self.n)
            .map(|i| dot(&self.data[i * self.n..(i + 1) * self.n], v))
            .collect())
    }

    pub fn mul(&self, other: &SquareMatrix) -> Result<SquareMatrix, QuantError> {
        if other.n != self.n {
            return Err(QuantError::DimensionMismatch {
                reason: format!("{0}x{0} times {1}x{1}", self.n, other.n),
            });
        }
        let n = self.n;
        let mut out = SquareMatrix::identity(n);
        for i in 0..n {
            for j in 0..n {
                let value: f64 = (0..n).map(|k| self.get(i, k) * other.get(k, j)).sum();
                out.set(i, j, value);
            }
        }
        Ok(out)
    }
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn matrix(rows: &[&[f64]]) -> SquareMatrix {
        SquareMatrix::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    fn assert_identity(m: &SquareMatrix, tol: f64) {
        for i in 0..m.dim() {
            for j in 0..m.dim() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(m.get(i, j), expected, epsilon = tol);
            }
        }
    }

    #[test]
    fn rejects_ragged_rows() {
        let result = SquareMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(QuantError::DimensionMismatch { .. })));
    }

    #[test]
    fn inverse_of_2x2() {
        let m = matrix(&[&[4.0, 7.0], &[2.0, 6.0]]);
        let inv = m.inverse().unwrap();
        assert_abs_diff_eq!(inv.get(0, 0), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(inv.get(0, 1), -0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(inv.get(1, 0), -0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(inv.get(1, 1), 0.4, epsilon = 1e-12);
    }

    #[test]
    fn inverse_needs_pivoting() {
        // zero on the leading diagonal
        let m = matrix(&[&[0.0, 1.0, 2.0], &[1.0, 0.0, 3.0], &[4.0, -3.0, 8.0]]);
        let inv = m.inverse().unwrap();
        assert_identity(&m.mul(&inv).unwrap(), 1e-9);
    }

    #[test]
    fn singular_matrix_fails() {
        let m = matrix(&[&[1.0, 2.0], &[2.0, 4.0]]);
        assert!(matches!(m.inverse(), Err(QuantError::SingularCovariance)));
    }

    #[test]
    fn tiny_pivot_counts_as_singular() {
        let m = matrix(&[&[1e-13, 0.0], &[0.0, 1e-13]]);
        assert!(m.inverse().is_err());
    }

    #[test]
    fn symmetrize_averages_transpose() {
        let m = matrix(&[&[1.0, 2.0], &[4.0, 3.0]]);
        let s = m.symmetrized();
        assert_eq!(s.rows(), vec![vec![1.0, 3.0], vec![3.0, 3.0]]);
    }

    #[test]
    fn matrix_vector_product() {
        let m = matrix(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(m.mul_vec(&[1.0, 1.0]).unwrap(), vec![3.0, 7.0]);
        assert!(m.mul_vec(&[1.0]).is_err());
    }

    #[test]
    fn empty_matrix_inverts_to_empty() {
        let m = SquareMatrix::from_rows(&[]).unwrap();
        assert_eq!(m.inverse().unwrap().dim(), 0);
    }
}
