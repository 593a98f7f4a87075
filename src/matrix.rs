//! The design matrices W and Z, and the derivation of L from Z.
//!
//! Dense `Vec<Vec<f64>>` storage, matching every numeric crate in the
//! retrieval pack: none of them reach for `ndarray`/`nalgebra`, and a
//! frugal-splitting run's n is small enough (one row per cooperating
//! operator) that a dense representation costs nothing in practice.

use crate::error::SetupError;

const TOL: f64 = 1e-9;

/// A square n x n matrix of f64.
#[derive(Clone, Debug)]
pub struct Matrix {
    n: usize,
    rows: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, SetupError> {
        let n = rows.len();
        for r in &rows {
            if r.len() != n {
                return Err(SetupError::WNotSquare { rows: n, cols: r.len() });
            }
        }
        Ok(Matrix { n, rows })
    }

    pub fn zeros(n: usize) -> Self {
        Matrix { n, rows: vec![vec![0.0; n]; n] }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.rows[i][j] = value;
    }

    pub fn is_nonzero(&self, i: usize, j: usize) -> bool {
        self.get(i, j).abs() > TOL
    }

    /// Checks symmetry and that every row sums to ~0 (W's null space is
    /// spanned by the all-ones vector).
    pub fn validate_as_w(&self, n: usize) -> Result<(), SetupError> {
        if self.n != n {
            return Err(SetupError::WNotSquare { rows: self.n, cols: self.n });
        }
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                let wij = self.get(i, j);
                let wji = self.get(j, i);
                if (wij - wji).abs() > TOL {
                    return Err(SetupError::NonSymmetricW { i, j, wij, wji });
                }
            }
        }
        for i in 0..self.n {
            let row_sum: f64 = self.rows[i].iter().sum();
            if row_sum.abs() > TOL {
                return Err(SetupError::NonZeroRowSum(i, row_sum));
            }
        }
        Ok(())
    }

    /// Checks that Z has a zero diagonal and a zero strictly-upper part
    /// (only the strictly-lower part of Z is meaningful to the algorithm).
    pub fn validate_as_z(&self, n: usize) -> Result<(), SetupError> {
        if self.n != n {
            return Err(SetupError::ZNotSquare { rows: self.n, cols: self.n });
        }
        for i in 0..self.n {
            let diag = self.get(i, i);
            if diag.abs() > TOL {
                return Err(SetupError::NonZeroDiagonalZ(i, diag));
            }
            for j in (i + 1)..self.n {
                let value = self.get(i, j);
                if value.abs() > TOL {
                    return Err(SetupError::NonZeroUpperZ { i, j, value });
                }
            }
        }
        Ok(())
    }

    /// L = -strict_lower(Z). Mirrors `parallelAlgorithm`'s
    /// `L = -np.tril(Z, -1)` in the original source.
    pub fn strict_lower_neg(&self) -> Matrix {
        let mut l = Matrix::zeros(self.n);
        for i in 0..self.n {
            for j in 0..i {
                l.set(i, j, -self.get(i, j));
            }
        }
        l
    }
}
