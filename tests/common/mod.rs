//! Resolvent fixtures shared by the integration tests in spec.md §8.
//!
//! The concrete resolvent library is out of scope for `oars-core` (see
//! `src/lib.rs`'s module docs); these two shapes exist only so the tests
//! have something to run the engine against, grounded on
//! `original_source/tests/proxs.py`'s `quadprox` and `absprox`.

use oars_core::{Matrix, Point, Resolvent};

/// `prox(y, tau) = (y + tau*c) / (1 + tau)`.
pub struct QuadResolvent {
    c: Point,
}

impl QuadResolvent {
    pub fn new(c: Point) -> Self {
        QuadResolvent { c }
    }
}

impl Resolvent for QuadResolvent {
    fn shape(&self) -> usize {
        self.c.shape()
    }

    fn prox(&mut self, y: &Point, tau: f64) -> Point {
        let mut out = y.clone();
        out.add_scaled(tau, &self.c);
        &out / (1.0 + tau)
    }
}

/// Soft-threshold resolvent of `||x - c||_1`.
pub struct L1Resolvent {
    c: Point,
}

impl L1Resolvent {
    pub fn new(c: Point) -> Self {
        L1Resolvent { c }
    }
}

impl Resolvent for L1Resolvent {
    fn shape(&self) -> usize {
        self.c.shape()
    }

    fn prox(&mut self, y: &Point, tau: f64) -> Point {
        let u = y - &self.c;
        let mut out = Point::zeros(u.shape());
        for k in 0..u.shape() {
            let uk = u[k];
            out[k] = uk.signum() * (uk.abs() - tau).max(0.0) + self.c[k];
        }
        out
    }
}

/// A fully-connected consensus matrix: `W[i,i] = n-1`, `W[i,j] = -1`.
pub fn full_consensus_w(n: usize) -> Matrix {
    let mut rows = vec![vec![-1.0; n]; n];
    for i in 0..n {
        rows[i][i] = (n - 1) as f64;
    }
    Matrix::from_rows(rows).unwrap()
}

