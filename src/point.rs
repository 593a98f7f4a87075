//! A runtime-sized point in R^m with the arithmetic the iteration loop needs.
//!
//! Resolvent shape is only known once a run is set up (different problems
//! bind different `m`), unlike gridiron's [`crate::num_vec::Vector`] which
//! fixes its dimension at compile time via a const generic. `Point` trades
//! that compile-time check for a runtime one so the same engine can drive
//! resolvents over scalars, R^k, or flattened matrices.

use core::ops;

/// A point in R^m, stored densely.
#[derive(Clone, Debug, PartialEq)]
pub struct Point(Vec<f64>);

impl Point {
    /// The zero vector in R^m.
    pub fn zeros(m: usize) -> Self {
        Point(vec![0.0; m])
    }

    pub fn from_vec(data: Vec<f64>) -> Self {
        Point(data)
    }

    pub fn shape(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    /// Euclidean norm, used by the termination monitor's variation check
    /// and by property tests.
    pub fn norm(&self) -> f64 {
        self.0.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// `self += coeff * other`, in place. The hot-path accumulation used by
    /// the node worker's `r` and `vtmp` scratch vectors (spec's
    /// scratch-vector-reuse note): no allocation once `self` exists.
    pub fn add_scaled(&mut self, coeff: f64, other: &Point) {
        debug_assert_eq!(self.0.len(), other.0.len());
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a += coeff * b;
        }
    }

    /// Zero out in place without reallocating, mirroring the reference
    /// implementation's `local_r.fill(0)` / `v_temp.fill(0)`.
    pub fn fill_zero(&mut self) {
        for x in self.0.iter_mut() {
            *x = 0.0;
        }
    }
}

impl ops::Add for &Point {
    type Output = Point;
    fn add(self, other: &Point) -> Point {
        Point(self.0.iter().zip(&other.0).map(|(a, b)| a + b).collect())
    }
}

impl ops::Sub for &Point {
    type Output = Point;
    fn sub(self, other: &Point) -> Point {
        Point(self.0.iter().zip(&other.0).map(|(a, b)| a - b).collect())
    }
}

impl ops::Mul<f64> for &Point {
    type Output = Point;
    fn mul(self, scalar: f64) -> Point {
        Point(self.0.iter().map(|a| a * scalar).collect())
    }
}

impl ops::Div<f64> for &Point {
    type Output = Point;
    fn div(self, scalar: f64) -> Point {
        Point(self.0.iter().map(|a| a / scalar).collect())
    }
}

impl ops::Index<usize> for Point {
    type Output = f64;
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl ops::IndexMut<usize> for Point {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

/// Componentwise mean of a slice of points, used to compute x-bar.
pub fn mean(points: &[Point]) -> Point {
    let m = points[0].shape();
    let mut acc = Point::zeros(m);
    for p in points {
        acc.add_scaled(1.0, p);
    }
    &acc / (points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_scaled_matches_manual_arithmetic() {
        let mut a = Point::from_vec(vec![1.0, 2.0, 3.0]);
        let b = Point::from_vec(vec![0.5, 0.5, 0.5]);
        a.add_scaled(2.0, &b);
        assert_eq!(a, Point::from_vec(vec![2.0, 3.0, 4.0]));
    }

    #[test]
    fn norm_of_zero_is_zero() {
        assert_eq!(Point::zeros(4).norm(), 0.0);
    }

    #[test]
    fn mean_of_points() {
        let pts = vec![
            Point::from_vec(vec![0.0, 0.0]),
            Point::from_vec(vec![2.0, 4.0]),
        ];
        assert_eq!(mean(&pts), Point::from_vec(vec![1.0, 2.0]));
    }
}
