//! Single-threaded implementation of the same recurrence (C7).
//!
//! Grounded on `original_source/oars/algorithms/serial.py`'s
//! `serialAlgorithm`, kept deliberately close to it: this module defines
//! the semantics [`crate::driver::run_parallel`] must match (spec.md §1),
//! so drifting from the reference's control flow would undermine its
//! purpose as an oracle for the serial/parallel equivalence property.

use crate::config::{IterationConfig, WarmPrimalFn, WarmStart};
use crate::error::{OarsResult, SetupError};
use crate::matrix::Matrix;
use crate::point::{mean, Point};
use crate::resolvent::Resolvent;
use crate::worker::NodeResult;

const DUAL_SUM_TOL: f64 = 1e-6;

/// Every warm-start `Point` the caller supplies must share the
/// resolvents' shape `m`, or it silently corrupts `Point`'s `zip`-based
/// arithmetic instead of failing fast (spec.md §7).
fn check_warm_shapes(points: &[Point], m: usize) -> Result<(), SetupError> {
    for (i, p) in points.iter().enumerate() {
        if p.shape() != m {
            return Err(SetupError::ShapeMismatch(i, p.shape(), m));
        }
    }
    Ok(())
}

fn seed_v0(
    n: usize,
    m: usize,
    z: &Matrix,
    warm_start: WarmStart,
    warm_primal: Option<&WarmPrimalFn>,
) -> Result<Vec<Point>, SetupError> {
    match warm_start {
        WarmStart::Zero => Ok(vec![Point::zeros(m); n]),
        WarmStart::Primal(xbar) => {
            check_warm_shapes(std::slice::from_ref(&xbar), m)?;
            let psi = warm_primal.ok_or(SetupError::MissingWarmPrimalFn)?;
            // The serial reference sweeps with Z directly (spec.md §4.7
            // note: "the reference uses the original upper-index
            // convention of the paper"), so psi is applied to Z's
            // strictly-lower negation the same way the parallel driver
            // does, to keep both engines' v0 identical for property 2.
            Ok(psi(&xbar, &z.strict_lower_neg()))
        }
        WarmStart::Dual(u) => {
            check_warm_shapes(&u, m)?;
            let total: f64 = u.iter().flat_map(|p| p.as_slice().iter()).sum();
            if total.abs() > DUAL_SUM_TOL {
                return Err(SetupError::DualWarmStartNotZeroSum(total));
            }
            Ok(u)
        }
        WarmStart::Both { primal, dual } => {
            check_warm_shapes(std::slice::from_ref(&primal), m)?;
            check_warm_shapes(&dual, m)?;
            let psi = warm_primal.ok_or(SetupError::MissingWarmPrimalFn)?;
            let total: f64 = dual.iter().flat_map(|p| p.as_slice().iter()).sum();
            if total.abs() > DUAL_SUM_TOL {
                return Err(SetupError::DualWarmStartNotZeroSum(total));
            }
            let base = psi(&primal, &z.strict_lower_neg());
            Ok(base.iter().zip(dual.iter()).map(|(b, d)| b + d).collect())
        }
    }
}

/// Runs the serial reference algorithm (spec.md §4.7).
///
/// `objective`, when given together with `objtol`, stops the run early
/// once the objective value stabilizes within tolerance, in addition to
/// the `vartol` and `itrs` stopping rules shared with the parallel
/// engine.
pub fn run_serial<D>(
    n: usize,
    data: Vec<D>,
    build: impl Fn(D) -> Box<dyn Resolvent>,
    w: Matrix,
    z: Matrix,
    warm_start: WarmStart,
    warm_primal: Option<&WarmPrimalFn>,
    config: IterationConfig,
    objtol: Option<f64>,
    objective: Option<impl Fn(&[Point]) -> f64>,
) -> OarsResult<(Point, Vec<NodeResult>)> {
    let mut resolvents: Vec<Box<dyn Resolvent>> = data.into_iter().map(build).collect();

    if n == 0 {
        return Err(SetupError::EmptyProblem.into());
    }
    if resolvents.len() != n || w.n() != n || z.n() != n {
        return Err(SetupError::DimensionMismatch { w_n: n, z_n: resolvents.len() }.into());
    }
    w.validate_as_w(n)?;
    z.validate_as_z(n)?;
    let m = resolvents[0].shape();
    for (i, r) in resolvents.iter().enumerate() {
        if r.shape() != m {
            return Err(SetupError::ShapeMismatch(i, r.shape(), m).into());
        }
    }

    let mut all_x: Vec<Point> = vec![Point::zeros(m); n];
    let mut all_v = seed_v0(n, m, &z, warm_start, warm_primal)?;
    if all_v.len() != n {
        return Err(SetupError::DimensionMismatch { w_n: n, z_n: all_v.len() }.into());
    }

    let mut prev_objective: Option<f64> = None;
    let mut rounds_done = 0usize;

    for itr in 0..config.itrs {
        rounds_done = itr + 1;
        // Sequential sweep: y_i = v_i - sum_{j<i} Z[i,j] x_j. `delta`
        // accumulates round-to-round variation, the same quantity
        // `termination.rs`'s `run_monitor` computes from telemetry.
        let mut delta = 0.0f64;
        for i in 0..n {
            let mut y = all_v[i].clone();
            for j in 0..i {
                y.add_scaled(-z.get(i, j), &all_x[j]);
            }
            let x = resolvents[i].prox(&y, config.alpha);
            delta += (&x - &all_x[i]).norm();
            all_x[i] = x;
        }
        if config.verbose {
            tracing::debug!(itr, delta, "serial sweep complete");
        }

        // Parallel consensus step: v_i <- v_i - gamma * sum_j W[i,j] x_j.
        let mut wx = vec![Point::zeros(m); n];
        for i in 0..n {
            for j in 0..n {
                wx[i].add_scaled(w.get(i, j), &all_x[j]);
            }
            all_v[i].add_scaled(-config.gamma, &wx[i]);
        }

        if let Some(tol) = config.vartol {
            if itr % config.checkperiod == 0 && delta < tol {
                break;
            }
        }

        if let (Some(tol), Some(obj)) = (objtol, objective.as_ref()) {
            let value = obj(&all_x);
            if let Some(prev) = prev_objective {
                if (value - prev).abs() < tol {
                    if config.verbose {
                        tracing::info!(itr, value, "converged on objective tolerance");
                    }
                    break;
                }
            }
            prev_objective = Some(value);
        }
    }

    let results: Vec<NodeResult> = all_x
        .iter()
        .zip(all_v.iter())
        .zip(resolvents.iter())
        .map(|((x, v), r)| NodeResult {
            x: x.clone(),
            v: v.clone(),
            log: r.log().map(|d| format!("{d:?}")),
            rounds: rounds_done,
        })
        .collect();

    let xbar = mean(&all_x);
    Ok((xbar, results))
}
