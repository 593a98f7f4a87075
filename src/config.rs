//! Run parameters and warm-start inputs (spec.md §6).
//!
//! `IterationConfig` bundles the scalar options into one struct with a
//! `Default` matching spec.md's documented defaults, the way
//! `monistowl-gat`'s `AdmmConfig` bundles its ADMM solver's knobs.

use crate::point::Point;

#[derive(Clone, Debug)]
pub struct IterationConfig {
    /// Hard upper bound on outer iterations.
    pub itrs: usize,
    /// Scalar multiplier on the consensus update.
    pub gamma: f64,
    /// Resolvent step size.
    pub alpha: f64,
    /// Enables the termination monitor when `Some`; its value is the
    /// per-round total-variation threshold.
    pub vartol: Option<f64>,
    /// The monitor's sampling cadence.
    pub checkperiod: usize,
    /// Emit `tracing` progress events at `INFO` instead of `DEBUG`.
    pub verbose: bool,
}

impl Default for IterationConfig {
    fn default() -> Self {
        IterationConfig {
            itrs: 1001,
            gamma: 0.9,
            alpha: 1.0,
            vartol: None,
            checkperiod: 1,
            verbose: false,
        }
    }
}

/// Warm-start input for v0, replacing spec.md §6's two independent
/// optional parameters (`warmstart_primal`, `warmstart_dual`) with one
/// typed argument -- recorded as a deliberate cleanup in DESIGN.md.
pub enum WarmStart {
    /// v0 = 0^n.
    Zero,
    /// v0 seeded from a primal warm-start via the caller-supplied
    /// `warm_primal` function (spec.md §9's external `psi(x_bar, L)`;
    /// this crate does not attempt to reverse-engineer its exact form).
    Primal(Point),
    /// v0 = u, component-wise; caller guarantees `sum(u) = 0`.
    Dual(Vec<Point>),
    /// Primal warm-start folded through `warm_primal`, then `u` added.
    Both { primal: Point, dual: Vec<Point> },
}

impl Default for WarmStart {
    fn default() -> Self {
        WarmStart::Zero
    }
}

/// The external "warm-primal" routine spec.md §4.6/§9 treats as an
/// opaque, caller-supplied function: `v0 = psi(x_bar, L)`.
pub type WarmPrimalFn<'a> = dyn Fn(&Point, &crate::matrix::Matrix) -> Vec<Point> + 'a;
