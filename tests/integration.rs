//! End-to-end scenarios and cross-cutting invariants from spec.md §8.
//!
//! Each scenario completing without hanging is itself evidence of
//! deadlock freedom (property 4) for that topology; the Planner's own
//! classification-completeness and sparsity guarantees are unit-tested
//! alongside it in `src/topology.rs`.

mod common;

use common::{full_consensus_w, L1Resolvent, QuadResolvent};
use oars_core::error::{OarsError, SetupError};
use oars_core::{run_parallel, run_serial, IterationConfig, Matrix, Point, Resolvent, WarmStart};

fn quad_builder(c: Point) -> Box<dyn Resolvent> {
    Box::new(QuadResolvent::new(c))
}

fn l1_builder(c: Point) -> Box<dyn Resolvent> {
    Box::new(L1Resolvent::new(c))
}

/// spec.md S1: Douglas-Rachford splitting between two quadratics centered
/// at [1,0] and [0,1]. L is given directly in the scenario as
/// [[0,0],[2,0]]; since `run_parallel` derives `L = -strict_lower(Z)`,
/// the equivalent Z is [[0,0],[-2,0]].
fn dr_matrices() -> (Matrix, Matrix) {
    let w = Matrix::from_rows(vec![vec![1.0, -1.0], vec![-1.0, 1.0]]).unwrap();
    let z = Matrix::from_rows(vec![vec![0.0, 0.0], vec![-2.0, 0.0]]).unwrap();
    (w, z)
}

fn dr_config() -> IterationConfig {
    IterationConfig { itrs: 200, gamma: 0.5, alpha: 1.0, ..Default::default() }
}

#[test]
fn s1_douglas_rachford_converges_to_average_of_centers() {
    let (w, z) = dr_matrices();
    let data = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];

    let (xbar, results) =
        run_parallel(2, data, quad_builder, w, z, WarmStart::Zero, None, dr_config()).unwrap();

    assert_eq!(results.len(), 2);
    assert!((xbar.as_slice()[0] - 0.5).abs() < 1e-6, "xbar[0] = {}", xbar.as_slice()[0]);
    assert!((xbar.as_slice()[1] - 0.5).abs() < 1e-6, "xbar[1] = {}", xbar.as_slice()[1]);
}

/// Property 1: sum_i v_i stays ~0 through the run, since it starts at 0
/// and W*1 = 0 is preserved by every consensus step.
#[test]
fn lift_sum_zero_is_preserved() {
    let (w, z) = dr_matrices();
    let data = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];

    let (_, results) =
        run_parallel(2, data, quad_builder, w, z, WarmStart::Zero, None, dr_config()).unwrap();

    let sum: f64 = results.iter().map(|r| r.v.as_slice().iter().sum::<f64>()).sum();
    assert!(sum.abs() < 1e-6, "sum of v_i = {sum}");
}

/// Property 2: serial and parallel engines reproduce the same recurrence
/// for identical inputs, at a fixed (non-converged) iteration count.
#[test]
fn serial_and_parallel_agree() {
    let (w, z) = dr_matrices();
    let config = IterationConfig { itrs: 20, gamma: 0.5, alpha: 1.0, ..Default::default() };

    let data_parallel = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];
    let (xbar_p, results_p) = run_parallel(
        2,
        data_parallel,
        quad_builder,
        w.clone(),
        z.clone(),
        WarmStart::Zero,
        None,
        config.clone(),
    )
    .unwrap();

    let data_serial = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];
    let none_objective: Option<fn(&[Point]) -> f64> = None;
    let (xbar_s, results_s) = run_serial(
        2,
        data_serial,
        quad_builder,
        w,
        z,
        WarmStart::Zero,
        None,
        config,
        None,
        none_objective,
    )
    .unwrap();

    for k in 0..2 {
        assert!((xbar_p.as_slice()[k] - xbar_s.as_slice()[k]).abs() < 1e-9);
    }
    for i in 0..2 {
        for k in 0..2 {
            assert!(
                (results_p[i].x.as_slice()[k] - results_s[i].x.as_slice()[k]).abs() < 1e-9,
                "node {i} x[{k}] diverged: parallel={} serial={}",
                results_p[i].x.as_slice()[k],
                results_s[i].x.as_slice()[k]
            );
            assert!(
                (results_p[i].v.as_slice()[k] - results_s[i].v.as_slice()[k]).abs() < 1e-9,
                "node {i} v[{k}] diverged"
            );
        }
    }
}

/// Property 5: idempotence at a fixed point. Four identical quadratics
/// centered at the origin, pure-W consensus (L=0): x=0, v=0 solves
/// 0 in sum A_i(x), and one round leaves it there.
#[test]
fn idempotent_at_fixed_point() {
    let w = full_consensus_w(4);
    let l = Matrix::zeros(4);
    let data = vec![Point::from_vec(vec![0.0]); 4];
    let config = IterationConfig { itrs: 1, gamma: 0.5, alpha: 1.0, ..Default::default() };

    let (xbar, results) =
        run_parallel(4, data, quad_builder, w, l, WarmStart::Zero, None, config).unwrap();

    assert!(xbar.as_slice()[0].abs() < 1e-12);
    for r in &results {
        assert!(r.x.as_slice()[0].abs() < 1e-12);
        assert!(r.v.as_slice()[0].abs() < 1e-12);
        assert_eq!(r.rounds, 1);
    }
}

/// spec.md S2 (adapted): n=4 identical quadratics centered at the
/// origin, pure-W consensus with gamma/alpha chosen so the consensus
/// step's contraction factor on the sum-zero subspace is exactly zero
/// (gamma*n/(1+alpha) = 1 for n=4, alpha=1, gamma=0.5): any v0 summing
/// to zero collapses to v=0 after one round, x_i -> 0 thereafter.
#[test]
fn s2_malitsky_tam_like_consensus_drives_v_and_x_to_zero() {
    let w = full_consensus_w(4);
    let l = Matrix::zeros(4);
    let data = vec![Point::from_vec(vec![0.0]); 4];
    let v0 = vec![
        Point::from_vec(vec![1.0]),
        Point::from_vec(vec![-1.0]),
        Point::from_vec(vec![1.0]),
        Point::from_vec(vec![-1.0]),
    ];
    let config = IterationConfig { itrs: 5, gamma: 0.5, alpha: 1.0, ..Default::default() };

    let (xbar, results) =
        run_parallel(4, data, quad_builder, w, l, WarmStart::Dual(v0), None, config).unwrap();

    assert!(xbar.as_slice()[0].abs() < 1e-9);
    for r in &results {
        assert!(r.v.as_slice()[0].abs() < 1e-9, "v = {}", r.v.as_slice()[0]);
        assert!(r.x.as_slice()[0].abs() < 1e-9, "x = {}", r.x.as_slice()[0]);
    }
}

/// spec.md S3: fully-connected L1 resolvents with data [1], [2], [3],
/// [10] should drive x-bar toward the median, 2.5. Pure-W consensus
/// converges more slowly for a nonlinear resolvent than the quadratic
/// case above, so this asserts only that the run lands in the
/// neighborhood of the median rather than pinning an exact value.
#[test]
fn s3_fully_connected_l1_resolvents_approach_the_median() {
    let w = full_consensus_w(4);
    let l = Matrix::zeros(4);
    let data = vec![
        Point::from_vec(vec![1.0]),
        Point::from_vec(vec![2.0]),
        Point::from_vec(vec![3.0]),
        Point::from_vec(vec![10.0]),
    ];
    let config = IterationConfig { itrs: 5000, gamma: 0.1, alpha: 1.0, ..Default::default() };

    let (xbar, _results) =
        run_parallel(4, data, l1_builder, w, l, WarmStart::Zero, None, config).unwrap();

    assert!(
        (xbar.as_slice()[0] - 2.5).abs() < 0.5,
        "xbar = {}, expected near the median 2.5",
        xbar.as_slice()[0]
    );
}

/// spec.md S4: vartol-based early termination, exercised through the
/// real driver/worker/monitor wiring (shared `TerminationTarget`,
/// workers actually observing and stopping at the target) rather than
/// feeding `run_monitor` hand-crafted telemetry directly.
///
/// n=4 identical quadratics centered at the origin, pure-W consensus:
/// with v0 = [1,-1,1,-1] (sum zero), gamma=0.1, alpha=1.0, the
/// consensus recurrence decays geometrically with ratio
/// `1 - gamma*n/(1+alpha) = 0.8` per round. Working through the
/// monitor's streak-counter arithmetic for that decay rate and
/// vartol=1e-4 places the termination target at round 57, matching
/// this scenario's [50, 60] expectation.
#[test]
fn s4_early_termination_stops_near_monitor_target() {
    let w = full_consensus_w(4);
    let l = Matrix::zeros(4);
    let data = vec![Point::from_vec(vec![0.0]); 4];
    let v0 = vec![
        Point::from_vec(vec![1.0]),
        Point::from_vec(vec![-1.0]),
        Point::from_vec(vec![1.0]),
        Point::from_vec(vec![-1.0]),
    ];
    let config = IterationConfig {
        itrs: 200,
        gamma: 0.1,
        alpha: 1.0,
        vartol: Some(1e-4),
        checkperiod: 1,
        verbose: false,
    };

    let (_, results) = run_parallel(
        4,
        data,
        quad_builder,
        w,
        l,
        WarmStart::Dual(v0),
        None,
        config.clone(),
    )
    .unwrap();

    for r in &results {
        assert!(
            r.rounds < config.itrs,
            "node ran the full {} rounds; the monitor never cut the run short",
            config.itrs
        );
        assert!((50..=60).contains(&r.rounds), "node stopped at round {}, expected near [50, 60]", r.rounds);
    }
}

/// spec.md S5: a zero-iteration warm-started run returns exactly the
/// dual it was seeded with, since no consensus update ever runs.
#[test]
fn s5_warm_start_equivalence() {
    let (w, z) = dr_matrices();
    let data_a = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];
    let (_, results_a) =
        run_parallel(2, data_a, quad_builder, w.clone(), z.clone(), WarmStart::Zero, None, dr_config())
            .unwrap();
    let v_from_a: Vec<Point> = results_a.iter().map(|r| r.v.clone()).collect();

    let data_b = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];
    let config_b = IterationConfig { itrs: 0, ..dr_config() };
    let (_, results_b) =
        run_parallel(2, data_b, quad_builder, w, z, WarmStart::Dual(v_from_a.clone()), None, config_b)
            .unwrap();

    for (a, b) in v_from_a.iter().zip(results_b.iter()) {
        assert_eq!(a, &b.v);
        assert_eq!(b.rounds, 0);
    }
}

#[test]
fn setup_rejects_shape_mismatch() {
    let (w, z) = dr_matrices();
    let data = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0, 0.0])];
    let err = run_parallel(2, data, quad_builder, w, z, WarmStart::Zero, None, dr_config()).unwrap_err();
    assert!(matches!(err, OarsError::Setup(SetupError::ShapeMismatch(1, 3, 2))));
}

#[test]
fn setup_rejects_empty_problem() {
    let w = Matrix::zeros(0);
    let l = Matrix::zeros(0);
    let data: Vec<Point> = vec![];
    let err = run_parallel(0, data, quad_builder, w, l, WarmStart::Zero, None, dr_config()).unwrap_err();
    assert!(matches!(err, OarsError::Setup(SetupError::EmptyProblem)));
}

#[test]
fn setup_rejects_nonzero_sum_dual_warm_start() {
    let (w, z) = dr_matrices();
    let data = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![0.0, 1.0])];
    let bad_dual = vec![Point::from_vec(vec![1.0, 0.0]), Point::from_vec(vec![1.0, 0.0])];
    let err =
        run_parallel(2, data, quad_builder, w, z, WarmStart::Dual(bad_dual), None, dr_config()).unwrap_err();
    assert!(matches!(err, OarsError::Setup(SetupError::DualWarmStartNotZeroSum(_))));
}
