//! Spawns workers, aggregates results, enforces warm-start semantics (C6).
//!
//! Grounded on `original_source/oars/algorithms/parallel.py`'s
//! `parallelAlgorithm`. The thread-per-node model replaces gridiron's
//! `ThreadPool`/Rayon-scope task dispatcher: a node worker here is a
//! persistent, blocking-receive loop that owns its state for the whole
//! run, the opposite lifecycle from gridiron's short-lived `Automaton`
//! tasks, so `std::thread::scope` (one thread per node, for the run's
//! duration) is the right fit rather than a bounded job-queue pool. See
//! DESIGN.md.

use crate::channel::{make_telemetry_channels, ChannelFabric};
use crate::config::{IterationConfig, WarmPrimalFn, WarmStart};
use crate::error::{OarsError, OarsResult, RunError, SetupError};
use crate::matrix::Matrix;
use crate::point::{mean, Point};
use crate::resolvent::Resolvent;
use crate::termination::{run_monitor, TerminationTarget};
use crate::topology::plan;
use crate::worker::{NodeChannels, NodeResult, NodeWorker};

const DUAL_SUM_TOL: f64 = 1e-6;

fn check_dual_sum_zero(u: &[Point]) -> Result<(), SetupError> {
    let mut total = 0.0f64;
    for p in u {
        total += p.as_slice().iter().sum::<f64>();
    }
    if total.abs() > DUAL_SUM_TOL {
        return Err(SetupError::DualWarmStartNotZeroSum(total));
    }
    Ok(())
}

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
    l: &Matrix,
    warm_start: WarmStart,
    warm_primal: Option<&WarmPrimalFn>,
) -> Result<Vec<Point>, SetupError> {
    match warm_start {
        WarmStart::Zero => Ok(vec![Point::zeros(m); n]),
        WarmStart::Primal(xbar) => {
            check_warm_shapes(std::slice::from_ref(&xbar), m)?;
            let psi = warm_primal.ok_or(SetupError::MissingWarmPrimalFn)?;
            Ok(psi(&xbar, l))
        }
        WarmStart::Dual(u) => {
            check_warm_shapes(&u, m)?;
            check_dual_sum_zero(&u)?;
            Ok(u)
        }
        WarmStart::Both { primal, dual } => {
            check_warm_shapes(std::slice::from_ref(&primal), m)?;
            check_warm_shapes(&dual, m)?;
            let psi = warm_primal.ok_or(SetupError::MissingWarmPrimalFn)?;
            check_dual_sum_zero(&dual)?;
            let base = psi(&primal, l);
            Ok(base
                .iter()
                .zip(dual.iter())
                .map(|(b, d)| b + d)
                .collect())
        }
    }
}

fn validate_setup(n: usize, w: &Matrix, z: &Matrix, resolvents: &[Box<dyn Resolvent>]) -> Result<(), SetupError> {
    if n == 0 {
        return Err(SetupError::EmptyProblem);
    }
    if resolvents.len() != n {
        return Err(SetupError::DimensionMismatch { w_n: n, z_n: resolvents.len() });
    }
    if w.n() != n || z.n() != n {
        return Err(SetupError::DimensionMismatch { w_n: w.n(), z_n: z.n() });
    }
    w.validate_as_w(n)?;
    z.validate_as_z(n)?;
    let m = resolvents[0].shape();
    for (i, r) in resolvents.iter().enumerate() {
        if r.shape() != m {
            return Err(SetupError::ShapeMismatch(i, r.shape(), m));
        }
    }
    Ok(())
}

/// Runs the parallel frugal resolvent-splitting engine (spec.md §4.6).
///
/// `build` is applied once per node, in order, to turn each node's data
/// payload into its owned [`Resolvent`]; building happens before any
/// thread spawns so shape mismatches fail fast (spec.md §7).
pub fn run_parallel<D>(
    n: usize,
    data: Vec<D>,
    build: impl Fn(D) -> Box<dyn Resolvent>,
    w: Matrix,
    z: Matrix,
    warm_start: WarmStart,
    warm_primal: Option<&WarmPrimalFn>,
    config: IterationConfig,
) -> OarsResult<(Point, Vec<NodeResult>)> {
    let resolvents: Vec<Box<dyn Resolvent>> = data.into_iter().map(build).collect();
    validate_setup(n, &w, &z, &resolvents)?;

    let m = resolvents[0].shape();
    let l = z.strict_lower_neg();
    let v0 = seed_v0(n, m, &l, warm_start, warm_primal)?;
    if v0.len() != n {
        return Err(SetupError::DimensionMismatch { w_n: n, z_n: v0.len() }.into());
    }

    let (comms, channel_spec) = plan(&w, &l);
    let mut fabric = ChannelFabric::build(&channel_spec);

    let monitor_enabled = config.vartol.is_some();
    let (mut telemetry_tx, telemetry_rx) = if monitor_enabled {
        let (tx, rx) = make_telemetry_channels(n);
        (tx.into_iter().map(Some).collect::<Vec<_>>(), rx)
    } else {
        (vec![None; n], Vec::new())
    };

    let term = TerminationTarget::new();

    let node_channels: Vec<NodeChannels> = (0..n)
        .map(|i| {
            let comm = &comms[i];
            NodeChannels {
                up_lq_rx: comm.up_lq.iter().map(|&j| (j, fabric.take_receiver(j, i))).collect(),
                up_bq_rx: comm.up_bq.iter().map(|&j| (j, fabric.take_receiver(j, i))).collect(),
                up_bq_tx: comm.up_bq.iter().map(|&j| (j, fabric.take_sender(i, j))).collect(),
                down_lq_tx: comm.down_lq.iter().map(|&k| (k, fabric.take_sender(i, k))).collect(),
                down_bq_tx: comm.down_bq.iter().map(|&k| (k, fabric.take_sender(i, k))).collect(),
                down_bq_rx: comm.down_bq.iter().map(|&k| (k, fabric.take_receiver(k, i))).collect(),
                wq_tx: comm.wq.iter().map(|&k| (k, fabric.take_sender(i, k))).collect(),
                wq_rx: comm.wq.iter().map(|&k| (k, fabric.take_receiver(k, i))).collect(),
                telemetry_tx: telemetry_tx[i].take(),
            }
        })
        .collect();

    let workers: Vec<NodeWorker> = resolvents
        .into_iter()
        .zip(node_channels)
        .zip(v0)
        .enumerate()
        .map(|(i, ((resolvent, channels), v0))| NodeWorker {
            index: i,
            resolvent,
            w: &w,
            l: &l,
            channels,
            v0,
            gamma: config.gamma,
            alpha: config.alpha,
            itrs: config.itrs,
            term: term.clone(),
            verbose: config.verbose,
        })
        .collect();

    if config.verbose {
        tracing::info!(n, itrs = config.itrs, gamma = config.gamma, alpha = config.alpha, "starting parallel algorithm");
    }

    #[cfg(feature = "core_affinity_pin")]
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();

    let node_results: Vec<Result<NodeResult, RunError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = workers
            .into_iter()
            .enumerate()
            .map(|(_i, worker)| {
                #[cfg(feature = "core_affinity_pin")]
                let core_id = (!core_ids.is_empty()).then(|| core_ids[_i % core_ids.len()]);
                scope.spawn(move || {
                    #[cfg(feature = "core_affinity_pin")]
                    if let Some(core_id) = core_id {
                        core_affinity::set_for_current(core_id);
                    }
                    worker.run()
                })
            })
            .collect();

        if monitor_enabled {
            let vartol = config.vartol.unwrap();
            let itrs = config.itrs;
            let checkperiod = config.checkperiod;
            let verbose = config.verbose;
            let term = term.clone();
            scope.spawn(move || run_monitor(&telemetry_rx, vartol, itrs, checkperiod, &term, verbose));
        }

        handles.into_iter().map(|h| h.join().expect("node worker thread panicked")).collect()
    });

    let mut results = Vec::with_capacity(n);
    for r in node_results {
        results.push(r.map_err(OarsError::from)?);
    }

    let xs: Vec<Point> = results.iter().map(|r| r.x.clone()).collect();
    let xbar = mean(&xs);

    Ok((xbar, results))
}
