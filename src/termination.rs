//! Auxiliary worker observing per-iteration iterates for convergence (C5).
//!
//! Grounded on `original_source/oars/algorithms/parallel.py`'s `evaluate`.
//! The shared termination flag is represented as an atomic rather than a
//! lock, per spec.md §9: the monitor writes monotonically and workers do
//! a relaxed read at the top of each round.

use crate::channel::Receiver;
use crate::point::Point;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Single-writer (monitor) / multi-reader (workers) termination target.
/// `0` means "no target set yet"; a positive value `t` means "stop once
/// your round counter reaches `t`" (spec.md §9's fix for the source's
/// inconsistent `terminate.value < itr` branch).
#[derive(Clone)]
pub struct TerminationTarget(Arc<AtomicUsize>);

impl TerminationTarget {
    pub fn new() -> Self {
        TerminationTarget(Arc::new(AtomicUsize::new(0)))
    }

    /// Relaxed read: workers only need eventual visibility of a target
    /// set once, monotonically, by the monitor.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn set(&self, value: usize) {
        self.0.store(value, Ordering::Release);
    }
}

impl Default for TerminationTarget {
    fn default() -> Self {
        Self::new()
    }
}

const STREAK_THRESHOLD: usize = 10;

/// Runs the convergence monitor to completion. Consumes one telemetry
/// sample per node per round; on a `STREAK_THRESHOLD`-round run of
/// `delta < vartol` it sets `target` to `round + STREAK_THRESHOLD` and
/// returns. Bounded to `itrs - STREAK_THRESHOLD` rounds to guarantee
/// liveness if convergence is never observed.
pub fn run_monitor(
    telemetry: &[Receiver],
    vartol: f64,
    itrs: usize,
    checkperiod: usize,
    target: &TerminationTarget,
    verbose: bool,
) {
    let n = telemetry.len();
    let mut previous: Vec<Point> = telemetry
        .iter()
        .map(|rx| rx.recv().expect("worker closed telemetry channel before first sample"))
        .collect();

    let bound = itrs.saturating_sub(STREAK_THRESHOLD);
    let mut streak = 0usize;
    let mut round = 0usize;

    while round < bound {
        let current: Vec<Point> = telemetry
            .iter()
            .map(|rx| rx.recv().expect("worker closed telemetry channel mid-run"))
            .collect();

        // `checkperiod` only gates when we *evaluate* the samples drained
        // above; every round's message must still be drained so the
        // per-pair FIFO discipline in spec.md §5 is preserved.
        if round % checkperiod == 0 {
            let delta: f64 = current
                .iter()
                .zip(previous.iter())
                .map(|(w, prev)| (w - prev).norm())
                .sum();
            if verbose {
                tracing::debug!(round, delta, "termination monitor vartol check");
            }
            if delta < vartol {
                streak += 1;
                if streak >= STREAK_THRESHOLD {
                    target.set(round + STREAK_THRESHOLD);
                    if verbose {
                        tracing::info!(round, "converged on vartol");
                    }
                    return;
                }
            } else {
                streak = 0;
            }
        }

        previous = current;
        round += 1;
    }
}
