//! Error taxonomy for the frugal resolvent-splitting engine.
//!
//! Setup errors are detected before any worker spawns and never leave a
//! half-constructed run behind. Runtime errors originate in a node's
//! resolvent and are surfaced by the [`crate::driver`] once the failing
//! worker's thread has been observed to return one.

use thiserror::Error;

/// Raised while validating inputs, before any worker thread is spawned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SetupError {
    #[error("resolvent {0} has shape {1}, expected {2} (all resolvents in a run must share shape)")]
    ShapeMismatch(usize, usize, usize),

    #[error("W is not square: {rows} rows, {cols} columns")]
    WNotSquare { rows: usize, cols: usize },

    #[error("Z is not square: {rows} rows, {cols} columns")]
    ZNotSquare { rows: usize, cols: usize },

    #[error("W[{i},{j}] = {wij} but W[{j},{i}] = {wji}; W must be symmetric")]
    NonSymmetricW { i: usize, j: usize, wij: f64, wji: f64 },

    #[error("row {0} of W sums to {1}, expected 0 (W must have null space spanned by 1)")]
    NonZeroRowSum(usize, f64),

    #[error("Z[{0},{0}] = {1}, expected 0 (Z's diagonal must be zero)")]
    NonZeroDiagonalZ(usize, f64),

    #[error("Z[{i},{j}] = {value} with j > i; Z's strictly-upper part is unused and must be zero")]
    NonZeroUpperZ { i: usize, j: usize, value: f64 },

    #[error("W is {w_n}x{w_n} but Z is {z_n}x{z_n}; both must be n x n for the same n")]
    DimensionMismatch { w_n: usize, z_n: usize },

    #[error("n must be at least 1; got 0 nodes")]
    EmptyProblem,

    #[error("warm-start dual components sum to {0}, expected 0 (the lift-sum-zero invariant)")]
    DualWarmStartNotZeroSum(f64),

    #[error("a primal warm-start was given but no warm_primal function was supplied")]
    MissingWarmPrimalFn,
}

/// Raised when a node's resolvent fails during a run.
#[derive(Debug, Error)]
#[error("node {node} failed during round {round}: {message}")]
pub struct RunError {
    pub node: usize,
    pub round: usize,
    pub message: String,
}

/// The union of everything `run_parallel`/`run_serial` can fail with.
#[derive(Debug, Error)]
pub enum OarsError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Run(#[from] RunError),
}

pub type OarsResult<T> = Result<T, OarsError>;
