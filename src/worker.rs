//! One per operator; runs the iteration protocol using its plan (C4).
//!
//! The seven-phase protocol below is spec.md §4.4, grounded line-for-line
//! on `original_source/oars/algorithms/parallel.py`'s `subproblem`: the
//! phase split (pre-resolvent L receive, prox, telemetry, broadcast,
//! post-resolvent W receive, consensus update, scratch reset) is carried
//! over unchanged, re-expressed as owned channel endpoints instead of a
//! shared queue dictionary keyed by `(i, j)` tuples.

use crate::channel::{Receiver, Sender};
use crate::error::RunError;
use crate::point::Point;
use crate::resolvent::Resolvent;
use crate::termination::TerminationTarget;
use crate::matrix::Matrix;

/// A node's final output once its iteration loop completes.
#[derive(Debug)]
pub struct NodeResult {
    pub x: Point,
    pub v: Point,
    pub log: Option<String>,
    /// Number of outer rounds this node actually completed -- equal to
    /// `itrs` unless the termination monitor cut the run short.
    pub rounds: usize,
}

/// Channel endpoints wired up for one node, grouped by the five peer
/// classes plus telemetry. Built by [`crate::driver`] from a
/// [`crate::channel::ChannelFabric`] and a [`CommsData`].
pub struct NodeChannels {
    /// Receive x_j from up_LQ peers (channel (j, self)).
    pub up_lq_rx: Vec<(usize, Receiver)>,
    /// Receive x_j from up_BQ peers (channel (j, self)).
    pub up_bq_rx: Vec<(usize, Receiver)>,
    /// Send x_self to up_BQ peers (channel (self, j)).
    pub up_bq_tx: Vec<(usize, Sender)>,
    /// Send x_self to down_LQ peers (channel (self, k)).
    pub down_lq_tx: Vec<(usize, Sender)>,
    /// Send x_self to down_BQ peers (channel (self, k)).
    pub down_bq_tx: Vec<(usize, Sender)>,
    /// Receive x_k from down_BQ peers (channel (k, self)).
    pub down_bq_rx: Vec<(usize, Receiver)>,
    /// Send x_self to WQ peers (channel (self, k)).
    pub wq_tx: Vec<(usize, Sender)>,
    /// Receive x_k from WQ peers (channel (k, self)).
    pub wq_rx: Vec<(usize, Receiver)>,
    /// Publish x_self for the termination monitor, if enabled.
    pub telemetry_tx: Option<Sender>,
}

pub struct NodeWorker<'a> {
    pub index: usize,
    pub resolvent: Box<dyn Resolvent + 'a>,
    pub w: &'a Matrix,
    pub l: &'a Matrix,
    pub channels: NodeChannels,
    pub v0: Point,
    pub gamma: f64,
    pub alpha: f64,
    pub itrs: usize,
    pub term: TerminationTarget,
    pub verbose: bool,
}

impl<'a> NodeWorker<'a> {
    pub fn run(mut self) -> Result<NodeResult, RunError> {
        let m = self.resolvent.shape();
        let mut v = self.v0;
        let mut x = Point::zeros(m);
        let mut r = Point::zeros(m);
        let mut vtmp = Point::zeros(m);
        let mut itrs = self.itrs;
        let index = self.index;

        let recv = |rx: &Receiver, round: usize| -> Result<Point, RunError> {
            rx.recv().map_err(|e| RunError {
                node: index,
                round,
                message: format!("channel closed while waiting for a peer: {e}"),
            })
        };
        let send = |tx: &Sender, value: Point, round: usize| -> Result<(), RunError> {
            tx.send(value).map_err(|e| RunError {
                node: index,
                round,
                message: format!("peer dropped its receiver: {e}"),
            })
        };

        let span = tracing::info_span!("node_worker", index);
        let _enter = span.enter();

        let mut itr = 0usize;
        while itr < itrs {
            let target = self.term.get();
            if target != 0 {
                if itr >= target {
                    break;
                }
                itrs = target;
            }

            // Phase 1: pre-resolvent receive (L contributions).
            for (j, rx) in &self.channels.up_lq_rx {
                let xj = recv(rx, itr)?;
                r.add_scaled(self.l.get(index, *j), &xj);
            }
            for (j, rx) in &self.channels.up_bq_rx {
                let xj = recv(rx, itr)?;
                r.add_scaled(self.l.get(index, *j), &xj);
                vtmp.add_scaled(self.w.get(index, *j), &xj);
            }

            // Phase 2: resolvent.
            let y = &v + &r;
            x = self.resolvent.prox(&y, self.alpha);
            if self.verbose {
                tracing::debug!(itr, norm = x.norm(), "resolvent step");
            }

            // Phase 3: telemetry.
            if let Some(tx) = &self.channels.telemetry_tx {
                send(tx, x.clone(), itr)?;
            }

            // Phase 4: broadcast x_i to every peer that needs it.
            for (_, tx) in &self.channels.down_lq_tx {
                send(tx, x.clone(), itr)?;
            }
            for (_, tx) in &self.channels.down_bq_tx {
                send(tx, x.clone(), itr)?;
            }
            for (_, tx) in &self.channels.wq_tx {
                send(tx, x.clone(), itr)?;
            }
            for (_, tx) in &self.channels.up_bq_tx {
                send(tx, x.clone(), itr)?;
            }

            // Phase 5: post-resolvent receive (remaining W contributions).
            for (j, rx) in &self.channels.wq_rx {
                let xj = recv(rx, itr)?;
                vtmp.add_scaled(self.w.get(index, *j), &xj);
            }
            for (k, rx) in &self.channels.down_bq_rx {
                let xk = recv(rx, itr)?;
                vtmp.add_scaled(self.w.get(index, *k), &xk);
            }

            // Phase 6: consensus update.
            let w_ii = self.w.get(index, index);
            let mut v_update = Point::zeros(m);
            v_update.add_scaled(w_ii, &x);
            v_update.add_scaled(1.0, &vtmp);
            v.add_scaled(-self.gamma, &v_update);

            // Phase 7: reset scratch, without reallocating.
            r.fill_zero();
            vtmp.fill_zero();
            itr += 1;
        }

        let log = self.resolvent.log().map(|d| format!("{d:?}"));
        Ok(NodeResult { x, v, log, rounds: itr })
    }
}
