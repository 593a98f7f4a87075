//! Derives, from (W, L), who sends what to whom and in what order (C2).
//!
//! Grounded on `original_source/oars/algorithms/parallel.py`'s
//! `requiredQueues`: the classification table below reproduces its
//! control flow, re-expressed without a shared manager dict.

use crate::matrix::Matrix;

/// The five disjoint peer sets spec.md §3 assigns to each node, plus the
/// node's own index for convenience in logging.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CommsData {
    /// Peers j with W[i,j] != 0 and L[i,j] = L[j,i] = 0: pure W exchange.
    pub wq: Vec<usize>,
    /// Peers j < i with L[i,j] != 0 and W[i,j] = 0: i receives x_j.
    pub up_lq: Vec<usize>,
    /// Peers k > i with L[k,i] != 0 and W[k,i] = 0: i sends x_i to k.
    pub down_lq: Vec<usize>,
    /// Peers j < i with both L[i,j] != 0 and W[i,j] != 0.
    pub up_bq: Vec<usize>,
    /// Peers k > i with both L[k,i] != 0 and W[k,i] != 0.
    pub down_bq: Vec<usize>,
}

/// The set of channels the fabric must create, as ordered (sender,
/// receiver) pairs.
pub type ChannelSpec = Vec<(usize, usize)>;

/// Classifies every off-diagonal pair (i, j), i > j, per spec.md §4.2's
/// table, returning each node's [`CommsData`] and the full channel list.
pub fn plan(w: &Matrix, l: &Matrix) -> (Vec<CommsData>, ChannelSpec) {
    let n = w.n();
    assert_eq!(n, l.n(), "W and L must have the same dimension");

    let mut comms = vec![CommsData::default(); n];
    let mut channels = ChannelSpec::new();

    for i in 0..n {
        for j in 0..i {
            let w_ij = w.is_nonzero(i, j);
            let l_ij = l.is_nonzero(i, j);
            match (l_ij, w_ij) {
                (false, false) => {
                    // No coupling between i and j.
                }
                (false, true) => {
                    channels.push((i, j));
                    channels.push((j, i));
                    comms[j].wq.push(i);
                    comms[i].wq.push(j);
                }
                (true, false) => {
                    channels.push((j, i));
                    comms[i].up_lq.push(j);
                    comms[j].down_lq.push(i);
                }
                (true, true) => {
                    channels.push((i, j));
                    channels.push((j, i));
                    comms[i].up_bq.push(j);
                    comms[j].down_bq.push(i);
                }
            }
        }
    }

    (comms, channels)
}
