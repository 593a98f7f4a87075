//! Typed one-directional FIFO channels indexed by ordered node pairs (C3).
//!
//! Carries the same `crossbeam_channel` cargo feature gridiron's
//! `automaton.rs` and `thread_pool.rs` use to pick between
//! `crossbeam-channel` and `std::sync::mpsc`. Channels are unbounded: per
//! spec.md §9, each edge carries at most two messages per round, so an
//! implementation may bound them to size 2 without changing semantics,
//! but there is no correctness reason to do so here.

use crate::point::Point;
use crate::topology::ChannelSpec;
use std::collections::HashMap;

#[cfg(feature = "crossbeam_channel")]
pub type Sender = crossbeam_channel::Sender<Point>;
#[cfg(feature = "crossbeam_channel")]
pub type Receiver = crossbeam_channel::Receiver<Point>;

#[cfg(not(feature = "crossbeam_channel"))]
pub type Sender = std::sync::mpsc::Sender<Point>;
#[cfg(not(feature = "crossbeam_channel"))]
pub type Receiver = std::sync::mpsc::Receiver<Point>;

fn make_channel() -> (Sender, Receiver) {
    #[cfg(feature = "crossbeam_channel")]
    {
        crossbeam_channel::unbounded()
    }
    #[cfg(not(feature = "crossbeam_channel"))]
    {
        std::sync::mpsc::channel()
    }
}

/// Owns every channel the Planner says is required, exactly once per
/// ordered (sender, receiver) pair.
pub struct ChannelFabric {
    senders: HashMap<(usize, usize), Sender>,
    receivers: HashMap<(usize, usize), Receiver>,
}

impl ChannelFabric {
    /// Builds exactly the channels named by `spec`, with no duplicates.
    pub fn build(spec: &ChannelSpec) -> Self {
        let mut senders = HashMap::with_capacity(spec.len());
        let mut receivers = HashMap::with_capacity(spec.len());
        for &pair in spec {
            if senders.contains_key(&pair) {
                continue;
            }
            let (tx, rx) = make_channel();
            senders.insert(pair, tx);
            receivers.insert(pair, rx);
        }
        ChannelFabric { senders, receivers }
    }

    /// Takes ownership of the sender half for (from, to). Panics if the
    /// Planner did not allocate this channel, or if it was already taken
    /// -- both indicate a bug in the planning/spawn sequence, not a
    /// runtime condition callers should recover from.
    pub fn take_sender(&mut self, from: usize, to: usize) -> Sender {
        self.senders
            .remove(&(from, to))
            .unwrap_or_else(|| panic!("no channel planned from {from} to {to}"))
    }

    /// Takes ownership of the receiver half for (from, to).
    pub fn take_receiver(&mut self, from: usize, to: usize) -> Receiver {
        self.receivers
            .remove(&(from, to))
            .unwrap_or_else(|| panic!("no channel planned from {from} to {to}"))
    }
}

/// One telemetry channel per node, present iff the termination monitor is
/// enabled (spec.md §4.3).
pub fn make_telemetry_channels(n: usize) -> (Vec<Sender>, Vec<Receiver>) {
    let mut senders = Vec::with_capacity(n);
    let mut receivers = Vec::with_capacity(n);
    for _ in 0..n {
        let (tx, rx) = make_channel();
        senders.push(tx);
        receivers.push(rx);
    }
    (senders, receivers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_creates_exactly_the_requested_channels() {
        let spec: ChannelSpec = vec![(0, 1), (1, 0)];
        let mut fabric = ChannelFabric::build(&spec);
        let tx = fabric.take_sender(0, 1);
        let rx = fabric.take_receiver(0, 1);
        tx.send(Point::from_vec(vec![1.0])).unwrap();
        assert_eq!(rx.recv().unwrap(), Point::from_vec(vec![1.0]));
    }

    #[test]
    #[should_panic(expected = "no channel planned")]
    fn taking_an_unplanned_channel_panics() {
        let spec: ChannelSpec = vec![];
        let mut fabric = ChannelFabric::build(&spec);
        fabric.take_sender(0, 1);
    }
}
