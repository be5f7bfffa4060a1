//! Reusable per-worker search memory.
//!
//! A [`CpprScratch`] holds every array the search writes to. It grows to the
//! largest graph it has served and is reset by undoing only the entries the
//! previous query touched, so a worker that runs many queries allocates
//! once. One scratch must serve one query at a time; parallel callers give
//! each worker its own through `rayon`'s `map_init`.

use super::arc::Link;
use crate::ids::NodeId;

/// Search arrays indexed by `node * 2 + transition`, plus one super index.
#[derive(Debug, Default)]
pub struct CpprScratch {
    pub(crate) dist: Vec<f64>,
    pub(crate) succ: Vec<Option<Link>>,
    pub(crate) in_list: Vec<bool>,
    pub(crate) cone: Vec<u8>,
    pub(crate) buckets: Vec<Vec<NodeId>>,
    pub(crate) sources: Vec<(usize, f64)>,
    touched: Vec<usize>,
    touched_nodes: Vec<usize>,
    cone_touched: Vec<usize>,
}

impl CpprScratch {
    /// Creates an empty scratch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of search indices the scratch can currently hold.
    pub fn capacity(&self) -> usize {
        self.dist.len()
    }

    /// Grows the arrays for a graph with `node_capacity` node slots and
    /// `num_levels` levels, then clears whatever the last query left behind.
    pub(crate) fn prepare(&mut self, node_capacity: usize, num_levels: usize) {
        self.reset();
        let size = node_capacity * 2 + 1;
        if self.dist.len() < size {
            self.dist.resize(size, f64::INFINITY);
            self.succ.resize(size, None);
        }
        if self.in_list.len() < node_capacity {
            self.in_list.resize(node_capacity, false);
            self.cone.resize(node_capacity, 0);
        }
        if self.buckets.len() < num_levels {
            self.buckets.resize_with(num_levels, Vec::new);
        }
    }

    fn reset(&mut self) {
        for idx in self.touched.drain(..) {
            self.dist[idx] = f64::INFINITY;
            self.succ[idx] = None;
        }
        for n in self.touched_nodes.drain(..) {
            self.in_list[n] = false;
        }
        for n in self.cone_touched.drain(..) {
            self.cone[n] = 0;
        }
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.sources.clear();
    }

    /// Sets the distance and successor of `idx`.
    pub(crate) fn set(&mut self, idx: usize, dist: f64, succ: Option<Link>) {
        if self.dist[idx] == f64::INFINITY && self.succ[idx].is_none() {
            self.touched.push(idx);
        }
        self.dist[idx] = dist;
        self.succ[idx] = succ;
    }

    /// Queues `node` in its level bucket unless it is already queued.
    pub(crate) fn enqueue(&mut self, node: NodeId, level: usize) {
        let n = node.index();
        if !self.in_list[n] {
            self.in_list[n] = true;
            self.touched_nodes.push(n);
            self.buckets[level].push(node);
        }
    }

    /// Adds cone bits to `node`; returns `true` if any bit was new.
    pub(crate) fn mark_cone(&mut self, node: NodeId, bits: u8) -> bool {
        let n = node.index();
        let old = self.cone[n];
        if old & bits == bits {
            return false;
        }
        if old == 0 {
            self.cone_touched.push(n);
        }
        self.cone[n] = old | bits;
        true
    }
}
