//! Clock tree indexing for pessimism removal.
//!
//! The clock tree is the subgraph reachable from the clock source through
//! non-constraint edges, stopping at sequential clock pins. It is indexed by
//! an Euler tour: every node is recorded when first entered and again after
//! each child returns, together with its depth and the number of negative
//! unate edges between it and the root. A sparse table over the tour depths
//! answers lowest-common-ancestor queries in O(1) after O(n log n) setup.
//!
//! The tree must be rebuilt after any structural change to the clock
//! subgraph. The circuit resets it whenever an edge leaves a node that is
//! currently indexed.

use crate::corner::{Split, Tran, TimingSense};
use crate::graph::TimingGraph;
use crate::ids::{EdgeId, NodeId};
use crate::node::PinRole;
use serde::{Deserialize, Serialize};

struct Frame {
    node: NodeId,
    depth: usize,
    negations: usize,
    children: Vec<EdgeId>,
    next: usize,
}

/// Euler-tour index of the clock subgraph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClockTree {
    root: Option<NodeId>,
    euler: Vec<NodeId>,
    depth: Vec<usize>,
    negations: Vec<usize>,
    parent_edge: Vec<Option<EdgeId>>,
    sparse: Vec<Vec<usize>>,
    is_updated: bool,
}

impl ClockTree {
    /// Creates an empty, not yet built clock tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while the tour reflects the current clock subgraph.
    pub fn is_clock_tree_updated(&self) -> bool {
        self.is_updated
    }

    /// The clock source the tree was last built from.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Length of the Euler tour.
    pub fn tour_len(&self) -> usize {
        self.euler.len()
    }

    /// The node at each tour position.
    pub fn euler(&self) -> &[NodeId] {
        &self.euler
    }

    /// Invalidates the tour and clears every node's clock-tree index.
    pub fn reset(&mut self, graph: &mut TimingGraph) {
        for &node in &self.euler {
            if graph.contains_node(node) {
                graph.node_mut(node).clock_tree_idx = None;
            }
        }
        self.euler.clear();
        self.depth.clear();
        self.negations.clear();
        self.parent_edge.clear();
        self.sparse.clear();
        self.is_updated = false;
    }

    fn children(graph: &TimingGraph, node: NodeId, is_root: bool) -> Vec<EdgeId> {
        let n = graph.node(node);
        if !is_root && n.role() == PinRole::ClockSink {
            return Vec::new();
        }
        n.fanout().filter(|&e| !graph.edge(e).is_constraint()).collect()
    }

    fn record(&mut self, node: NodeId, depth: usize, negations: usize, parent_edge: Option<EdgeId>) {
        self.euler.push(node);
        self.depth.push(depth);
        self.negations.push(negations);
        self.parent_edge.push(parent_edge);
    }

    /// Rebuilds the tour from `root`. Does nothing if the tree is current
    /// and already rooted there.
    ///
    /// # Panics
    ///
    /// Panics if a non-unate edge lies inside the clock tree, or if a node is
    /// reached twice.
    pub fn update_clock_tree(&mut self, graph: &mut TimingGraph, root: NodeId) {
        if self.is_updated && self.root == Some(root) {
            return;
        }
        self.reset(graph);
        self.root = Some(root);

        graph.node_mut(root).clock_tree_idx = Some(0);
        self.record(root, 0, 0, None);
        let mut stack = vec![Frame {
            node: root,
            depth: 0,
            negations: 0,
            children: Self::children(graph, root, true),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            if frame.next < frame.children.len() {
                let e = frame.children[frame.next];
                frame.next += 1;
                let (depth, negations) = (frame.depth + 1, frame.negations);

                let edge = graph.edge(e);
                let sense = edge.timing_sense();
                assert!(
                    sense.is_unate_definite(),
                    "non-unate edge {e} inside the clock tree"
                );
                let child = edge.to();
                assert!(
                    graph.node(child).clock_tree_idx.is_none(),
                    "clock tree node {child} is reached twice"
                );
                let negations = negations + usize::from(sense == TimingSense::NegativeUnate);

                graph.node_mut(child).clock_tree_idx = Some(self.euler.len());
                self.record(child, depth, negations, Some(e));
                stack.push(Frame {
                    node: child,
                    depth,
                    negations,
                    children: Self::children(graph, child, false),
                    next: 0,
                });
            } else {
                stack.pop();
                if let Some(parent) = stack.last() {
                    let first = graph.node(parent.node).clock_tree_idx.unwrap_or(0);
                    let parent_edge = self.parent_edge[first];
                    self.record(parent.node, parent.depth, parent.negations, parent_edge);
                }
            }
        }

        self.update_sparse_table();
        self.is_updated = true;
    }

    fn update_sparse_table(&mut self) {
        let n = self.euler.len();
        self.sparse.clear();
        self.sparse.push((0..n).collect());
        let mut k = 1;
        while (1 << k) <= n {
            let half = 1 << (k - 1);
            let prev = &self.sparse[k - 1];
            let row: Vec<usize> = (0..=n - (1 << k))
                .map(|i| {
                    let (a, b) = (prev[i], prev[i + half]);
                    if self.depth[b] < self.depth[a] {
                        b
                    } else {
                        a
                    }
                })
                .collect();
            self.sparse.push(row);
            k += 1;
        }
    }

    fn index(&self, graph: &TimingGraph, node: NodeId) -> Option<usize> {
        if !self.is_updated || !graph.contains_node(node) {
            return None;
        }
        graph.node(node).clock_tree_idx()
    }

    /// Depth of `node` below the root.
    pub fn depth(&self, graph: &TimingGraph, node: NodeId) -> Option<usize> {
        self.index(graph, node).map(|i| self.depth[i])
    }

    /// Number of negative-unate edges between the root and `node`.
    pub fn num_negations(&self, graph: &TimingGraph, node: NodeId) -> Option<usize> {
        self.index(graph, node).map(|i| self.negations[i])
    }

    /// The edge entering `node` from its clock-tree parent.
    pub fn parent_edge(&self, graph: &TimingGraph, node: NodeId) -> Option<EdgeId> {
        self.index(graph, node).and_then(|i| self.parent_edge[i])
    }

    /// Lowest common ancestor of `u` and `v`, or `None` if either is outside
    /// the tree.
    pub fn lca(&self, graph: &TimingGraph, u: NodeId, v: NodeId) -> Option<NodeId> {
        let (a, b) = (self.index(graph, u)?, self.index(graph, v)?);
        let (i, j) = (a.min(b), a.max(b));
        let k = (usize::BITS - 1 - (j - i + 1).leading_zeros()) as usize;
        let (x, y) = (self.sparse[k][i], self.sparse[k][j + 1 - (1 << k)]);
        let pos = if self.depth[y] < self.depth[x] { y } else { x };
        Some(self.euler[pos])
    }

    /// The clock path from the root to `node`, ending in transition `rf`.
    pub fn clock_path(&self, graph: &TimingGraph, node: NodeId, rf: Tran) -> Vec<(Tran, NodeId)> {
        let mut path = Vec::new();
        if self.index(graph, node).is_none() {
            return path;
        }
        let (mut cur, mut tran) = (node, rf);
        loop {
            path.push((tran, cur));
            let Some(e) = self.parent_edge(graph, cur) else {
                break;
            };
            let edge = graph.edge(e);
            tran = tran.flip_if(edge.timing_sense() == TimingSense::NegativeUnate);
            cur = edge.from();
        }
        path.reverse();
        path
    }

    /// Pessimism credit between a launching and a capturing clock pin.
    ///
    /// Zero when the pins coincide, when either is outside the tree, or when
    /// the launch and capture transitions imply different transitions at
    /// their common ancestor. Otherwise the credit is the ancestor's
    /// late-minus-early arrival spread; for late analysis the spread at the
    /// root is subtracted since the clock source latency is common to every
    /// path.
    pub fn cppr_credit(
        &self,
        graph: &TimingGraph,
        el: Split,
        launch_rf: Tran,
        capture_rf: Tran,
        launcher: NodeId,
        capturer: NodeId,
    ) -> f64 {
        if launcher == capturer {
            return 0.0;
        }
        let (Some(ln), Some(cn)) = (
            self.num_negations(graph, launcher),
            self.num_negations(graph, capturer),
        ) else {
            return 0.0;
        };
        let Some(lca) = self.lca(graph, launcher, capturer) else {
            return 0.0;
        };
        let Some(an) = self.num_negations(graph, lca) else {
            return 0.0;
        };

        let from_launch = launch_rf.after_negations(ln - an);
        let from_capture = capture_rf.after_negations(cn - an);
        if from_launch != from_capture {
            return 0.0;
        }

        let spread = graph.node(lca).at_diff(from_capture);
        match el {
            Split::Early => spread,
            Split::Late => match self.root {
                Some(root) => {
                    let root_rf = from_capture.after_negations(an);
                    spread - graph.node(root).at_diff(root_rf)
                }
                None => spread,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeType;
    use crate::ids::PinId;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    struct Fixture {
        graph: TimingGraph,
        next_pin: u32,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                graph: TimingGraph::new(),
                next_pin: 0,
            }
        }

        fn node(&mut self, role: PinRole) -> NodeId {
            self.next_pin += 1;
            self.graph.insert_node(PinId::from_raw(self.next_pin), role)
        }

        fn edge(&mut self, from: NodeId, to: NodeId, sense: TimingSense) -> EdgeId {
            self.graph.insert_edge(from, to, EdgeType::Combinational, sense)
        }

        fn spread(&mut self, node: NodeId, early: f64, late: f64) {
            for rf in Tran::ALL {
                self.graph.node_mut(node).seed_at(Split::Early, rf, early, true);
                self.graph.node_mut(node).seed_at(Split::Late, rf, late, true);
            }
        }
    }

    #[test]
    fn two_leaf_tree() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let a = f.node(PinRole::ClockSink);
        let b = f.node(PinRole::ClockSink);
        f.edge(r, a, TimingSense::PositiveUnate);
        f.edge(r, b, TimingSense::PositiveUnate);

        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        let g = &f.graph;
        assert!(tree.is_clock_tree_updated());
        assert_eq!(tree.euler(), &[r, a, r, b, r]);
        assert_eq!(tree.lca(g, a, b), Some(r));
        assert_eq!(tree.lca(g, a, a), Some(a));
        assert_eq!(tree.depth(g, a), Some(1));
        assert_eq!(tree.depth(g, b), Some(1));
        assert_eq!(tree.num_negations(g, a), Some(0));
    }

    #[test]
    fn clock_pins_are_leaves() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let ck = f.node(PinRole::ClockSink);
        let q = f.node(PinRole::Internal);
        f.edge(r, ck, TimingSense::PositiveUnate);
        f.edge(ck, q, TimingSense::NonUnate);
        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        assert_eq!(tree.tour_len(), 3);
        assert_eq!(f.graph.node(q).clock_tree_idx(), None);
    }

    #[test]
    fn negations_and_clock_path() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let inv = f.node(PinRole::Internal);
        let ck = f.node(PinRole::ClockSink);
        f.edge(r, inv, TimingSense::PositiveUnate);
        f.edge(inv, ck, TimingSense::NegativeUnate);
        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        let g = &f.graph;
        assert_eq!(tree.num_negations(g, ck), Some(1));
        assert_eq!(
            tree.clock_path(g, ck, Tran::Rise),
            vec![(Tran::Fall, r), (Tran::Fall, inv), (Tran::Rise, ck)]
        );
    }

    #[test]
    #[should_panic(expected = "non-unate")]
    fn non_unate_clock_edge_is_fatal() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let x = f.node(PinRole::Internal);
        f.edge(r, x, TimingSense::NonUnate);
        ClockTree::new().update_clock_tree(&mut f.graph, r);
    }

    #[test]
    fn credit_from_common_buffer() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let m = f.node(PinRole::Internal);
        let a = f.node(PinRole::ClockSink);
        let b = f.node(PinRole::ClockSink);
        let n = f.node(PinRole::Internal);
        let c = f.node(PinRole::ClockSink);
        f.edge(r, m, TimingSense::PositiveUnate);
        f.edge(m, a, TimingSense::PositiveUnate);
        f.edge(m, b, TimingSense::PositiveUnate);
        f.edge(r, n, TimingSense::NegativeUnate);
        f.edge(n, c, TimingSense::PositiveUnate);
        f.spread(r, 0.0, 0.0);
        f.spread(m, 1.0, 3.0);

        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        let g = &f.graph;
        for el in Split::ALL {
            assert_eq!(tree.cppr_credit(g, el, Tran::Rise, Tran::Rise, a, b), 2.0);
            assert_eq!(tree.cppr_credit(g, el, Tran::Rise, Tran::Rise, a, a), 0.0);
            // a rises with r rising, c rises with r falling
            assert_eq!(tree.cppr_credit(g, el, Tran::Rise, Tran::Rise, a, c), 0.0);
            assert_eq!(tree.cppr_credit(g, el, Tran::Fall, Tran::Rise, a, c), 0.0);
        }
    }

    #[test]
    fn late_credit_subtracts_root_spread() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let m = f.node(PinRole::Internal);
        let a = f.node(PinRole::ClockSink);
        let b = f.node(PinRole::ClockSink);
        f.edge(r, m, TimingSense::PositiveUnate);
        f.edge(m, a, TimingSense::PositiveUnate);
        f.edge(m, b, TimingSense::PositiveUnate);
        f.spread(r, 0.0, 0.5);
        f.spread(m, 1.0, 3.5);
        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        let g = &f.graph;
        assert_eq!(tree.cppr_credit(g, Split::Early, Tran::Fall, Tran::Fall, a, b), 2.5);
        assert_eq!(tree.cppr_credit(g, Split::Late, Tran::Fall, Tran::Fall, a, b), 2.0);
    }

    #[test]
    fn outside_nodes_get_no_credit() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let a = f.node(PinRole::ClockSink);
        let stray = f.node(PinRole::ClockSink);
        f.edge(r, a, TimingSense::PositiveUnate);
        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        let g = &f.graph;
        assert_eq!(tree.lca(g, a, stray), None);
        assert_eq!(tree.cppr_credit(g, Split::Late, Tran::Rise, Tran::Rise, a, stray), 0.0);
    }

    #[test]
    fn reset_clears_indices() {
        let mut f = Fixture::new();
        let r = f.node(PinRole::PrimaryInput);
        let a = f.node(PinRole::ClockSink);
        f.edge(r, a, TimingSense::PositiveUnate);
        let mut tree = ClockTree::new();
        tree.update_clock_tree(&mut f.graph, r);
        tree.reset(&mut f.graph);
        assert!(!tree.is_clock_tree_updated());
        assert_eq!(f.graph.node(a).clock_tree_idx(), None);
        assert_eq!(tree.lca(&f.graph, r, a), None);
        tree.update_clock_tree(&mut f.graph, r);
        assert_eq!(tree.lca(&f.graph, r, a), Some(r));
    }

    #[test]
    fn random_trees_match_naive_lca() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let mut f = Fixture::new();
            let n = rng.gen_range(2..60);
            let mut ids = vec![f.node(PinRole::PrimaryInput)];
            let mut parent = vec![None];
            for i in 1..n {
                let p = rng.gen_range(0..i);
                let v = f.node(PinRole::Internal);
                let sense = if rng.gen_bool(0.3) {
                    TimingSense::NegativeUnate
                } else {
                    TimingSense::PositiveUnate
                };
                f.edge(ids[p], v, sense);
                ids.push(v);
                parent.push(Some(p));
            }
            let mut tree = ClockTree::new();
            tree.update_clock_tree(&mut f.graph, ids[0]);

            let ancestors = |mut x: usize| {
                let mut out = vec![x];
                while let Some(p) = parent[x] {
                    out.push(p);
                    x = p;
                }
                out
            };
            for _ in 0..50 {
                let (u, v) = (rng.gen_range(0..n), rng.gen_range(0..n));
                let au = ancestors(u);
                let av = ancestors(v);
                let expected = au.iter().find(|x| av.contains(x)).copied().unwrap();
                assert_eq!(tree.lca(&f.graph, ids[u], ids[v]), Some(ids[expected]));
                assert_eq!(tree.depth(&f.graph, ids[u]), Some(au.len() - 1));
            }
        }
    }
}
