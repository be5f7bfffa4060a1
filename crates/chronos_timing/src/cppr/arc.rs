//! The search graph seen by pessimism removal.
//!
//! The search walks edges and jumps uniformly as [`Arc`]s. Constraint edges
//! are never part of a data path. Edges that touch the interior of a jump
//! chain are hidden behind the jump, so every arc connects two nodes that
//! are visible to the search.

use crate::corner::{Split, Tran};
use crate::graph::TimingGraph;
use crate::ids::{EdgeId, JumpId, NodeId};

/// Cone bit for nodes that reach the through pin.
pub(crate) const FANIN: u8 = 1;
/// Cone bit for nodes reached from the through pin.
pub(crate) const FANOUT: u8 = 2;

/// One step of a data path.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Arc {
    /// A single graph edge.
    Edge(EdgeId),
    /// A collapsed chain of edges.
    Jump(JumpId),
    /// The artificial arc from the super source into a data-path source.
    Source,
}

/// The successor of a search index on its best path to the endpoint.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Link {
    pub(crate) to: usize,
    pub(crate) arc: Arc,
}

/// Search index of `(node, rf)`.
pub(crate) fn index(node: NodeId, rf: Tran) -> usize {
    node.index() * 2 + rf.index()
}

/// Inverse of [`index`].
pub(crate) fn split_index(idx: usize) -> (NodeId, Tran) {
    (NodeId::from_index(idx / 2), Tran::from_index(idx % 2))
}

impl Arc {
    /// Tail and head of the arc. Not defined for [`Arc::Source`].
    pub(crate) fn ends(self, graph: &TimingGraph) -> (NodeId, NodeId) {
        match self {
            Arc::Edge(e) => {
                let edge = graph.edge(e);
                (edge.from(), edge.to())
            }
            Arc::Jump(j) => {
                let jump = graph.jump(j);
                (jump.from(), jump.to())
            }
            Arc::Source => unreachable!("the source arc has no graph ends"),
        }
    }

    /// Every `(from transition, to transition)` pair the arc propagates.
    pub(crate) fn trans(self, graph: &TimingGraph) -> Vec<(Tran, Tran)> {
        match self {
            Arc::Edge(e) => graph.edge(e).arcs().collect(),
            Arc::Jump(j) => {
                let jump = graph.jump(j);
                Tran::ALL.iter().map(|&irf| (irf, jump.out_tran(irf))).collect()
            }
            Arc::Source => Vec::new(),
        }
    }

    /// Delay of the arc from `irf` to `orf` under `el`.
    pub(crate) fn delay(self, graph: &TimingGraph, el: Split, irf: Tran, orf: Tran) -> f64 {
        match self {
            Arc::Edge(e) => graph.edge(e).delay(el, irf, orf),
            Arc::Jump(j) => graph.jump(j).delay(el, irf),
            Arc::Source => 0.0,
        }
    }

    /// Returns `true` if `through` lies strictly inside a jump's chain.
    pub(crate) fn covers(self, graph: &TimingGraph, through: NodeId) -> bool {
        match self {
            Arc::Jump(j) => {
                let jump = graph.jump(j);
                jump.to() != through && jump.edges().iter().any(|&e| graph.edge(e).to() == through)
            }
            _ => false,
        }
    }
}

/// Data-path arcs entering `node`.
pub(crate) fn fanin_arcs(graph: &TimingGraph, node: NodeId) -> impl Iterator<Item = Arc> + '_ {
    let n = graph.node(node);
    let edges = n.fanin().filter(move |&e| {
        let edge = graph.edge(e);
        !edge.is_constraint() && !graph.node(edge.from()).is_jump_internal()
    });
    edges.map(Arc::Edge).chain(n.jumpin().map(Arc::Jump))
}

/// Data-path arcs leaving `node`.
pub(crate) fn fanout_arcs(graph: &TimingGraph, node: NodeId) -> impl Iterator<Item = Arc> + '_ {
    let n = graph.node(node);
    let edges = n.fanout().filter(move |&e| {
        let edge = graph.edge(e);
        !edge.is_constraint() && !graph.node(edge.to()).is_jump_internal()
    });
    edges.map(Arc::Edge).chain(n.jumpout().map(Arc::Jump))
}

/// Restricts the search to paths through one pin.
#[derive(Clone, Copy)]
pub(crate) struct Cone<'a> {
    pub(crate) through: Option<NodeId>,
    pub(crate) bits: &'a [u8],
}

impl Cone<'_> {
    /// Cone bits of `node`; every node qualifies without a through pin.
    pub(crate) fn bits(&self, node: NodeId) -> u8 {
        match self.through {
            Some(_) => self.bits[node.index()],
            None => FANIN | FANOUT,
        }
    }

    /// Returns `true` if a path may take `arc` from `u` to `v`.
    ///
    /// Both ends must lie on the same side of the through pin, unless the
    /// arc is a jump whose chain passes through it.
    pub(crate) fn allows(&self, graph: &TimingGraph, arc: Arc, u: NodeId, v: NodeId) -> bool {
        match self.through {
            None => true,
            Some(p) => self.bits(u) & self.bits(v) != 0 || arc.covers(graph, p),
        }
    }

    /// Returns `true` if a path may start at `node`.
    pub(crate) fn allows_source(&self, node: NodeId) -> bool {
        self.bits(node) & FANIN != 0
    }
}
