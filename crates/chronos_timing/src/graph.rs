//! Timing graph storage, levelization and relaxation.
//!
//! The [`TimingGraph`] owns every [`Node`], [`Edge`] and [`Jump`] in arenas
//! indexed by their IDs. Removed entries leave a hole, so IDs stay stable for
//! the lifetime of the graph. Adjacency is kept on the nodes as insertion
//! ordered lists; each edge and jump remembers its position in both endpoint
//! lists so that removal is O(1).
//!
//! The propagation driver calls [`TimingGraph::relax_at`],
//! [`TimingGraph::relax_rat`] and [`TimingGraph::relax_slew`] in level order.

use crate::corner::{Split, Tran, TimingSense};
use crate::edge::{Edge, EdgeType};
use crate::ids::{EdgeId, JumpId, NodeId, PinId};
use crate::jump::Jump;
use crate::node::{AtParent, Node, PinRole};
use chronos_common::{ChronosResult, InternalError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A directed timing graph with arena-allocated nodes, edges and jumps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingGraph {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    jumps: Vec<Option<Jump>>,
    num_nodes: usize,
    num_edges: usize,
    levels: Vec<Vec<NodeId>>,
}

impl TimingGraph {
    /// Creates an empty timing graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Returns the number of live edges.
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Returns the number of jumps built by the last [`update_jumps`](Self::update_jumps).
    pub fn num_jumps(&self) -> usize {
        self.jumps.iter().flatten().count()
    }

    /// Upper bound (exclusive) on node indices ever handed out.
    pub fn node_capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Adds a node for `pin` and returns its ID.
    pub fn insert_node(&mut self, pin: PinId, role: PinRole) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Some(Node::new(pin, role)));
        self.num_nodes += 1;
        id
    }

    /// Removes a node together with every edge touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Node {
        let node = self.node(id);
        let touching: Vec<EdgeId> = node.fanin().chain(node.fanout()).collect();
        for edge in touching {
            self.remove_edge(edge);
        }
        self.clear_jumps();
        self.num_nodes -= 1;
        match self.nodes[id.index()].take() {
            Some(node) => node,
            None => panic!("node {id} was already removed"),
        }
    }

    /// Adds a directed edge and links it into both endpoint lists.
    pub fn insert_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        edge_type: EdgeType,
        sense: TimingSense,
    ) -> EdgeId {
        let id = EdgeId::from_index(self.edges.len());
        let fanout_satellite = self.node_mut(from).fanout.push_back(id);
        let fanin_satellite = self.node_mut(to).fanin.push_back(id);
        self.edges.push(Some(Edge::new(
            from,
            to,
            edge_type,
            sense,
            fanout_satellite,
            fanin_satellite,
        )));
        self.num_edges += 1;
        self.clear_jumps();
        id
    }

    /// Unlinks and removes an edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Edge {
        let edge = match self.edges[id.index()].take() {
            Some(edge) => edge,
            None => panic!("edge {id} was already removed"),
        };
        self.node_mut(edge.from()).fanout.remove(edge.fanout_satellite);
        self.node_mut(edge.to()).fanin.remove(edge.fanin_satellite);
        self.num_edges -= 1;
        self.clear_jumps();
        edge
    }

    /// Returns `true` if `id` names a live node.
    pub fn contains_node(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()), Some(Some(_)))
    }

    /// Returns the node with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the node was removed.
    pub fn node(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("node {id} does not exist"),
        }
    }

    /// Returns the node with the given ID mutably.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("node {id} does not exist"),
        }
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        match self.edges.get(id.index()) {
            Some(Some(edge)) => edge,
            _ => panic!("edge {id} does not exist"),
        }
    }

    /// Returns the edge with the given ID mutably.
    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        match self.edges.get_mut(id.index()) {
            Some(Some(edge)) => edge,
            _ => panic!("edge {id} does not exist"),
        }
    }

    /// Returns the jump with the given ID.
    pub fn jump(&self, id: JumpId) -> &Jump {
        match self.jumps.get(id.index()) {
            Some(Some(jump)) => jump,
            _ => panic!("jump {id} does not exist"),
        }
    }

    /// Iterates over live nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId::from_index(i), n)))
    }

    /// Iterates over live edges in ID order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId::from_index(i), e)))
    }

    /// Iterates over jumps in ID order.
    pub fn jumps(&self) -> impl Iterator<Item = (JumpId, &Jump)> {
        self.jumps
            .iter()
            .enumerate()
            .filter_map(|(i, j)| j.as_ref().map(|j| (JumpId::from_index(i), j)))
    }

    /// Level buckets computed by the last [`levelize`](Self::levelize).
    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    /// Number of levels computed by the last [`levelize`](Self::levelize).
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Assigns topological levels over non-constraint edges.
    ///
    /// A node's level is one more than the deepest of its fanins; nodes
    /// without non-constraint fanins are level 0. Fails if the graph has a
    /// combinational loop.
    pub fn levelize(&mut self) -> ChronosResult<()> {
        let mut indegree = vec![0usize; self.nodes.len()];
        let mut queue = VecDeque::new();
        for (id, node) in self.nodes() {
            indegree[id.index()] = node
                .fanin()
                .filter(|&e| !self.edge(e).is_constraint())
                .count();
            if indegree[id.index()] == 0 {
                queue.push_back(id);
            }
        }

        let mut level = vec![0usize; self.nodes.len()];
        let mut order = Vec::with_capacity(self.num_nodes);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for e in self.node(id).fanout() {
                let edge = self.edge(e);
                if edge.is_constraint() {
                    continue;
                }
                let to = edge.to().index();
                level[to] = level[to].max(level[id.index()] + 1);
                indegree[to] -= 1;
                if indegree[to] == 0 {
                    queue.push_back(edge.to());
                }
            }
        }

        if order.len() != self.num_nodes {
            return Err(InternalError::new(format!(
                "combinational loop: {} of {} nodes cannot be levelized",
                self.num_nodes - order.len(),
                self.num_nodes
            )));
        }

        self.levels.clear();
        for id in order {
            let l = level[id.index()];
            self.node_mut(id).level = l;
            if self.levels.len() <= l {
                self.levels.resize_with(l + 1, Vec::new);
            }
            self.levels[l].push(id);
        }
        Ok(())
    }

    /// Resets the timing state of every node.
    pub fn reset_timing(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.reset_timing();
        }
    }

    /// Relaxes the arrival time at the edge's `to` node with
    /// `at(from, irf) + delay(irf → orf)`.
    pub fn relax_at(&mut self, el: Split, irf: Tran, orf: Tran, edge: EdgeId) -> bool {
        let e = self.edge(edge);
        let (from, to) = (e.from(), e.to());
        let delay = e.delay(el, irf, orf);
        let src = self.node(from);
        let candidate = src.at(el, irf) + delay;
        let clocked = src.is_at_clocked(el, irf);
        let parent = AtParent {
            node: from,
            edge,
            tran: irf,
        };
        self.node_mut(to).relax_at(el, orf, candidate, parent, clocked)
    }

    /// Relaxes the required time at the edge's `from` node with
    /// `rat(to, orf) − delay(irf → orf)`.
    pub fn relax_rat(&mut self, el: Split, irf: Tran, orf: Tran, edge: EdgeId) -> bool {
        let e = self.edge(edge);
        let (from, to) = (e.from(), e.to());
        let candidate = self.node(to).rat(el, orf) - e.delay(el, irf, orf);
        self.node_mut(from).relax_rat(el, irf, candidate)
    }

    /// Relaxes the slew at the edge's `to` node with an already computed
    /// output slew.
    pub fn relax_slew(&mut self, el: Split, orf: Tran, edge: EdgeId, slew: f64) -> bool {
        let to = self.edge(edge).to();
        self.node_mut(to).relax_slew(el, orf, slew)
    }

    /// Drops every jump and clears the chain-interior marks.
    pub fn clear_jumps(&mut self) {
        if self.jumps.is_empty() {
            return;
        }
        self.jumps.clear();
        for node in self.nodes.iter_mut().flatten() {
            node.jumpin.clear();
            node.jumpout.clear();
            node.jump_internal = false;
        }
    }

    fn is_chain_interior(&self, id: NodeId) -> bool {
        let node = self.node(id);
        if node.role() != PinRole::Internal || node.num_fanins() != 1 || node.num_fanouts() != 1 {
            return false;
        }
        let fanin = node.fanin().all(|e| self.edge(e).is_chainable());
        fanin && node.fanout().all(|e| self.edge(e).is_chainable())
    }

    /// Rebuilds the jumps over every maximal chain of single-fanin,
    /// single-fanout nodes connected by unate-definite edges.
    ///
    /// Edge delays must be current; jump delays are sums of edge delays.
    pub fn update_jumps(&mut self) {
        self.clear_jumps();

        let interior: Vec<bool> = (0..self.nodes.len())
            .map(|i| {
                let id = NodeId::from_index(i);
                self.contains_node(id) && self.is_chain_interior(id)
            })
            .collect();

        let mut chains = Vec::new();
        for (head, node) in self.nodes() {
            if interior[head.index()] {
                continue;
            }
            for first in node.fanout() {
                let edge = self.edge(first);
                if !edge.is_chainable() || !interior[edge.to().index()] {
                    continue;
                }
                let mut edges = vec![first];
                let mut cur = edge.to();
                while interior[cur.index()] {
                    let next = self.node(cur).fanout().next();
                    let Some(next) = next else { break };
                    edges.push(next);
                    cur = self.edge(next).to();
                }
                chains.push((head, cur, edges));
            }
        }

        for (head, tail, edges) in chains {
            let mut sense = TimingSense::PositiveUnate;
            let mut delay = [[0.0; 2]; 2];
            for el in Split::ALL {
                for irf in Tran::ALL {
                    let mut rf = irf;
                    let mut sum = 0.0;
                    for &e in &edges {
                        let edge = self.edge(e);
                        let orf = rf.flip_if(edge.timing_sense() == TimingSense::NegativeUnate);
                        sum += edge.delay(el, rf, orf);
                        rf = orf;
                    }
                    delay[el.index()][irf.index()] = sum;
                }
            }
            for &e in &edges {
                sense = sense.compose(self.edge(e).timing_sense());
            }
            for &e in &edges[1..] {
                let from = self.edge(e).from();
                self.node_mut(from).jump_internal = true;
            }

            let id = JumpId::from_index(self.jumps.len());
            // jumps are cleared wholesale, never one at a time
            self.node_mut(head).jumpout.push_back(id);
            self.node_mut(tail).jumpin.push_back(id);
            self.jumps.push(Some(Jump::new(head, tail, sense, edges, delay)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(i: u32) -> PinId {
        PinId::from_raw(i)
    }

    fn chain(g: &mut TimingGraph, n: usize, sense: TimingSense) -> Vec<NodeId> {
        let ids: Vec<NodeId> = (0..n)
            .map(|i| {
                let role = if i == 0 {
                    PinRole::PrimaryInput
                } else if i == n - 1 {
                    PinRole::PrimaryOutput
                } else {
                    PinRole::Internal
                };
                g.insert_node(pin(i as u32), role)
            })
            .collect();
        for w in ids.windows(2) {
            g.insert_edge(w[0], w[1], EdgeType::Combinational, sense);
        }
        ids
    }

    #[test]
    fn empty_graph() {
        let mut g = TimingGraph::new();
        assert_eq!(g.num_nodes(), 0);
        assert_eq!(g.num_edges(), 0);
        g.levelize().unwrap();
        assert_eq!(g.num_levels(), 0);
    }

    #[test]
    fn insert_and_remove_edges() {
        let mut g = TimingGraph::new();
        let a = g.insert_node(pin(0), PinRole::PrimaryInput);
        let b = g.insert_node(pin(1), PinRole::Internal);
        let c = g.insert_node(pin(2), PinRole::Internal);
        let e0 = g.insert_edge(a, b, EdgeType::RcTree, TimingSense::PositiveUnate);
        let e1 = g.insert_edge(a, c, EdgeType::RcTree, TimingSense::PositiveUnate);
        assert_eq!(g.node(a).fanout().collect::<Vec<_>>(), vec![e0, e1]);
        assert_eq!(g.node(b).num_fanins(), 1);

        g.remove_edge(e0);
        assert_eq!(g.node(a).fanout().collect::<Vec<_>>(), vec![e1]);
        assert_eq!(g.node(b).num_fanins(), 0);
        assert_eq!(g.num_edges(), 1);
        assert_eq!(g.edges().count(), 1);
    }

    #[test]
    fn remove_node_drops_touching_edges() {
        let mut g = TimingGraph::new();
        let ids = chain(&mut g, 3, TimingSense::PositiveUnate);
        g.remove_node(ids[1]);
        assert_eq!(g.num_nodes(), 2);
        assert_eq!(g.num_edges(), 0);
        assert!(!g.contains_node(ids[1]));
        assert_eq!(g.node(ids[0]).num_fanouts(), 0);
        assert_eq!(g.node(ids[2]).num_fanins(), 0);
    }

    #[test]
    fn levelize_diamond() {
        let mut g = TimingGraph::new();
        let a = g.insert_node(pin(0), PinRole::PrimaryInput);
        let b = g.insert_node(pin(1), PinRole::Internal);
        let c = g.insert_node(pin(2), PinRole::Internal);
        let d = g.insert_node(pin(3), PinRole::PrimaryOutput);
        g.insert_edge(a, b, EdgeType::RcTree, TimingSense::PositiveUnate);
        g.insert_edge(b, c, EdgeType::Combinational, TimingSense::NegativeUnate);
        g.insert_edge(a, d, EdgeType::RcTree, TimingSense::PositiveUnate);
        g.insert_edge(c, d, EdgeType::RcTree, TimingSense::PositiveUnate);
        g.levelize().unwrap();
        assert_eq!(g.node(a).level(), 0);
        assert_eq!(g.node(c).level(), 2);
        assert_eq!(g.node(d).level(), 3);
        assert_eq!(g.levels()[3], vec![d]);
    }

    #[test]
    fn constraint_edges_do_not_count_for_levels() {
        let mut g = TimingGraph::new();
        let ck = g.insert_node(pin(0), PinRole::ClockSink);
        let d = g.insert_node(pin(1), PinRole::Internal);
        g.insert_edge(ck, d, EdgeType::Constraint, TimingSense::NonUnate);
        g.levelize().unwrap();
        assert_eq!(g.node(d).level(), 0);
    }

    #[test]
    fn combinational_loop_is_an_error() {
        let mut g = TimingGraph::new();
        let a = g.insert_node(pin(0), PinRole::Internal);
        let b = g.insert_node(pin(1), PinRole::Internal);
        g.insert_edge(a, b, EdgeType::Combinational, TimingSense::PositiveUnate);
        g.insert_edge(b, a, EdgeType::Combinational, TimingSense::PositiveUnate);
        let err = g.levelize().unwrap_err();
        assert!(err.to_string().contains("combinational loop"));
    }

    #[test]
    fn relaxation_through_edges() {
        let mut g = TimingGraph::new();
        let ids = chain(&mut g, 2, TimingSense::NegativeUnate);
        let e = g.node(ids[1]).fanin().next().unwrap();
        g.edge_mut(e).set_delay(Split::Late, Tran::Rise, Tran::Fall, 2.0);
        g.node_mut(ids[0]).seed_at(Split::Late, Tran::Rise, 1.0, true);
        assert!(g.relax_at(Split::Late, Tran::Rise, Tran::Fall, e));
        assert_eq!(g.node(ids[1]).at(Split::Late, Tran::Fall), 3.0);
        assert!(g.node(ids[1]).is_at_clocked(Split::Late, Tran::Fall));
        let parent = g.node(ids[1]).at_parent(Split::Late, Tran::Fall).unwrap();
        assert_eq!(parent.node, ids[0]);
        assert_eq!(parent.tran, Tran::Rise);

        g.node_mut(ids[1]).relax_rat(Split::Late, Tran::Fall, 10.0);
        assert!(g.relax_rat(Split::Late, Tran::Rise, Tran::Fall, e));
        assert_eq!(g.node(ids[0]).rat(Split::Late, Tran::Rise), 8.0);

        assert!(g.relax_slew(Split::Late, Tran::Fall, e, 0.3));
        assert_eq!(g.node(ids[1]).slew(Split::Late, Tran::Fall), 0.3);
    }

    #[test]
    fn jumps_compress_inverter_chains() {
        let mut g = TimingGraph::new();
        let ids = chain(&mut g, 4, TimingSense::NegativeUnate);
        let edges: Vec<EdgeId> = g.edges().map(|(id, _)| id).collect();
        for &e in &edges {
            for el in Split::ALL {
                for irf in Tran::ALL {
                    g.edge_mut(e).set_delay(el, irf, irf.flip(), 1.0);
                }
            }
        }
        g.update_jumps();
        assert_eq!(g.num_jumps(), 1);
        let (jid, jump) = g.jumps().next().unwrap();
        assert_eq!(jump.from(), ids[0]);
        assert_eq!(jump.to(), ids[3]);
        assert_eq!(jump.edges(), &edges[..]);
        assert_eq!(jump.timing_sense(), TimingSense::NegativeUnate);
        assert_eq!(jump.delay(Split::Early, Tran::Rise), 3.0);
        assert!(g.node(ids[1]).is_jump_internal());
        assert!(!g.node(ids[3]).is_jump_internal());
        assert_eq!(g.node(ids[3]).jumpin().collect::<Vec<_>>(), vec![jid]);

        g.insert_edge(ids[0], ids[3], EdgeType::Combinational, TimingSense::PositiveUnate);
        assert_eq!(g.num_jumps(), 0);
        assert!(!g.node(ids[1]).is_jump_internal());
    }

    #[test]
    fn non_unate_edge_breaks_chain() {
        let mut g = TimingGraph::new();
        chain(&mut g, 3, TimingSense::NonUnate);
        g.update_jumps();
        assert_eq!(g.num_jumps(), 0);
    }
}
