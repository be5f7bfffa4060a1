//! Per-net parasitic trees and Elmore delay.
//!
//! An [`RcTree`] models a net's interconnect as lumped capacitances on named
//! taps joined by resistive segments. Segments are stored as a pair of
//! directed edges so the tree can be walked from whichever tap is the root
//! (the driver). Derived values are computed by four traversals:
//!
//! 1. post-order: `load(v) = cap(v) + Σ load(children)`
//! 2. pre-order: `delay(v) = delay(parent) + R · load(v)`, and the
//!    resistance back to the root accumulates alongside it
//! 3. post-order: `ldelay(v) = cap(v) · delay(v) + Σ ldelay(children)`
//! 4. pre-order: `β(v) = β(parent) + R · ldelay(v)`, `impulse(v) = 2β(v) − delay(v)²`
//!
//! Results are memoised. Every mutation clears the updated flag and the next
//! query recomputes the whole tree.

use crate::corner::{split_trans, Split, SplitTran, Tran};
use crate::ids::{PinId, RcEdgeId, RcNodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tap of the parasitic tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RcNode {
    name: String,
    pin: Option<PinId>,
    cap: SplitTran<f64>,
    load: SplitTran<f64>,
    delay: SplitTran<f64>,
    ldelay: SplitTran<f64>,
    beta: SplitTran<f64>,
    impulse: SplitTran<f64>,
    upstream_res: SplitTran<f64>,
    fanout: Vec<RcEdgeId>,
}

impl RcNode {
    fn new(name: String, cap: f64) -> Self {
        Self {
            name,
            pin: None,
            cap: SplitTran::splat(cap),
            load: SplitTran::splat(0.0),
            delay: SplitTran::splat(0.0),
            ldelay: SplitTran::splat(0.0),
            beta: SplitTran::splat(0.0),
            impulse: SplitTran::splat(0.0),
            upstream_res: SplitTran::splat(0.0),
            fanout: Vec::new(),
        }
    }

    /// The tap name, e.g. `u1:A` or `n3:2`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The pin seated at this tap, if any.
    pub fn pin(&self) -> Option<PinId> {
        self.pin
    }

    /// Lumped capacitance at this tap.
    pub fn cap(&self, el: Split, rf: Tran) -> f64 {
        self.cap[(el, rf)]
    }
}

/// One direction of a resistive segment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RcEdge {
    from: RcNodeId,
    to: RcNodeId,
    res: f64,
    twin: RcEdgeId,
}

impl RcEdge {
    /// The tap this direction starts at.
    pub fn from(&self) -> RcNodeId {
        self.from
    }

    /// The tap this direction ends at.
    pub fn to(&self) -> RcNodeId {
        self.to
    }

    /// Segment resistance.
    pub fn res(&self) -> f64 {
        self.res
    }
}

/// The parasitic tree of one net.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RcTree {
    nodes: Vec<Option<RcNode>>,
    edges: Vec<Option<RcEdge>>,
    names: HashMap<String, RcNodeId>,
    pins: HashMap<PinId, RcNodeId>,
    root: Option<RcNodeId>,
    is_rc_timing_updated: bool,
}

impl RcTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` while derived values reflect the current parasitics.
    pub fn is_rc_timing_updated(&self) -> bool {
        self.is_rc_timing_updated
    }

    /// Forces recomputation on the next query.
    pub fn enable_rc_timing_update(&mut self) {
        self.is_rc_timing_updated = false;
    }

    /// Number of live taps.
    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Number of segments (each counted once).
    pub fn num_segments(&self) -> usize {
        self.edges.iter().flatten().count() / 2
    }

    /// The root tap.
    pub fn root(&self) -> Option<RcNodeId> {
        self.root
    }

    /// Returns `true` if `node` is the root tap.
    pub fn is_rctree_root(&self, node: RcNodeId) -> bool {
        self.root == Some(node)
    }

    /// Marks `node` as the root tap.
    pub fn set_root(&mut self, node: RcNodeId) {
        self.root = Some(node);
        self.enable_rc_timing_update();
    }

    /// Looks up a tap by name.
    pub fn find_node(&self, name: &str) -> Option<RcNodeId> {
        self.names.get(name).copied()
    }

    /// Looks up the tap a pin is seated at.
    pub fn node_of_pin(&self, pin: PinId) -> Option<RcNodeId> {
        self.pins.get(&pin).copied()
    }

    /// Returns a tap.
    pub fn node(&self, id: RcNodeId) -> &RcNode {
        match self.nodes.get(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("rc node {id} does not exist"),
        }
    }

    fn node_mut(&mut self, id: RcNodeId) -> &mut RcNode {
        match self.nodes.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => panic!("rc node {id} does not exist"),
        }
    }

    /// Returns one direction of a segment.
    pub fn edge(&self, id: RcEdgeId) -> &RcEdge {
        match self.edges.get(id.index()) {
            Some(Some(edge)) => edge,
            _ => panic!("rc edge {id} does not exist"),
        }
    }

    /// Inserts a tap with zero capacitance, or returns the existing one.
    pub fn insert_node(&mut self, name: &str) -> RcNodeId {
        match self.find_node(name) {
            Some(id) => id,
            None => self.insert_node_with_cap(name, 0.0),
        }
    }

    /// Inserts a tap with capacitance `cap`. An existing tap keeps its
    /// identity and has its capacitance overwritten.
    pub fn insert_node_with_cap(&mut self, name: &str, cap: f64) -> RcNodeId {
        self.enable_rc_timing_update();
        if let Some(id) = self.find_node(name) {
            self.node_mut(id).cap = SplitTran::splat(cap);
            return id;
        }
        let id = RcNodeId::from_index(self.nodes.len());
        self.nodes.push(Some(RcNode::new(name.to_string(), cap)));
        self.names.insert(name.to_string(), id);
        id
    }

    /// Seats `pin` at `node`.
    pub fn seat_pin(&mut self, node: RcNodeId, pin: PinId) {
        if let Some(old) = self.node_mut(node).pin.replace(pin) {
            self.pins.remove(&old);
        }
        self.pins.insert(pin, node);
    }

    /// Removes `pin` from its tap and returns the tap it was seated at.
    pub fn unseat_pin(&mut self, pin: PinId) -> Option<RcNodeId> {
        let node = self.pins.remove(&pin)?;
        self.enable_rc_timing_update();
        self.node_mut(node).pin = None;
        Some(node)
    }

    /// Inserts a segment of resistance `res` between two taps.
    ///
    /// Returns the `a → b` direction; the `b → a` twin is created alongside.
    pub fn insert_edge(&mut self, a: RcNodeId, b: RcNodeId, res: f64) -> RcEdgeId {
        self.enable_rc_timing_update();
        let ab = RcEdgeId::from_index(self.edges.len());
        let ba = RcEdgeId::from_index(self.edges.len() + 1);
        self.edges.push(Some(RcEdge {
            from: a,
            to: b,
            res,
            twin: ba,
        }));
        self.edges.push(Some(RcEdge {
            from: b,
            to: a,
            res,
            twin: ab,
        }));
        self.node_mut(a).fanout.push(ab);
        self.node_mut(b).fanout.push(ba);
        ab
    }

    /// Inserts a segment between two named taps, creating them as needed.
    pub fn insert_segment(&mut self, a: &str, b: &str, res: f64) -> RcEdgeId {
        let a = self.insert_node(a);
        let b = self.insert_node(b);
        self.insert_edge(a, b, res)
    }

    /// Removes a segment (both directions).
    pub fn remove_edge(&mut self, id: RcEdgeId) {
        self.enable_rc_timing_update();
        let Some(edge) = self.edges[id.index()].take() else {
            return;
        };
        self.edges[edge.twin.index()] = None;
        self.node_mut(edge.from).fanout.retain(|&e| e != id);
        self.node_mut(edge.to).fanout.retain(|&e| e != edge.twin);
    }

    /// Removes a tap and every segment touching it.
    pub fn remove_node(&mut self, id: RcNodeId) {
        let touching = self.node(id).fanout.clone();
        for e in touching {
            self.remove_edge(e);
        }
        if let Some(node) = self.nodes[id.index()].take() {
            self.names.remove(&node.name);
            if let Some(pin) = node.pin {
                self.pins.remove(&pin);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        self.enable_rc_timing_update();
    }

    /// Sets the capacitance of a tap for all corners.
    pub fn set_cap(&mut self, node: RcNodeId, cap: f64) {
        self.enable_rc_timing_update();
        self.node_mut(node).cap = SplitTran::splat(cap);
    }

    /// Sets the capacitance of a tap for one corner.
    pub fn set_cap_for(&mut self, node: RcNodeId, el: Split, rf: Tran, cap: f64) {
        self.enable_rc_timing_update();
        self.node_mut(node).cap[(el, rf)] = cap;
    }

    /// Adds `cap` to a tap for one corner, used for pin loads.
    pub fn add_cap(&mut self, node: RcNodeId, el: Split, rf: Tran, cap: f64) {
        self.enable_rc_timing_update();
        self.node_mut(node).cap[(el, rf)] += cap;
    }

    /// Sum of all tap capacitances.
    pub fn total_cap(&self, el: Split, rf: Tran) -> f64 {
        self.nodes.iter().flatten().map(|n| n.cap[(el, rf)]).sum()
    }

    /// Pre-order traversal from the root as `(node, edge from parent)` pairs.
    fn preorder(&self, root: RcNodeId) -> Vec<(RcNodeId, Option<RcEdgeId>)> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(root, None)];
        while let Some((id, parent_edge)) = stack.pop() {
            assert!(!visited[id.index()], "parasitic network of {} has a loop", self.node(id).name);
            visited[id.index()] = true;
            order.push((id, parent_edge));
            let back = parent_edge.map(|e: RcEdgeId| self.edge(e).twin);
            for &e in self.node(id).fanout.iter().rev() {
                if Some(e) != back {
                    stack.push((self.edge(e).to, Some(e)));
                }
            }
        }
        order
    }

    /// Recomputes every derived value if the tree changed.
    pub fn update_rc_timing(&mut self) {
        if self.is_rc_timing_updated {
            return;
        }
        for node in self.nodes.iter_mut().flatten() {
            node.load = SplitTran::splat(0.0);
            node.delay = SplitTran::splat(0.0);
            node.ldelay = SplitTran::splat(0.0);
            node.beta = SplitTran::splat(0.0);
            node.impulse = SplitTran::splat(0.0);
            node.upstream_res = SplitTran::splat(0.0);
        }
        if let Some(root) = self.root {
            let order = self.preorder(root);
            for (el, rf) in split_trans() {
                self.update_load(&order, el, rf);
                self.update_delay(&order, el, rf);
                self.update_ldelay(&order, el, rf);
                self.update_response(&order, el, rf);
            }
        }
        self.is_rc_timing_updated = true;
    }

    fn update_load(&mut self, order: &[(RcNodeId, Option<RcEdgeId>)], el: Split, rf: Tran) {
        for &(id, _) in order {
            let node = self.node_mut(id);
            node.load[(el, rf)] = node.cap[(el, rf)];
        }
        for &(id, parent_edge) in order.iter().rev() {
            if let Some(e) = parent_edge {
                let parent = self.edge(e).from;
                let load = self.node(id).load[(el, rf)];
                self.node_mut(parent).load[(el, rf)] += load;
            }
        }
    }

    fn update_delay(&mut self, order: &[(RcNodeId, Option<RcEdgeId>)], el: Split, rf: Tran) {
        for &(id, parent_edge) in order {
            let Some(e) = parent_edge else { continue };
            let RcEdge { from, res, .. } = *self.edge(e);
            let (pdelay, pres) = {
                let p = self.node(from);
                (p.delay[(el, rf)], p.upstream_res[(el, rf)])
            };
            let node = self.node_mut(id);
            node.delay[(el, rf)] = pdelay + res * node.load[(el, rf)];
            node.upstream_res[(el, rf)] = pres + res;
        }
    }

    fn update_ldelay(&mut self, order: &[(RcNodeId, Option<RcEdgeId>)], el: Split, rf: Tran) {
        for &(id, _) in order {
            let node = self.node_mut(id);
            node.ldelay[(el, rf)] = node.cap[(el, rf)] * node.delay[(el, rf)];
        }
        for &(id, parent_edge) in order.iter().rev() {
            if let Some(e) = parent_edge {
                let parent = self.edge(e).from;
                let ldelay = self.node(id).ldelay[(el, rf)];
                self.node_mut(parent).ldelay[(el, rf)] += ldelay;
            }
        }
    }

    fn update_response(&mut self, order: &[(RcNodeId, Option<RcEdgeId>)], el: Split, rf: Tran) {
        for &(id, parent_edge) in order {
            let beta = match parent_edge {
                Some(e) => {
                    let RcEdge { from, res, .. } = *self.edge(e);
                    self.node(from).beta[(el, rf)] + res * self.node(id).ldelay[(el, rf)]
                }
                None => 0.0,
            };
            let node = self.node_mut(id);
            node.beta[(el, rf)] = beta;
            let delay = node.delay[(el, rf)];
            node.impulse[(el, rf)] = 2.0 * beta - delay * delay;
        }
    }

    /// Downstream capacitance seen at `node`.
    pub fn load(&mut self, node: RcNodeId, el: Split, rf: Tran) -> f64 {
        self.update_rc_timing();
        self.node(node).load[(el, rf)]
    }

    /// Elmore delay from the root to `node`.
    pub fn delay(&mut self, node: RcNodeId, el: Split, rf: Tran) -> f64 {
        self.update_rc_timing();
        self.node(node).delay[(el, rf)]
    }

    /// `Σ cap · delay` over the subtree at `node`.
    pub fn ldelay(&mut self, node: RcNodeId, el: Split, rf: Tran) -> f64 {
        self.update_rc_timing();
        self.node(node).ldelay[(el, rf)]
    }

    /// Second moment of the impulse response at `node`.
    pub fn beta(&mut self, node: RcNodeId, el: Split, rf: Tran) -> f64 {
        self.update_rc_timing();
        self.node(node).beta[(el, rf)]
    }

    /// `2β − delay²` at `node`.
    pub fn impulse(&mut self, node: RcNodeId, el: Split, rf: Tran) -> f64 {
        self.update_rc_timing();
        self.node(node).impulse[(el, rf)]
    }

    /// Total resistance from the root to `node`.
    pub fn upstream_res(&mut self, node: RcNodeId, el: Split, rf: Tran) -> f64 {
        self.update_rc_timing();
        self.node(node).upstream_res[(el, rf)]
    }

    /// Output slew at `node` for input slew `si`.
    ///
    /// `sign(si) · sqrt(si² + impulse)`, where a zero input slew counts as
    /// positive.
    pub fn slew(&mut self, node: RcNodeId, el: Split, rf: Tran, si: f64) -> f64 {
        let impulse = self.impulse(node, el, rf);
        let sign = if si < 0.0 { -1.0 } else { 1.0 };
        sign * (si * si + impulse).sqrt()
    }

    /// First-order estimate of the delay at `node` if its capacitance
    /// became `new_cap`, without re-running the traversals.
    pub fn estimate_delay(&mut self, node: RcNodeId, el: Split, rf: Tran, new_cap: f64) -> f64 {
        self.update_rc_timing();
        let n = self.node(node);
        n.delay[(el, rf)] + n.upstream_res[(el, rf)] * (new_cap - n.cap[(el, rf)])
    }
}
