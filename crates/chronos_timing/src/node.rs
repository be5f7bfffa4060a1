//! Timing graph vertices.
//!
//! A [`Node`] is bound to exactly one circuit pin and carries the timing
//! state of that pin for all four corners. Relaxation is monotone: a value
//! only changes when the candidate is strictly better in the direction
//! defined by [`Split`].

use crate::corner::{Split, SplitTran, Tran};
use crate::ids::{EdgeId, JumpId, NodeId, PinId};
use crate::list::IndexList;
use serde::{Deserialize, Serialize};

/// The role a pin plays in the design, cached on its node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PinRole {
    /// A gate pin that is neither a clock pin nor primary I/O.
    Internal,
    /// A primary input port.
    PrimaryInput,
    /// A primary output port.
    PrimaryOutput,
    /// The clock pin of a sequential cell.
    ClockSink,
}

/// Back-link recording which fanin produced the current best arrival time.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct AtParent {
    /// The fanin node.
    pub node: NodeId,
    /// The edge from the fanin node.
    pub edge: EdgeId,
    /// The transition at the fanin node.
    pub tran: Tran,
}

/// A vertex of the timing graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pin: PinId,
    role: PinRole,
    at: SplitTran<f64>,
    rat: SplitTran<f64>,
    slew: SplitTran<f64>,
    is_at_clocked: SplitTran<bool>,
    at_parent: SplitTran<Option<AtParent>>,
    pub(crate) level: usize,
    pub(crate) clock_tree_idx: Option<usize>,
    pub(crate) jump_internal: bool,
    pub(crate) fanin: IndexList<EdgeId>,
    pub(crate) fanout: IndexList<EdgeId>,
    pub(crate) jumpin: IndexList<JumpId>,
    pub(crate) jumpout: IndexList<JumpId>,
}

impl Node {
    /// Creates a node for `pin` with reset timing.
    pub fn new(pin: PinId, role: PinRole) -> Self {
        let mut node = Self {
            pin,
            role,
            at: SplitTran::splat(0.0),
            rat: SplitTran::splat(0.0),
            slew: SplitTran::splat(0.0),
            is_at_clocked: SplitTran::splat(false),
            at_parent: SplitTran::splat(None),
            level: 0,
            clock_tree_idx: None,
            jump_internal: false,
            fanin: IndexList::new(),
            fanout: IndexList::new(),
            jumpin: IndexList::new(),
            jumpout: IndexList::new(),
        };
        node.reset_timing();
        node
    }

    /// The pin this node is bound to.
    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// The role of the bound pin.
    pub fn role(&self) -> PinRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: PinRole) {
        self.role = role;
    }

    /// Arrival time.
    pub fn at(&self, el: Split, rf: Tran) -> f64 {
        self.at[(el, rf)]
    }

    /// Required arrival time.
    pub fn rat(&self, el: Split, rf: Tran) -> f64 {
        self.rat[(el, rf)]
    }

    /// Slew.
    pub fn slew(&self, el: Split, rf: Tran) -> f64 {
        self.slew[(el, rf)]
    }

    /// Pre-CPPR slack at this node.
    pub fn slack(&self, el: Split, rf: Tran) -> f64 {
        el.slack(self.at(el, rf), self.rat(el, rf))
    }

    /// Late minus early arrival time for one transition.
    pub fn at_diff(&self, rf: Tran) -> f64 {
        self.at(Split::Late, rf) - self.at(Split::Early, rf)
    }

    /// Whether the arrival time was propagated from the clock source.
    pub fn is_at_clocked(&self, el: Split, rf: Tran) -> bool {
        self.is_at_clocked[(el, rf)]
    }

    /// The fanin that produced the current arrival time, if any.
    pub fn at_parent(&self, el: Split, rf: Tran) -> Option<AtParent> {
        self.at_parent[(el, rf)]
    }

    /// Topological level; sources are level 0.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Position of the node's first occurrence in the clock tree's Euler
    /// tour, or `None` when the node is outside the clock tree.
    pub fn clock_tree_idx(&self) -> Option<usize> {
        self.clock_tree_idx
    }

    /// Whether this node is the interior of a compressed jump chain.
    pub fn is_jump_internal(&self) -> bool {
        self.jump_internal
    }

    /// Number of fanin edges, constraint edges included.
    pub fn num_fanins(&self) -> usize {
        self.fanin.len()
    }

    /// Number of fanout edges, constraint edges included.
    pub fn num_fanouts(&self) -> usize {
        self.fanout.len()
    }

    /// Fanin edges in insertion order.
    pub fn fanin(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.fanin.iter().copied()
    }

    /// Fanout edges in insertion order.
    pub fn fanout(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.fanout.iter().copied()
    }

    /// Jumps ending at this node.
    pub fn jumpin(&self) -> impl Iterator<Item = JumpId> + '_ {
        self.jumpin.iter().copied()
    }

    /// Jumps starting at this node.
    pub fn jumpout(&self) -> impl Iterator<Item = JumpId> + '_ {
        self.jumpout.iter().copied()
    }

    /// A node with no fanins, a primary input, or a clock pin starts a data path.
    pub fn is_data_path_source(&self) -> bool {
        self.fanin.is_empty() || matches!(self.role, PinRole::PrimaryInput | PinRole::ClockSink)
    }

    /// Restores the initial timing state so that every relaxation is monotone.
    pub fn reset_timing(&mut self) {
        self.at = SplitTran::from_fn(|el, _| el.at_init());
        self.slew = SplitTran::from_fn(|el, _| el.at_init());
        self.rat = SplitTran::from_fn(|el, _| el.rat_init());
        self.is_at_clocked = SplitTran::splat(false);
        self.at_parent = SplitTran::splat(None);
    }

    /// Overwrites the arrival time of a source node.
    pub fn seed_at(&mut self, el: Split, rf: Tran, at: f64, clocked: bool) {
        self.at[(el, rf)] = at;
        self.is_at_clocked[(el, rf)] = clocked;
        self.at_parent[(el, rf)] = None;
    }

    /// Overwrites the slew of a source node.
    pub fn seed_slew(&mut self, el: Split, rf: Tran, slew: f64) {
        self.slew[(el, rf)] = slew;
    }

    /// Relaxes the arrival time of transition `orf` with `candidate`.
    ///
    /// Early keeps the minimum and late the maximum. The clocked flag and the
    /// parent link change only together with the value.
    pub fn relax_at(
        &mut self,
        el: Split,
        orf: Tran,
        candidate: f64,
        parent: AtParent,
        clocked: bool,
    ) -> bool {
        if !el.at_improves(candidate, self.at[(el, orf)]) {
            return false;
        }
        self.at[(el, orf)] = candidate;
        self.is_at_clocked[(el, orf)] = clocked;
        self.at_parent[(el, orf)] = Some(parent);
        true
    }

    /// Relaxes the required time of transition `rf` with `candidate`.
    ///
    /// Early keeps the maximum and late the minimum.
    pub fn relax_rat(&mut self, el: Split, rf: Tran, candidate: f64) -> bool {
        if !el.rat_improves(candidate, self.rat[(el, rf)]) {
            return false;
        }
        self.rat[(el, rf)] = candidate;
        true
    }

    /// Relaxes the slew of transition `rf` with `candidate`.
    ///
    /// Early keeps the minimum and late the maximum.
    pub fn relax_slew(&mut self, el: Split, rf: Tran, candidate: f64) -> bool {
        if !el.slew_improves(candidate, self.slew[(el, rf)]) {
            return false;
        }
        self.slew[(el, rf)] = candidate;
        true
    }
}
