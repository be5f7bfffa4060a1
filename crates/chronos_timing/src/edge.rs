//! Timing graph arcs.

use crate::corner::{Split, Tran, TimingSense};
use crate::ids::{NetId, NodeId, TimingArcId};
use crate::list::ListHandle;
use serde::{Deserialize, Serialize};

/// What an edge models.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EdgeType {
    /// Interconnect from a net's driver tap to one of its sinks.
    RcTree,
    /// A cell arc from an input pin to an output pin.
    Combinational,
    /// A sequential check from a clock pin to a constrained data pin.
    ///
    /// Constraint edges never carry arrival times.
    Constraint,
}

/// A directed arc between two timing nodes.
///
/// The edge is referenced from the fanout list of `from` and the fanin list
/// of `to`. The two satellite handles locate it in those lists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    from: NodeId,
    to: NodeId,
    edge_type: EdgeType,
    sense: TimingSense,
    trigger: Option<Tran>,
    net: Option<NetId>,
    timing_arcs: [Option<TimingArcId>; 2],
    /// Delay indexed by `[split][from transition][to transition]`.
    delay: [[[f64; 2]; 2]; 2],
    pub(crate) fanout_satellite: ListHandle,
    pub(crate) fanin_satellite: ListHandle,
}

impl Edge {
    pub(crate) fn new(
        from: NodeId,
        to: NodeId,
        edge_type: EdgeType,
        sense: TimingSense,
        fanout_satellite: ListHandle,
        fanin_satellite: ListHandle,
    ) -> Self {
        Self {
            from,
            to,
            edge_type,
            sense,
            trigger: None,
            net: None,
            timing_arcs: [None; 2],
            delay: [[[0.0; 2]; 2]; 2],
            fanout_satellite,
            fanin_satellite,
        }
    }

    /// The driving node.
    pub fn from(&self) -> NodeId {
        self.from
    }

    /// The driven node.
    pub fn to(&self) -> NodeId {
        self.to
    }

    /// The edge type.
    pub fn edge_type(&self) -> EdgeType {
        self.edge_type
    }

    /// Returns `true` for sequential constraint edges.
    pub fn is_constraint(&self) -> bool {
        self.edge_type == EdgeType::Constraint
    }

    /// The timing sense of the arc.
    pub fn timing_sense(&self) -> TimingSense {
        self.sense
    }

    /// The input transition an edge-triggered arc responds to, if any.
    pub fn trigger(&self) -> Option<Tran> {
        self.trigger
    }

    pub(crate) fn set_trigger(&mut self, trigger: Option<Tran>) {
        self.trigger = trigger;
    }

    /// The net an interconnect edge belongs to.
    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    pub(crate) fn set_net(&mut self, net: Option<NetId>) {
        self.net = net;
    }

    /// The cell arc model used for `el`, if any.
    pub fn timing_arc(&self, el: Split) -> Option<TimingArcId> {
        self.timing_arcs[el.index()]
    }

    pub(crate) fn set_timing_arc(&mut self, el: Split, arc: Option<TimingArcId>) {
        self.timing_arcs[el.index()] = arc;
    }

    /// Returns `true` if a transition `irf` at `from` can cause `orf` at `to`.
    pub fn has_arc(&self, irf: Tran, orf: Tran) -> bool {
        self.trigger.map_or(true, |t| t == irf) && self.sense.has_arc(irf, orf)
    }

    /// Iterates over the `(irf, orf)` pairs this edge propagates.
    pub fn arcs(&self) -> impl Iterator<Item = (Tran, Tran)> + '_ {
        Tran::ALL
            .into_iter()
            .flat_map(|irf| Tran::ALL.into_iter().map(move |orf| (irf, orf)))
            .filter(|&(irf, orf)| self.has_arc(irf, orf))
    }

    /// Returns `true` if the edge maps each input transition to exactly one
    /// output transition and can appear in a jump chain.
    pub fn is_chainable(&self) -> bool {
        !self.is_constraint() && self.trigger.is_none() && self.sense.is_unate_definite()
    }

    /// Delay for `el` from transition `irf` at `from` to `orf` at `to`.
    pub fn delay(&self, el: Split, irf: Tran, orf: Tran) -> f64 {
        self.delay[el.index()][irf.index()][orf.index()]
    }

    /// Sets one of the eight delays.
    pub fn set_delay(&mut self, el: Split, irf: Tran, orf: Tran, delay: f64) {
        self.delay[el.index()][irf.index()][orf.index()] = delay;
    }

    pub(crate) fn clear_delays(&mut self) {
        self.delay = [[[0.0; 2]; 2]; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(sense: TimingSense) -> Edge {
        let mut list = crate::list::IndexList::new();
        let h = list.push_back(0u32);
        Edge::new(
            NodeId::from_raw(0),
            NodeId::from_raw(1),
            EdgeType::Combinational,
            sense,
            h,
            h,
        )
    }

    #[test]
    fn delays_are_indexed_per_corner() {
        let mut e = edge(TimingSense::NonUnate);
        e.set_delay(Split::Late, Tran::Rise, Tran::Fall, 3.5);
        assert_eq!(e.delay(Split::Late, Tran::Rise, Tran::Fall), 3.5);
        assert_eq!(e.delay(Split::Early, Tran::Rise, Tran::Fall), 0.0);
        e.clear_delays();
        assert_eq!(e.delay(Split::Late, Tran::Rise, Tran::Fall), 0.0);
    }

    #[test]
    fn trigger_restricts_input_transition() {
        let mut e = edge(TimingSense::NonUnate);
        assert_eq!(e.arcs().count(), 4);
        e.set_trigger(Some(Tran::Rise));
        let arcs: Vec<_> = e.arcs().collect();
        assert_eq!(arcs, vec![(Tran::Rise, Tran::Rise), (Tran::Rise, Tran::Fall)]);
        assert!(!e.is_chainable());
    }

    #[test]
    fn chainable_edges_are_unate() {
        assert!(edge(TimingSense::NegativeUnate).is_chainable());
        assert!(!edge(TimingSense::NonUnate).is_chainable());
        assert_eq!(edge(TimingSense::Undefined).arcs().count(), 0);
    }

    #[test]
    fn timing_arc_slots() {
        let mut e = edge(TimingSense::PositiveUnate);
        e.set_timing_arc(Split::Early, Some(TimingArcId::from_raw(4)));
        assert_eq!(e.timing_arc(Split::Early), Some(TimingArcId::from_raw(4)));
        assert_eq!(e.timing_arc(Split::Late), None);
    }
}
