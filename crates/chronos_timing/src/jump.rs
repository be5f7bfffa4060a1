//! Compressed arcs over buffer and inverter chains.
//!
//! A [`Jump`] replaces a maximal run of nodes that each have exactly one
//! fanin and one fanout through unate-definite edges. Because every edge in
//! the run maps an input transition to exactly one output transition, the
//! composed arc is unate-definite too, and its delay is a plain sum.

use crate::corner::{Split, Tran, TimingSense};
use crate::ids::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// A shortcut from the head of a chain to its tail.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Jump {
    from: NodeId,
    to: NodeId,
    sense: TimingSense,
    edges: Vec<EdgeId>,
    /// Composed delay indexed by `[split][from transition]`.
    delay: [[f64; 2]; 2],
}

impl Jump {
    pub(crate) fn new(
        from: NodeId,
        to: NodeId,
        sense: TimingSense,
        edges: Vec<EdgeId>,
        delay: [[f64; 2]; 2],
    ) -> Self {
        assert!(sense.is_unate_definite(), "jump over a non-unate chain");
        Self {
            from,
            to,
            sense,
            edges,
            delay,
        }
    }

    /// Head of the chain.
    pub fn from(&self) -> NodeId {
        self.from
    }

    /// Tail of the chain.
    pub fn to(&self) -> NodeId {
        self.to
    }

    /// Composed timing sense of the chain.
    pub fn timing_sense(&self) -> TimingSense {
        self.sense
    }

    /// The compressed edges, head first.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// The transition at `to` produced by transition `irf` at `from`.
    pub fn out_tran(&self, irf: Tran) -> Tran {
        irf.flip_if(self.sense == TimingSense::NegativeUnate)
    }

    /// The transition at `from` that produces `orf` at `to`.
    pub fn in_tran(&self, orf: Tran) -> Tran {
        self.out_tran(orf)
    }

    /// Total chain delay for input transition `irf`.
    pub fn delay(&self, el: Split, irf: Tran) -> f64 {
        self.delay[el.index()][irf.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jump(sense: TimingSense) -> Jump {
        Jump::new(
            NodeId::from_raw(0),
            NodeId::from_raw(3),
            sense,
            vec![EdgeId::from_raw(0), EdgeId::from_raw(1), EdgeId::from_raw(2)],
            [[1.0, 2.0], [3.0, 4.0]],
        )
    }

    #[test]
    fn inverting_chain_flips_transition() {
        let j = jump(TimingSense::NegativeUnate);
        assert_eq!(j.out_tran(Tran::Rise), Tran::Fall);
        assert_eq!(j.in_tran(Tran::Rise), Tran::Fall);
        assert_eq!(j.delay(Split::Late, Tran::Fall), 4.0);
        assert_eq!(j.edges().len(), 3);
    }

    #[test]
    #[should_panic(expected = "non-unate")]
    fn non_unate_chain_is_rejected() {
        jump(TimingSense::NonUnate);
    }
}
