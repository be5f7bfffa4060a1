//! Opaque ID newtypes for timing and circuit entities.
//!
//! Every arena in the crate (graph nodes, edges, jumps, pins, nets, gates,
//! tests, RC tree nodes and cell arcs) is indexed by one of these thin `u32`
//! wrappers. They are `Copy`, `Hash`, ordered, and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`, for arena access.
            pub fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a node in the timing graph.
    NodeId
);

define_id!(
    /// Opaque, copyable ID for an edge in the timing graph.
    EdgeId
);

define_id!(
    /// Opaque, copyable ID for a jump (compressed chain) in the timing graph.
    JumpId
);

define_id!(
    /// Opaque, copyable ID for a pin in the circuit.
    PinId
);

define_id!(
    /// Opaque, copyable ID for a net in the circuit.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a gate instance in the circuit.
    GateId
);

define_id!(
    /// Opaque, copyable ID for a timing test (setup/hold check or output requirement).
    TestId
);

define_id!(
    /// Opaque, copyable ID for a cell timing arc model.
    TimingArcId
);

define_id!(
    /// Opaque, copyable ID for a node of a net's RC tree.
    RcNodeId
);

define_id!(
    /// Opaque, copyable ID for an edge of a net's RC tree.
    RcEdgeId
);
