//! Static timing analysis with common path pessimism removal.
//!
//! This crate holds the timing kernel of Chronos: a timing graph built from a
//! gate-level circuit, Elmore-delay parasitic trees, forward and backward
//! propagation of arrival and required times under four corners
//! (early/late × rise/fall), and a CPPR engine that reports the k worst
//! post-CPPR paths per endpoint.
//!
//! # Usage
//!
//! ```ignore
//! use chronos_timing::{Circuit, Timer};
//!
//! let mut circuit = Circuit::new();
//! // ... insert ports, gates, nets, cell arcs and checks ...
//! let mut timer = Timer::new(circuit, config)?;
//! for path in timer.report_worst_paths(10, None)? {
//!     println!("{} slack {:.3}", path.kind.name(), path.slack);
//! }
//! ```
//!
//! # Architecture
//!
//! - [`node`], [`edge`], [`jump`], [`graph`]: the timing graph
//! - [`rctree`]: per-net parasitic trees and Elmore delay
//! - [`timing_arc`]: NLDM cell delay and check models
//! - [`circuit`]: pins, nets, gates and tests over the graph
//! - [`constraints`]: clock and boundary constraints
//! - [`clock_tree`]: Euler-tour clock tree with LCA and CPPR credit
//! - [`cppr`]: suffix-tree search and k-worst path peeling
//! - [`endpoint`], [`heap`]: timing checks and slack ranking
//! - [`timer`]: the analysis entry point

#![warn(missing_docs)]

pub mod circuit;
pub mod clock_tree;
pub mod constraints;
pub mod corner;
pub mod cppr;
pub mod edge;
pub mod endpoint;
pub mod errors;
pub mod graph;
pub mod heap;
pub mod ids;
pub mod jump;
pub mod list;
pub mod node;
pub mod rctree;
pub mod timer;
pub mod timing_arc;

mod propagate;

pub use circuit::{Circuit, Clock, Gate, Net, Pin, PinDirection};
pub use clock_tree::ClockTree;
pub use constraints::{ClockConstraint, IoDelay, OutputLoad, TimingConstraints};
pub use corner::{Split, SplitTran, TimingSense, Tran};
pub use cppr::{CpprQuery, CpprScratch, Path, PathElement, PathKind};
pub use edge::{Edge, EdgeType};
pub use endpoint::{Endpoint, Test};
pub use graph::TimingGraph;
pub use heap::EndpointHeap;
pub use ids::{EdgeId, GateId, JumpId, NetId, NodeId, PinId, RcEdgeId, RcNodeId, TestId, TimingArcId};
pub use jump::Jump;
pub use node::{AtParent, Node, PinRole};
pub use rctree::RcTree;
pub use timer::{PinSlack, Timer, TimerError};
pub use timing_arc::{ArcKind, Lut, TimingArc};
