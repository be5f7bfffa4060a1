//! Reported timing paths.

use super::arc::{self, Arc, Link};
use crate::clock_tree::ClockTree;
use crate::corner::{Split, TimingSense, Tran};
use crate::graph::TimingGraph;
use crate::ids::{NodeId, TestId};
use serde::{Deserialize, Serialize};

/// The check a path is timed against.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PathKind {
    /// A required time on a primary output.
    Rat,
    /// A setup check at a sequential data pin.
    Setup,
    /// A hold check at a sequential data pin.
    Hold,
}

impl PathKind {
    /// Lowercase name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            PathKind::Rat => "rat",
            PathKind::Setup => "setup",
            PathKind::Hold => "hold",
        }
    }
}

/// One node of a path with the transition it carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PathElement {
    /// The graph node.
    pub node: NodeId,
    /// The transition at the node.
    pub tran: Tran,
}

/// A data path ending at a timing check, with its post-CPPR slack.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Path {
    /// The test the path ends at.
    pub test: TestId,
    /// The split the path is timed under.
    pub split: Split,
    /// The transition at the endpoint.
    pub tran: Tran,
    /// The check kind.
    pub kind: PathKind,
    /// Slack after pessimism removal.
    pub slack: f64,
    /// Pessimism credit included in [`slack`](Self::slack).
    pub credit: f64,
    /// The path from its origin to the endpoint. Paths launched by a clock
    /// start at the clock source.
    pub elements: Vec<PathElement>,
}

impl Path {
    /// Number of nodes on the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the path has no nodes.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns `true` if `node` lies on the path.
    pub fn contains(&self, node: NodeId) -> bool {
        self.elements.iter().any(|e| e.node == node)
    }
}

/// Appends the nodes `link` visits after leaving `from`.
pub(crate) fn expand(graph: &TimingGraph, from: usize, link: Link, out: &mut Vec<PathElement>) {
    match link.arc {
        Arc::Jump(j) => {
            let (_, mut tran) = arc::split_index(from);
            for &e in graph.jump(j).edges() {
                let edge = graph.edge(e);
                tran = tran.flip_if(edge.timing_sense() == TimingSense::NegativeUnate);
                out.push(PathElement {
                    node: edge.to(),
                    tran,
                });
            }
        }
        Arc::Edge(_) | Arc::Source => {
            let (node, tran) = arc::split_index(link.to);
            out.push(PathElement { node, tran });
        }
    }
}

/// The opening nodes of a path launched at `(source, rf)`.
///
/// A source whose arrival comes from the clock is preceded by its clock
/// path.
pub(crate) fn launch(
    graph: &TimingGraph,
    clock_tree: &ClockTree,
    el: Split,
    source: NodeId,
    rf: Tran,
) -> Vec<PathElement> {
    if graph.node(source).is_at_clocked(el, rf) {
        let clock_path = clock_tree.clock_path(graph, source, rf);
        if !clock_path.is_empty() {
            return clock_path
                .into_iter()
                .map(|(tran, node)| PathElement { node, tran })
                .collect();
        }
    }
    vec![PathElement { node: source, tran: rf }]
}
