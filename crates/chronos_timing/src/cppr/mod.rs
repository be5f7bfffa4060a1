//! Common path pessimism removal and k-worst path enumeration.
//!
//! Timing a launch and a capture clock path with different splits is
//! pessimistic over the segment the two paths share: the same buffers cannot
//! be both early and late at once. A [`CpprQuery`] removes that pessimism
//! per path while enumerating the worst paths into one endpoint:
//!
//! 1. Optionally restrict the search to the fanin and fanout cones of a
//!    through pin.
//! 2. For a single-path query, walk the best pre-CPPR arrival chain to get
//!    an upper bound on the worst slack, which prunes sources.
//! 3. Build a suffix tree of best continuations toward the endpoint, with a
//!    super source linked to every data-path source by its arrival time plus
//!    its pessimism credit.
//! 4. For more than one path, peel deviations from the suffix tree in order
//!    of cost.
//!
//! Queries only read the graph and clock tree. All search memory lives in a
//! [`CpprScratch`], so independent queries can run in parallel with one
//! scratch per worker.

mod arc;
mod path;
mod prefix;
mod scratch;
mod suffix;

pub use path::{Path, PathElement, PathKind};
pub use scratch::CpprScratch;

use crate::clock_tree::ClockTree;
use crate::corner::{Split, Tran};
use crate::endpoint::Test;
use crate::errors;
use crate::graph::TimingGraph;
use crate::ids::{NodeId, TestId};
use chronos_diagnostics::{DiagnosticSink, Location};

/// A post-CPPR path query at one endpoint.
#[derive(Clone, Copy)]
pub struct CpprQuery<'a> {
    pub(crate) graph: &'a TimingGraph,
    pub(crate) clock_tree: &'a ClockTree,
    pub(crate) test: TestId,
    pub(crate) kind: PathKind,
    pub(crate) el: Split,
    pub(crate) rf: Tran,
    pub(crate) endpoint: NodeId,
    pub(crate) rat: f64,
    pub(crate) capturer: Option<(NodeId, Tran)>,
    pub(crate) credit: bool,
    pub(crate) through: Option<NodeId>,
    pub(crate) cutoff: f64,
    location: Location,
    through_name: Option<&'a str>,
    capturer_name: Option<&'a str>,
}

impl<'a> CpprQuery<'a> {
    /// Creates a query for the `(el, rf)` endpoint of `test`.
    ///
    /// `endpoint` is the node of the constrained pin and `capturer` the node
    /// of the related clock pin, if any. Diagnostics are reported at
    /// `location`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        graph: &'a TimingGraph,
        clock_tree: &'a ClockTree,
        test: &Test,
        endpoint: NodeId,
        capturer: Option<NodeId>,
        el: Split,
        rf: Tran,
        location: Location,
    ) -> Self {
        let capturer = capturer.zip(test.capture_tran(el));
        Self {
            graph,
            clock_tree,
            test: test.id(),
            kind: test.path_kind(el),
            el,
            rf,
            endpoint,
            rat: test.rat(el, rf),
            capturer,
            credit: true,
            through: None,
            cutoff: f64::INFINITY,
            location,
            through_name: None,
            capturer_name: None,
        }
    }

    /// Restricts the query to paths through `node`; `name` is used in
    /// diagnostics.
    pub fn through(mut self, node: NodeId, name: &'a str) -> Self {
        self.through = Some(node);
        self.through_name = Some(name);
        self
    }

    /// Drops paths whose post-CPPR slack exceeds `cutoff`.
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Enables or disables pessimism removal.
    pub fn cppr(mut self, enabled: bool) -> Self {
        self.credit = enabled;
        self
    }

    /// Names the capture clock pin in diagnostics.
    pub fn capturer_name(mut self, name: &'a str) -> Self {
        self.capturer_name = Some(name);
        self
    }

    /// The single worst path, if any.
    pub fn report_worst_path(
        &self,
        scratch: &mut CpprScratch,
        sink: &DiagnosticSink,
    ) -> Option<Path> {
        self.report_worst_paths(scratch, 1, sink).into_iter().next()
    }

    /// Up to `k` paths in non-decreasing order of post-CPPR slack.
    ///
    /// Each path's slack is at least the pre-CPPR slack of the endpoint.
    /// Asking for zero paths is an error and returns nothing.
    pub fn report_worst_paths(
        &self,
        scratch: &mut CpprScratch,
        k: usize,
        sink: &DiagnosticSink,
    ) -> Vec<Path> {
        if k == 0 {
            sink.emit(errors::error_zero_paths(self.location));
            return Vec::new();
        }
        if !self.rat.is_finite() {
            return Vec::new();
        }
        if let (true, Some((capturer, _))) = (self.credit, self.capturer) {
            if self.clock_tree.depth(self.graph, capturer).is_none() {
                let name = self.capturer_name.unwrap_or("<clock pin>");
                sink.emit(errors::warning_unclocked_capture(name, self.location));
            }
        }

        let top = self.graph.node(self.endpoint).level();
        scratch.prepare(self.graph.node_capacity(), top + 1);
        suffix::build_cone(self, scratch);
        if self.through.is_some() && scratch.cone[self.endpoint.index()] & arc::FANOUT == 0 {
            let name = self.through_name.unwrap_or("<pin>");
            sink.emit(errors::warning_unreachable_through(name, self.location));
            return Vec::new();
        }

        let (cutoff, keep) = match (k, self.through) {
            (1, None) => match suffix::prefetch(self) {
                Some((idx, bound)) => (self.cutoff.min(bound), Some(idx)),
                None => (self.cutoff, None),
            },
            _ => (self.cutoff, None),
        };
        let worst = suffix::build(self, scratch, cutoff, keep);
        if worst == f64::INFINITY {
            if self.cutoff < f64::INFINITY {
                sink.emit(errors::note_no_path_within_cutoff(self.cutoff, self.location));
            }
            return Vec::new();
        }
        if worst > self.cutoff {
            sink.emit(errors::note_no_path_within_cutoff(self.cutoff, self.location));
            return Vec::new();
        }
        prefix::peel(self, scratch, worst, k, self.cutoff)
    }

    /// Slacks of up to `k` worst paths, worst first.
    pub fn report_worst_slack(
        &self,
        scratch: &mut CpprScratch,
        k: usize,
        sink: &DiagnosticSink,
    ) -> Vec<f64> {
        self.report_worst_paths(scratch, k, sink)
            .iter()
            .map(|p| p.slack)
            .collect()
    }

    /// Slack of the `k`-th worst path (1-based), or infinity if there are
    /// fewer than `k` paths. Zero is an error and yields infinity.
    pub fn get_slack(&self, scratch: &mut CpprScratch, k: usize, sink: &DiagnosticSink) -> f64 {
        self.report_worst_paths(scratch, k, sink)
            .get(k.wrapping_sub(1))
            .map_or(f64::INFINITY, |p| p.slack)
    }
}
