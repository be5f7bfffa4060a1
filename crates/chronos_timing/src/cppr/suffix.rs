//! Suffix-tree construction.
//!
//! Starting at the endpoint, the search relaxes backward over data-path arcs
//! in descending level order. Because every arc climbs at least one level,
//! each node is final when its bucket is drained, so a single sweep builds
//! the shortest-path tree of slack contributions toward the endpoint.
//!
//! Distances are signed so that smaller is always worse: the endpoint starts
//! at `-sign * rat`, an arc adds `sign * delay`, and a data-path source joins
//! the super source with weight `sign * at + credit`. The super source's
//! distance is then the worst post-CPPR slack.

use super::arc::{self, fanin_arcs, Arc, Cone, Link, FANIN, FANOUT};
use super::scratch::CpprScratch;
use super::CpprQuery;
use crate::corner::Tran;
use crate::ids::NodeId;

/// Index of the super source for the query's graph.
pub(crate) fn super_index(q: &CpprQuery<'_>) -> usize {
    q.graph.node_capacity() * 2
}

/// Pessimism credit for a path launched at `(node, rf)`.
pub(crate) fn credit(q: &CpprQuery<'_>, node: NodeId, rf: Tran) -> f64 {
    match q.capturer {
        Some((capturer, capture_rf)) if q.credit => {
            q.clock_tree
                .cppr_credit(q.graph, q.el, rf, capture_rf, node, capturer)
        }
        _ => 0.0,
    }
}

/// Weight of the arc from the super source into `(node, rf)`.
pub(crate) fn offset(q: &CpprQuery<'_>, node: NodeId, rf: Tran) -> f64 {
    q.el.sign() * q.graph.node(node).at(q.el, rf) + credit(q, node, rf)
}

/// Marks the fanin and fanout cones of the through pin.
pub(crate) fn build_cone(q: &CpprQuery<'_>, scratch: &mut CpprScratch) {
    let Some(through) = q.through else {
        return;
    };
    let graph = q.graph;

    scratch.mark_cone(through, FANOUT);
    let mut stack = vec![through];
    while let Some(v) = stack.pop() {
        for e in graph.node(v).fanout() {
            let edge = graph.edge(e);
            if !edge.is_constraint() && scratch.mark_cone(edge.to(), FANOUT) {
                stack.push(edge.to());
            }
        }
    }

    scratch.mark_cone(through, FANIN);
    stack.push(through);
    while let Some(v) = stack.pop() {
        for e in graph.node(v).fanin() {
            let edge = graph.edge(e);
            if !edge.is_constraint() && scratch.mark_cone(edge.from(), FANIN) {
                stack.push(edge.from());
            }
        }
    }
}

/// Follows the best pre-CPPR arrival chain back from the endpoint.
///
/// Returns the source index and the post-CPPR slack of that one path, an
/// upper bound on the worst slack of the endpoint.
pub(crate) fn prefetch(q: &CpprQuery<'_>) -> Option<(usize, f64)> {
    let graph = q.graph;
    let sign = q.el.sign();
    let (mut node, mut rf) = (q.endpoint, q.rf);
    let mut dist = -sign * q.rat;
    loop {
        let n = graph.node(node);
        if node != q.endpoint && n.is_data_path_source() {
            let total = dist + offset(q, node, rf);
            return total.is_finite().then_some((arc::index(node, rf), total));
        }
        let parent = n.at_parent(q.el, rf)?;
        dist += sign * graph.edge(parent.edge).delay(q.el, parent.tran, rf);
        node = parent.node;
        rf = parent.tran;
    }
}

/// Builds the suffix tree and returns the worst post-CPPR slack.
///
/// Sources whose slack exceeds `cutoff` are not linked to the super source,
/// except the one named by `keep`. Every linked source is recorded in
/// `scratch.sources` in discovery order.
pub(crate) fn build(
    q: &CpprQuery<'_>,
    scratch: &mut CpprScratch,
    cutoff: f64,
    keep: Option<usize>,
) -> f64 {
    let graph = q.graph;
    let sup = super_index(q);
    let target = arc::index(q.endpoint, q.rf);
    if !q.rat.is_finite() {
        return f64::INFINITY;
    }

    let bits = std::mem::take(&mut scratch.cone);
    let cone = Cone {
        through: q.through,
        bits: &bits,
    };

    let top = graph.node(q.endpoint).level();
    scratch.set(target, -q.el.sign() * q.rat, None);
    scratch.enqueue(q.endpoint, top);
    for level in (0..=top).rev() {
        let mut bucket = std::mem::take(&mut scratch.buckets[level]);
        for &v in &bucket {
            if v != q.endpoint && graph.node(v).is_data_path_source() {
                link_source(q, scratch, cone, v, sup, cutoff, keep);
            } else {
                relax_fanin(q, scratch, cone, v);
            }
        }
        bucket.clear();
        scratch.buckets[level] = bucket;
    }

    scratch.cone = bits;
    scratch.dist[sup]
}

fn link_source(
    q: &CpprQuery<'_>,
    scratch: &mut CpprScratch,
    cone: Cone<'_>,
    v: NodeId,
    sup: usize,
    cutoff: f64,
    keep: Option<usize>,
) {
    if !cone.allows_source(v) {
        return;
    }
    for rf in Tran::ALL {
        let idx = arc::index(v, rf);
        let dist = scratch.dist[idx];
        if dist == f64::INFINITY {
            continue;
        }
        let total = dist + offset(q, v, rf);
        if !total.is_finite() || (total > cutoff && keep != Some(idx)) {
            continue;
        }
        scratch.sources.push((idx, total));
        if total < scratch.dist[sup] {
            let link = Link {
                to: idx,
                arc: Arc::Source,
            };
            scratch.set(sup, total, Some(link));
        }
    }
}

fn relax_fanin(q: &CpprQuery<'_>, scratch: &mut CpprScratch, cone: Cone<'_>, v: NodeId) {
    let graph = q.graph;
    let sign = q.el.sign();
    for arc in fanin_arcs(graph, v) {
        let (u, _) = arc.ends(graph);
        if !cone.allows(graph, arc, u, v) {
            continue;
        }
        for (irf, orf) in arc.trans(graph) {
            let to = arc::index(v, orf);
            let dist = scratch.dist[to];
            if dist == f64::INFINITY {
                continue;
            }
            let candidate = dist + sign * arc.delay(graph, q.el, irf, orf);
            let from = arc::index(u, irf);
            if candidate < scratch.dist[from] {
                scratch.set(from, candidate, Some(Link { to, arc }));
                scratch.enqueue(u, graph.node(u).level());
            }
        }
    }
}
