//! Prefix-tree peeling of the k worst paths.
//!
//! A path is identified by the deviations it takes from the suffix tree. A
//! [`Prefix`] records one deviation and points at the prefix it deviates
//! from; roots deviate from the super source into a data-path source. The
//! cost of a prefix is how much worse than the worst path its path is.
//! Prefixes are popped cheapest first, and each popped prefix spawns one
//! child per non-tree arc leaving its suffix, so every path is produced
//! exactly once and in order of slack.

use super::arc::{self, fanout_arcs, Arc, Cone, Link};
use super::path::{self, Path, PathElement};
use super::scratch::CpprScratch;
use super::suffix;
use super::CpprQuery;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// One deviation from the suffix tree.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Prefix {
    pub(crate) from: usize,
    pub(crate) to: usize,
    pub(crate) arc: Arc,
    pub(crate) parent: Option<usize>,
    pub(crate) cost: f64,
    pub(crate) credit: f64,
}

/// Total order over costs for the heap.
#[derive(Clone, Copy, PartialEq, Debug)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Arena of prefixes with a min-heap over the ones not yet expanded.
///
/// Ties pop in insertion order.
#[derive(Default)]
pub(crate) struct PrefixTree {
    prefixes: Vec<Prefix>,
    heap: BinaryHeap<Reverse<(Cost, usize)>>,
}

impl PrefixTree {
    pub(crate) fn push(&mut self, prefix: Prefix) {
        let id = self.prefixes.len();
        self.heap.push(Reverse((Cost(prefix.cost), id)));
        self.prefixes.push(prefix);
    }

    pub(crate) fn pop(&mut self) -> Option<usize> {
        self.heap.pop().map(|Reverse((_, id))| id)
    }

    pub(crate) fn get(&self, id: usize) -> &Prefix {
        &self.prefixes[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.prefixes.len()
    }

    /// The deviations of `id`, root first.
    fn chain(&self, id: usize) -> Vec<Prefix> {
        let mut chain = Vec::new();
        let mut cur = Some(id);
        while let Some(i) = cur {
            chain.push(self.prefixes[i]);
            cur = self.prefixes[i].parent;
        }
        chain.reverse();
        chain
    }
}

/// Produces up to `k` paths, worst first, none with slack above `cutoff`.
pub(crate) fn peel(
    q: &CpprQuery<'_>,
    scratch: &CpprScratch,
    worst: f64,
    k: usize,
    cutoff: f64,
) -> Vec<Path> {
    let mut tree = PrefixTree::default();
    let Some(best) = scratch.succ[suffix::super_index(q)] else {
        return Vec::new();
    };
    let root = |to: usize, total: f64| {
        let (node, rf) = arc::split_index(to);
        Prefix {
            from: suffix::super_index(q),
            to,
            arc: Arc::Source,
            parent: None,
            cost: (total - worst).max(0.0),
            credit: suffix::credit(q, node, rf),
        }
    };
    tree.push(root(best.to, worst));
    if k > 1 {
        for &(idx, total) in &scratch.sources {
            if idx != best.to && total <= cutoff {
                tree.push(root(idx, total));
            }
        }
    }

    let mut paths = Vec::with_capacity(k.min(64));
    while paths.len() < k {
        let Some(id) = tree.pop() else {
            break;
        };
        paths.push(recover_path(q, scratch, &tree, id, worst));
        if paths.len() < k {
            spur(q, scratch, &mut tree, id, worst, cutoff);
        }
    }
    paths
}

/// Pushes one child prefix for every non-tree arc along the suffix of `id`.
fn spur(
    q: &CpprQuery<'_>,
    scratch: &CpprScratch,
    tree: &mut PrefixTree,
    id: usize,
    worst: f64,
    cutoff: f64,
) {
    let graph = q.graph;
    let sign = q.el.sign();
    let cone = Cone {
        through: q.through,
        bits: &scratch.cone,
    };
    let target = arc::index(q.endpoint, q.rf);
    let parent = *tree.get(id);

    let mut x = parent.to;
    while x != target {
        let Some(link) = scratch.succ[x] else {
            break;
        };
        let (u, urf) = arc::split_index(x);
        for a in fanout_arcs(graph, u) {
            let (_, w) = a.ends(graph);
            if !cone.allows(graph, a, u, w) {
                continue;
            }
            if w != q.endpoint && graph.node(w).is_data_path_source() {
                continue;
            }
            for (irf, orf) in a.trans(graph) {
                let to = arc::index(w, orf);
                if irf != urf || (a == link.arc && to == link.to) {
                    continue;
                }
                let dist = scratch.dist[to];
                if dist == f64::INFINITY {
                    continue;
                }
                let detour = dist + sign * a.delay(graph, q.el, irf, orf) - scratch.dist[x];
                let cost = parent.cost + detour.max(0.0);
                if worst + cost <= cutoff {
                    tree.push(Prefix {
                        from: x,
                        to,
                        arc: a,
                        parent: Some(id),
                        cost,
                        credit: parent.credit,
                    });
                }
            }
        }
        x = link.to;
    }
}

/// Materializes the path of prefix `id`.
fn recover_path(
    q: &CpprQuery<'_>,
    scratch: &CpprScratch,
    tree: &PrefixTree,
    id: usize,
    worst: f64,
) -> Path {
    let graph = q.graph;
    let target = arc::index(q.endpoint, q.rf);
    let chain = tree.chain(id);
    let prefix = chain[chain.len() - 1];

    let (source, rf) = arc::split_index(chain[0].to);
    let mut elements: Vec<PathElement> = path::launch(graph, q.clock_tree, q.el, source, rf);
    let mut x = chain[0].to;
    let mut next = 1;
    while x != target {
        let link = match chain.get(next) {
            Some(p) if p.from == x => {
                next += 1;
                Link { to: p.to, arc: p.arc }
            }
            _ => match scratch.succ[x] {
                Some(link) => link,
                None => break,
            },
        };
        path::expand(graph, x, link, &mut elements);
        x = link.to;
    }

    Path {
        test: q.test,
        split: q.el,
        tran: q.rf,
        kind: q.kind,
        slack: worst + prefix.cost,
        credit: prefix.credit,
        elements,
    }
}
