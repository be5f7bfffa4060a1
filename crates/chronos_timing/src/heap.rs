//! Slack-ordered ranking of endpoints.
//!
//! Each split has one [`EndpointHeap`]: an indexed binary min-heap of
//! `(test, transition)` pairs keyed by endpoint slack. The position of every
//! entry is written back to its [`Endpoint`](crate::endpoint::Endpoint) so
//! that updates and removals do not search. Ties are broken by test ID and
//! then transition, which keeps the order deterministic.

use crate::corner::{Split, Tran};
use crate::endpoint::Test;
use crate::ids::TestId;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// An indexed min-heap of the endpoints of one split.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointHeap {
    split: Split,
    items: Vec<(TestId, Tran)>,
}

fn test_of(tests: &[Option<Test>], id: TestId) -> &Test {
    match tests.get(id.index()) {
        Some(Some(test)) => test,
        _ => panic!("test {id} does not exist"),
    }
}

fn test_of_mut(tests: &mut [Option<Test>], id: TestId) -> &mut Test {
    match tests.get_mut(id.index()) {
        Some(Some(test)) => test,
        _ => panic!("test {id} does not exist"),
    }
}

impl EndpointHeap {
    /// Creates an empty heap for `split`.
    pub fn new(split: Split) -> Self {
        Self {
            split,
            items: Vec::new(),
        }
    }

    /// The split this heap ranks.
    pub fn split(&self) -> Split {
        self.split
    }

    /// Number of ranked endpoints.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no endpoint is ranked.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The endpoint with the smallest slack.
    pub fn top(&self) -> Option<(TestId, Tran)> {
        self.items.first().copied()
    }

    fn cmp_items(&self, tests: &[Option<Test>], a: (TestId, Tran), b: (TestId, Tran)) -> Ordering {
        let sa = test_of(tests, a.0).slack(self.split, a.1);
        let sb = test_of(tests, b.0).slack(self.split, b.1);
        sa.total_cmp(&sb).then_with(|| a.cmp(&b))
    }

    fn place(&mut self, tests: &mut [Option<Test>], pos: usize) {
        let (test, rf) = self.items[pos];
        test_of_mut(tests, test).endpoint_mut(self.split, rf).heap_index = Some(pos);
    }

    fn sift_up(&mut self, tests: &mut [Option<Test>], mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.cmp_items(tests, self.items[pos], self.items[parent]) != Ordering::Less {
                break;
            }
            self.items.swap(pos, parent);
            self.place(tests, pos);
            pos = parent;
        }
        self.place(tests, pos);
    }

    fn sift_down(&mut self, tests: &mut [Option<Test>], mut pos: usize) {
        let n = self.items.len();
        loop {
            let mut best = pos;
            for child in [2 * pos + 1, 2 * pos + 2] {
                if child < n && self.cmp_items(tests, self.items[child], self.items[best]) == Ordering::Less {
                    best = child;
                }
            }
            if best == pos {
                break;
            }
            self.items.swap(pos, best);
            self.place(tests, pos);
            pos = best;
        }
        self.place(tests, pos);
    }

    /// Inserts an endpoint, or restores heap order after its slack changed.
    pub fn insert(&mut self, tests: &mut [Option<Test>], test: TestId, rf: Tran) {
        match test_of(tests, test).endpoint(self.split, rf).heap_index() {
            Some(pos) => {
                self.sift_up(tests, pos);
                let pos = test_of(tests, test)
                    .endpoint(self.split, rf)
                    .heap_index()
                    .unwrap_or(pos);
                self.sift_down(tests, pos);
            }
            None => {
                self.items.push((test, rf));
                let pos = self.items.len() - 1;
                self.sift_up(tests, pos);
            }
        }
    }

    /// Removes an endpoint if it is ranked.
    pub fn remove(&mut self, tests: &mut [Option<Test>], test: TestId, rf: Tran) {
        let Some(pos) = test_of(tests, test).endpoint(self.split, rf).heap_index() else {
            return;
        };
        test_of_mut(tests, test).endpoint_mut(self.split, rf).heap_index = None;
        let last = self.items.len() - 1;
        self.items.swap(pos, last);
        self.items.pop();
        if pos < self.items.len() {
            let (moved, mrf) = self.items[pos];
            self.sift_up(tests, pos);
            if let Some(p) = test_of(tests, moved).endpoint(self.split, mrf).heap_index() {
                self.sift_down(tests, p);
            }
        }
    }

    /// Removes every endpoint.
    pub fn clear(&mut self, tests: &mut [Option<Test>]) {
        for (test, rf) in std::mem::take(&mut self.items) {
            if let Some(Some(t)) = tests.get_mut(test.index()) {
                t.endpoint_mut(self.split, rf).heap_index = None;
            }
        }
    }

    /// The `k` endpoints with the smallest slacks, worst first.
    pub fn worst(&self, tests: &[Option<Test>], k: usize) -> Vec<(TestId, Tran)> {
        let mut out = Vec::with_capacity(k.min(self.items.len()));
        let mut frontier: BinaryHeap<Reverse<(OrdSlack, (TestId, Tran), usize)>> = BinaryHeap::new();
        let key = |pos: usize| {
            let (test, rf) = self.items[pos];
            Reverse((OrdSlack(test_of(tests, test).slack(self.split, rf)), (test, rf), pos))
        };
        if !self.items.is_empty() {
            frontier.push(key(0));
        }
        while out.len() < k {
            let Some(Reverse((_, item, pos))) = frontier.pop() else {
                break;
            };
            out.push(item);
            for child in [2 * pos + 1, 2 * pos + 2] {
                if child < self.items.len() {
                    frontier.push(key(child));
                }
            }
        }
        out
    }
}

/// Total order over slacks.
#[derive(Clone, Copy, Debug, PartialEq)]
struct OrdSlack(f64);

impl Eq for OrdSlack {}

impl PartialOrd for OrdSlack {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdSlack {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
