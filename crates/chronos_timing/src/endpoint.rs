//! Timing tests and their endpoints.
//!
//! A [`Test`] is a timing check at a constrained pin: either a setup/hold
//! check against a related clock pin, or a required time on a primary
//! output. Each test owns four [`Endpoint`]s, one per split and transition of
//! the constrained pin, whose slacks are ranked by the endpoint heaps.

use crate::corner::{Split, SplitTran, Tran};
use crate::cppr::PathKind;
use crate::ids::{EdgeId, PinId, TestId, TimingArcId};
use crate::timing_arc::ArcKind;
use serde::{Deserialize, Serialize};

/// One (split, transition) slot of a test.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Endpoint {
    test: TestId,
    split: Split,
    tran: Tran,
    slack: f64,
    pub(crate) heap_index: Option<usize>,
}

impl Endpoint {
    fn new(test: TestId, split: Split, tran: Tran) -> Self {
        Self {
            test,
            split,
            tran,
            slack: f64::INFINITY,
            heap_index: None,
        }
    }

    /// The owning test.
    pub fn test(&self) -> TestId {
        self.test
    }

    /// The split this endpoint is checked under.
    pub fn split(&self) -> Split {
        self.split
    }

    /// The transition of the constrained pin.
    pub fn tran(&self) -> Tran {
        self.tran
    }

    /// Slack without pessimism removal.
    pub fn slack(&self) -> f64 {
        self.slack
    }

    /// Position in the endpoint heap of its split, if ranked.
    pub fn heap_index(&self) -> Option<usize> {
        self.heap_index
    }
}

/// A timing check at a constrained pin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Test {
    id: TestId,
    constrained: PinId,
    related: Option<PinId>,
    arcs: [Option<(TimingArcId, ArcKind)>; 2],
    edge: Option<EdgeId>,
    user_rat: SplitTran<Option<f64>>,
    rat: SplitTran<f64>,
    endpoints: SplitTran<Endpoint>,
}

impl Test {
    /// A required-time test on a primary output.
    pub(crate) fn output(id: TestId, constrained: PinId) -> Self {
        Self {
            id,
            constrained,
            related: None,
            arcs: [None; 2],
            edge: None,
            user_rat: SplitTran::splat(None),
            rat: SplitTran::from_fn(|el, _| el.rat_init()),
            endpoints: SplitTran::from_fn(|el, rf| Endpoint::new(id, el, rf)),
        }
    }

    /// A sequential check of `constrained` against clock pin `related`.
    pub(crate) fn sequential(id: TestId, constrained: PinId, related: PinId) -> Self {
        Self {
            related: Some(related),
            ..Self::output(id, constrained)
        }
    }

    /// This test's ID.
    pub fn id(&self) -> TestId {
        self.id
    }

    /// The constrained (data or output) pin.
    pub fn constrained(&self) -> PinId {
        self.constrained
    }

    /// The related clock pin of a sequential check.
    pub fn related(&self) -> Option<PinId> {
        self.related
    }

    /// The constraint edge from the related to the constrained pin.
    pub fn edge(&self) -> Option<EdgeId> {
        self.edge
    }

    pub(crate) fn set_edge(&mut self, edge: Option<EdgeId>) {
        self.edge = edge;
    }

    /// The check arc used for `el`: hold for early, setup for late.
    pub fn timing_arc(&self, el: Split) -> Option<TimingArcId> {
        self.arcs[el.index()].map(|(id, _)| id)
    }

    pub(crate) fn set_timing_arc(&mut self, el: Split, arc: TimingArcId, kind: ArcKind) {
        self.arcs[el.index()] = Some((arc, kind));
    }

    /// The clock transition that captures data under `el`.
    pub fn capture_tran(&self, el: Split) -> Option<Tran> {
        self.arcs[el.index()].and_then(|(_, kind)| kind.trigger())
    }

    /// Returns `true` for setup/hold checks.
    pub fn is_sequential(&self) -> bool {
        self.related.is_some()
    }

    /// The kind of path that ends at this test under `el`.
    pub fn path_kind(&self, el: Split) -> PathKind {
        match (self.related, el) {
            (None, _) => PathKind::Rat,
            (Some(_), Split::Early) => PathKind::Hold,
            (Some(_), Split::Late) => PathKind::Setup,
        }
    }

    /// A required time set by the user on a primary output.
    pub fn user_rat(&self, el: Split, rf: Tran) -> Option<f64> {
        self.user_rat[(el, rf)]
    }

    pub(crate) fn set_user_rat(&mut self, el: Split, rf: Tran, rat: Option<f64>) {
        self.user_rat[(el, rf)] = rat;
    }

    /// The required time at the constrained pin from the last propagation.
    pub fn rat(&self, el: Split, rf: Tran) -> f64 {
        self.rat[(el, rf)]
    }

    pub(crate) fn set_rat(&mut self, el: Split, rf: Tran, rat: f64) {
        self.rat[(el, rf)] = rat;
    }

    pub(crate) fn reset_rat(&mut self) {
        self.rat = SplitTran::from_fn(|el, _| el.rat_init());
    }

    /// The endpoint for `(el, rf)`.
    pub fn endpoint(&self, el: Split, rf: Tran) -> &Endpoint {
        &self.endpoints[(el, rf)]
    }

    pub(crate) fn endpoint_mut(&mut self, el: Split, rf: Tran) -> &mut Endpoint {
        &mut self.endpoints[(el, rf)]
    }

    /// Pre-CPPR slack of the endpoint for `(el, rf)`.
    pub fn slack(&self, el: Split, rf: Tran) -> f64 {
        self.endpoints[(el, rf)].slack
    }

    pub(crate) fn set_slack(&mut self, el: Split, rf: Tran, slack: f64) {
        self.endpoints[(el, rf)].slack = slack;
    }
}
