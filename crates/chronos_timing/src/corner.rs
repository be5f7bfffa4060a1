//! Analysis corners, signal transitions and timing sense.
//!
//! Every timing quantity in the kernel is kept per [`Split`] (early/late)
//! and per [`Tran`] (rise/fall). [`SplitTran`] is the fixed 2×2 container
//! used for those quantities. The min/max direction of each relaxation is
//! decided here and nowhere else:
//!
//! | quantity | early | late |
//! |----------|-------|------|
//! | AT       | min   | max  |
//! | RAT      | max   | min  |
//! | slew     | min   | max  |

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// The analysis split: early (hold) or late (setup).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Split {
    /// Earliest arrival, used for hold checks.
    Early,
    /// Latest arrival, used for setup checks.
    Late,
}

impl Split {
    /// Both splits, early first.
    pub const ALL: [Split; 2] = [Split::Early, Split::Late];

    /// Returns the array index of this split.
    pub fn index(self) -> usize {
        match self {
            Split::Early => 0,
            Split::Late => 1,
        }
    }

    /// Returns the other split.
    pub fn opposite(self) -> Split {
        match self {
            Split::Early => Split::Late,
            Split::Late => Split::Early,
        }
    }

    /// Returns `true` if `candidate` is a strictly better arrival time than
    /// `current`: smaller for early, larger for late.
    pub fn at_improves(self, candidate: f64, current: f64) -> bool {
        match self {
            Split::Early => candidate < current,
            Split::Late => candidate > current,
        }
    }

    /// Returns `true` if `candidate` is a strictly tighter required time than
    /// `current`: larger for early, smaller for late.
    pub fn rat_improves(self, candidate: f64, current: f64) -> bool {
        match self {
            Split::Early => candidate > current,
            Split::Late => candidate < current,
        }
    }

    /// Returns `true` if `candidate` is a strictly better slew than `current`:
    /// smaller for early, larger for late.
    pub fn slew_improves(self, candidate: f64, current: f64) -> bool {
        self.at_improves(candidate, current)
    }

    /// Initial arrival time and slew: `+∞` for early, `−∞` for late.
    pub fn at_init(self) -> f64 {
        match self {
            Split::Early => f64::INFINITY,
            Split::Late => f64::NEG_INFINITY,
        }
    }

    /// Initial required time: `−∞` for early, `+∞` for late.
    pub fn rat_init(self) -> f64 {
        -self.at_init()
    }

    /// Sign applied to path delays when they are accumulated as slack cost.
    ///
    /// Early slack grows with delay, late slack shrinks with it.
    pub fn sign(self) -> f64 {
        match self {
            Split::Early => 1.0,
            Split::Late => -1.0,
        }
    }

    /// Slack from an arrival and a required time: `at − rat` for early,
    /// `rat − at` for late. Unconstrained or unreached points give `+∞`.
    pub fn slack(self, at: f64, rat: f64) -> f64 {
        match self {
            Split::Early => at - rat,
            Split::Late => rat - at,
        }
    }
}

/// A signal transition.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Tran {
    /// Rising transition.
    Rise,
    /// Falling transition.
    Fall,
}

impl Tran {
    /// Both transitions, rise first.
    pub const ALL: [Tran; 2] = [Tran::Rise, Tran::Fall];

    /// Returns the array index of this transition.
    pub fn index(self) -> usize {
        match self {
            Tran::Rise => 0,
            Tran::Fall => 1,
        }
    }

    /// Returns the transition with the given array index.
    pub fn from_index(index: usize) -> Tran {
        if index == 0 {
            Tran::Rise
        } else {
            Tran::Fall
        }
    }

    /// Returns the opposite transition.
    pub fn flip(self) -> Tran {
        match self {
            Tran::Rise => Tran::Fall,
            Tran::Fall => Tran::Rise,
        }
    }

    /// Flips the transition when `invert` is set.
    pub fn flip_if(self, invert: bool) -> Tran {
        if invert {
            self.flip()
        } else {
            self
        }
    }

    /// Flips the transition once per negation, i.e. when `negations` is odd.
    pub fn after_negations(self, negations: usize) -> Tran {
        self.flip_if(negations % 2 == 1)
    }
}

/// A value per split and transition.
#[derive(Clone, Copy, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct SplitTran<T>([[T; 2]; 2]);

impl<T: Copy> SplitTran<T> {
    /// Creates a container holding `value` in all four slots.
    pub fn splat(value: T) -> Self {
        Self([[value; 2]; 2])
    }

    /// Creates a container by evaluating `f` for every slot.
    pub fn from_fn(mut f: impl FnMut(Split, Tran) -> T) -> Self {
        Self([
            [f(Split::Early, Tran::Rise), f(Split::Early, Tran::Fall)],
            [f(Split::Late, Tran::Rise), f(Split::Late, Tran::Fall)],
        ])
    }

    /// Returns the value for one slot.
    pub fn get(&self, el: Split, rf: Tran) -> T {
        self.0[el.index()][rf.index()]
    }

    /// Overwrites the value for one slot.
    pub fn set(&mut self, el: Split, rf: Tran, value: T) {
        self.0[el.index()][rf.index()] = value;
    }
}

impl<T> Index<(Split, Tran)> for SplitTran<T> {
    type Output = T;

    fn index(&self, (el, rf): (Split, Tran)) -> &T {
        &self.0[el.index()][rf.index()]
    }
}

impl<T> IndexMut<(Split, Tran)> for SplitTran<T> {
    fn index_mut(&mut self, (el, rf): (Split, Tran)) -> &mut T {
        &mut self.0[el.index()][rf.index()]
    }
}

/// Iterates over all four (split, transition) pairs in a fixed order.
pub fn split_trans() -> impl Iterator<Item = (Split, Tran)> {
    Split::ALL
        .into_iter()
        .flat_map(|el| Tran::ALL.into_iter().map(move |rf| (el, rf)))
}

/// How the output transition of an arc follows its input transition.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum TimingSense {
    /// Output follows the input transition.
    PositiveUnate,
    /// Output inverts the input transition.
    NegativeUnate,
    /// Either output transition may follow either input transition.
    NonUnate,
    /// No transition relation is known; the arc propagates nothing.
    Undefined,
}

impl TimingSense {
    /// Returns `true` for positive- and negative-unate senses.
    pub fn is_unate_definite(self) -> bool {
        matches!(self, TimingSense::PositiveUnate | TimingSense::NegativeUnate)
    }

    /// Returns `true` if an input transition `irf` can produce output `orf`.
    pub fn has_arc(self, irf: Tran, orf: Tran) -> bool {
        match self {
            TimingSense::PositiveUnate => irf == orf,
            TimingSense::NegativeUnate => irf != orf,
            TimingSense::NonUnate => true,
            TimingSense::Undefined => false,
        }
    }

    /// Output transitions reachable from input transition `irf`.
    pub fn out_trans(self, irf: Tran) -> impl Iterator<Item = Tran> {
        Tran::ALL.into_iter().filter(move |&orf| self.has_arc(irf, orf))
    }

    /// Input transitions that can produce output transition `orf`.
    pub fn in_trans(self, orf: Tran) -> impl Iterator<Item = Tran> {
        Tran::ALL.into_iter().filter(move |&irf| self.has_arc(irf, orf))
    }

    /// The sense of this arc followed by `next`.
    pub fn compose(self, next: TimingSense) -> TimingSense {
        use TimingSense::*;
        match (self, next) {
            (Undefined, _) | (_, Undefined) => Undefined,
            (NonUnate, _) | (_, NonUnate) => NonUnate,
            (PositiveUnate, s) | (s, PositiveUnate) => s,
            (NegativeUnate, NegativeUnate) => PositiveUnate,
        }
    }
}
