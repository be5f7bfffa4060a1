//! Boundary timing constraints.
//!
//! This module defines the clock, input/output delay, input transition and
//! output load constraints a design is analyzed under. A constraint reader
//! fills a [`TimingConstraints`] and hands it to
//! [`Circuit::apply_constraints`](crate::circuit::Circuit::apply_constraints),
//! which resolves port names and stores the values on the primary I/O.

use crate::corner::{Split, Tran};
use chronos_common::Ident;
use serde::{Deserialize, Serialize};

/// A collection of timing constraints for a design.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingConstraints {
    /// The clock (`create_clock`). Only one clock domain is analyzed.
    pub clock: Option<ClockConstraint>,
    /// Input arrival times (`set_input_delay`).
    pub input_delays: Vec<IoDelay>,
    /// Input slews (`set_input_transition`).
    pub input_transitions: Vec<IoDelay>,
    /// Output delays (`set_output_delay`).
    pub output_delays: Vec<IoDelay>,
    /// Output pin loads (`set_load`).
    pub output_loads: Vec<OutputLoad>,
}

impl TimingConstraints {
    /// Creates an empty set of timing constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if no constraint is present.
    pub fn is_empty(&self) -> bool {
        self.clock.is_none()
            && self.input_delays.is_empty()
            && self.input_transitions.is_empty()
            && self.output_delays.is_empty()
            && self.output_loads.is_empty()
    }
}

/// A clock applied to a primary input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClockConstraint {
    /// The name of the clock.
    pub name: Ident,
    /// The primary input the clock enters at.
    pub port: Ident,
    /// Clock period.
    pub period: f64,
}

impl ClockConstraint {
    /// Required time at a primary output with external delay `delay`.
    ///
    /// Hold requires the data to stay stable `delay` before the same edge;
    /// setup requires it `delay` before the next edge.
    pub fn output_rat(&self, el: Split, delay: f64) -> f64 {
        match el {
            Split::Early => -delay,
            Split::Late => self.period - delay,
        }
    }
}

/// A per-port value that may be restricted to one split and/or transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoDelay {
    /// The port this value applies to.
    pub port: Ident,
    /// Restricts the value to one split (`-min`/`-max`).
    pub split: Option<Split>,
    /// Restricts the value to one transition (`-rise`/`-fall`).
    pub tran: Option<Tran>,
    /// The value.
    pub value: f64,
}

impl IoDelay {
    /// Creates a value for every split and transition.
    pub fn all(port: Ident, value: f64) -> Self {
        Self {
            port,
            split: None,
            tran: None,
            value,
        }
    }

    /// Returns `true` if the value applies to `(el, rf)`.
    pub fn applies_to(&self, el: Split, rf: Tran) -> bool {
        self.split.map_or(true, |s| s == el) && self.tran.map_or(true, |t| t == rf)
    }
}

/// A capacitive load on a primary output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLoad {
    /// The output port.
    pub port: Ident,
    /// Load capacitance.
    pub cap: f64,
}
