//! Cell timing arc models.
//!
//! Delay, output transition and setup/hold values are looked up in
//! two-dimensional NLDM tables. For delay and transition tables the first
//! axis is the input slew and the second the output load. For constraint
//! tables the first axis is the constrained (data) pin slew and the second
//! the related (clock) pin slew. Lookups outside the characterized range are
//! clamped to the table edge.

use crate::corner::{Tran, TimingSense};
use chronos_common::{ChronosResult, InternalError};
use serde::{Deserialize, Serialize};

/// A two-dimensional lookup table with bilinear interpolation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lut {
    index_1: Vec<f64>,
    index_2: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl Lut {
    /// Creates a table, checking that `values` is `index_1.len()` rows of
    /// `index_2.len()` columns and that both axes increase.
    pub fn new(index_1: Vec<f64>, index_2: Vec<f64>, values: Vec<Vec<f64>>) -> ChronosResult<Self> {
        if index_1.is_empty() || index_2.is_empty() {
            return Err(InternalError::new("lookup table with an empty axis"));
        }
        if values.len() != index_1.len() || values.iter().any(|row| row.len() != index_2.len()) {
            return Err(InternalError::new(format!(
                "lookup table values are not {}x{}",
                index_1.len(),
                index_2.len()
            )));
        }
        let increasing = |axis: &[f64]| axis.windows(2).all(|w| w[0] < w[1]);
        if !increasing(&index_1) || !increasing(&index_2) {
            return Err(InternalError::new("lookup table axis is not strictly increasing"));
        }
        Ok(Self {
            index_1,
            index_2,
            values,
        })
    }

    /// A table that returns `value` everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            index_1: vec![0.0],
            index_2: vec![0.0],
            values: vec![vec![value]],
        }
    }

    /// Interpolates the table at `(x1, x2)`.
    pub fn lookup(&self, x1: f64, x2: f64) -> f64 {
        let (i, fi) = interp_index(&self.index_1, x1);
        let (j, fj) = interp_index(&self.index_2, x2);

        let v00 = self.values[i][j];
        let v01 = self.values[i].get(j + 1).copied().unwrap_or(v00);
        let v10 = self
            .values
            .get(i + 1)
            .and_then(|row| row.get(j).copied())
            .unwrap_or(v00);
        let v11 = self
            .values
            .get(i + 1)
            .and_then(|row| row.get(j + 1).copied())
            .unwrap_or(v00);

        let v0 = v00 + (v01 - v00) * fj;
        let v1 = v10 + (v11 - v10) * fj;
        v0 + (v1 - v0) * fi
    }
}

/// Lower interpolation index and fraction of `value` on `axis`, clamped.
fn interp_index(axis: &[f64], value: f64) -> (usize, f64) {
    if axis.len() <= 1 || value.is_nan() || value <= axis[0] {
        return (0, 0.0);
    }
    let last = axis.len() - 1;
    if value >= axis[last] {
        return (last - 1, 1.0);
    }
    let i = axis.partition_point(|&x| x <= value) - 1;
    (i, (value - axis[i]) / (axis[i + 1] - axis[i]))
}

/// What a cell arc describes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ArcKind {
    /// Input to output through combinational logic.
    Combinational,
    /// Clock-to-output on the rising clock edge.
    RisingEdge,
    /// Clock-to-output on the falling clock edge.
    FallingEdge,
    /// Setup check against the rising clock edge.
    SetupRising,
    /// Setup check against the falling clock edge.
    SetupFalling,
    /// Hold check against the rising clock edge.
    HoldRising,
    /// Hold check against the falling clock edge.
    HoldFalling,
}

impl ArcKind {
    /// Returns `true` for setup and hold checks.
    pub fn is_constraint(self) -> bool {
        self.is_setup() || self.is_hold()
    }

    /// Returns `true` for setup checks.
    pub fn is_setup(self) -> bool {
        matches!(self, ArcKind::SetupRising | ArcKind::SetupFalling)
    }

    /// Returns `true` for hold checks.
    pub fn is_hold(self) -> bool {
        matches!(self, ArcKind::HoldRising | ArcKind::HoldFalling)
    }

    /// The clock transition an edge-triggered arc or check responds to.
    pub fn trigger(self) -> Option<Tran> {
        match self {
            ArcKind::Combinational => None,
            ArcKind::RisingEdge | ArcKind::SetupRising | ArcKind::HoldRising => Some(Tran::Rise),
            ArcKind::FallingEdge | ArcKind::SetupFalling | ArcKind::HoldFalling => Some(Tran::Fall),
        }
    }
}

/// A cell timing arc with its NLDM tables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingArc {
    sense: TimingSense,
    kind: ArcKind,
    cell_rise: Option<Lut>,
    cell_fall: Option<Lut>,
    rise_transition: Option<Lut>,
    fall_transition: Option<Lut>,
    rise_constraint: Option<Lut>,
    fall_constraint: Option<Lut>,
}

impl TimingArc {
    /// Creates an arc with no tables.
    pub fn new(sense: TimingSense, kind: ArcKind) -> Self {
        Self {
            sense,
            kind,
            cell_rise: None,
            cell_fall: None,
            rise_transition: None,
            fall_transition: None,
            rise_constraint: None,
            fall_constraint: None,
        }
    }

    /// An arc whose delay and output transition are constant.
    pub fn constant(sense: TimingSense, kind: ArcKind, delay: f64, transition: f64) -> Self {
        Self::new(sense, kind)
            .with_cell_delay(Tran::Rise, Lut::constant(delay))
            .with_cell_delay(Tran::Fall, Lut::constant(delay))
            .with_transition(Tran::Rise, Lut::constant(transition))
            .with_transition(Tran::Fall, Lut::constant(transition))
    }

    /// A setup or hold check with a constant value for both data transitions.
    pub fn constant_check(kind: ArcKind, value: f64) -> Self {
        assert!(kind.is_constraint(), "{kind:?} is not a timing check");
        Self::new(TimingSense::NonUnate, kind)
            .with_constraint(Tran::Rise, Lut::constant(value))
            .with_constraint(Tran::Fall, Lut::constant(value))
    }

    /// Sets the delay table for output transition `orf`.
    pub fn with_cell_delay(mut self, orf: Tran, lut: Lut) -> Self {
        match orf {
            Tran::Rise => self.cell_rise = Some(lut),
            Tran::Fall => self.cell_fall = Some(lut),
        }
        self
    }

    /// Sets the output transition table for `orf`.
    pub fn with_transition(mut self, orf: Tran, lut: Lut) -> Self {
        match orf {
            Tran::Rise => self.rise_transition = Some(lut),
            Tran::Fall => self.fall_transition = Some(lut),
        }
        self
    }

    /// Sets the check table for constrained pin transition `rf`.
    pub fn with_constraint(mut self, rf: Tran, lut: Lut) -> Self {
        match rf {
            Tran::Rise => self.rise_constraint = Some(lut),
            Tran::Fall => self.fall_constraint = Some(lut),
        }
        self
    }

    /// The arc's timing sense.
    pub fn timing_sense(&self) -> TimingSense {
        self.sense
    }

    /// The arc's kind.
    pub fn kind(&self) -> ArcKind {
        self.kind
    }

    /// Returns `true` if input transition `irf` can produce output `orf`.
    pub fn has_arc(&self, irf: Tran, orf: Tran) -> bool {
        self.kind.trigger().map_or(true, |t| t == irf) && self.sense.has_arc(irf, orf)
    }

    /// Delay for `irf → orf` at input slew `slew` and output load `load`.
    pub fn delay(&self, irf: Tran, orf: Tran, slew: f64, load: f64) -> Option<f64> {
        if !self.has_arc(irf, orf) {
            return None;
        }
        let lut = match orf {
            Tran::Rise => self.cell_rise.as_ref(),
            Tran::Fall => self.cell_fall.as_ref(),
        };
        lut.map(|t| t.lookup(slew, load))
    }

    /// Output transition for `irf → orf` at input slew `slew` and load `load`.
    pub fn slew(&self, irf: Tran, orf: Tran, slew: f64, load: f64) -> Option<f64> {
        if !self.has_arc(irf, orf) {
            return None;
        }
        let lut = match orf {
            Tran::Rise => self.rise_transition.as_ref(),
            Tran::Fall => self.fall_transition.as_ref(),
        };
        lut.map(|t| t.lookup(slew, load))
    }

    /// Setup or hold value for clock transition `crf` and data transition
    /// `drf`, given the related and constrained pin slews.
    pub fn constraint(
        &self,
        crf: Tran,
        drf: Tran,
        related_slew: f64,
        constrained_slew: f64,
    ) -> Option<f64> {
        if self.kind.trigger() != Some(crf) || !self.kind.is_constraint() {
            return None;
        }
        let lut = match drf {
            Tran::Rise => self.rise_constraint.as_ref(),
            Tran::Fall => self.fall_constraint.as_ref(),
        };
        lut.map(|t| t.lookup(constrained_slew, related_slew))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Lut {
        Lut::new(
            vec![0.0, 1.0],
            vec![0.0, 2.0],
            vec![vec![1.0, 3.0], vec![2.0, 6.0]],
        )
        .unwrap()
    }

    #[test]
    fn lookup_corners_and_center() {
        let t = table();
        assert_eq!(t.lookup(0.0, 0.0), 1.0);
        assert_eq!(t.lookup(1.0, 2.0), 6.0);
        assert_eq!(t.lookup(0.5, 1.0), 3.0);
    }

    #[test]
    fn lookup_clamps_outside_axes() {
        let t = table();
        assert_eq!(t.lookup(-5.0, -5.0), 1.0);
        assert_eq!(t.lookup(9.0, 9.0), 6.0);
        assert_eq!(t.lookup(0.0, 9.0), 3.0);
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert!(Lut::new(vec![], vec![1.0], vec![]).is_err());
        assert!(Lut::new(vec![0.0, 1.0], vec![0.0], vec![vec![1.0]]).is_err());
        assert!(Lut::new(vec![1.0, 0.0], vec![0.0], vec![vec![1.0], vec![2.0]]).is_err());
    }

    #[test]
    fn constant_lut() {
        assert_eq!(Lut::constant(4.0).lookup(123.0, -1.0), 4.0);
    }

    #[test]
    fn negative_unate_arc_delays() {
        let arc = TimingArc::new(TimingSense::NegativeUnate, ArcKind::Combinational)
            .with_cell_delay(Tran::Fall, table());
        assert_eq!(arc.delay(Tran::Rise, Tran::Fall, 0.5, 1.0), Some(3.0));
        assert_eq!(arc.delay(Tran::Rise, Tran::Rise, 0.5, 1.0), None);
        assert_eq!(arc.delay(Tran::Fall, Tran::Rise, 0.5, 1.0), None);
        assert_eq!(arc.slew(Tran::Rise, Tran::Fall, 0.5, 1.0), None);
    }

    #[test]
    fn edge_triggered_arc_only_fires_on_its_edge() {
        let arc = TimingArc::constant(TimingSense::NonUnate, ArcKind::RisingEdge, 2.0, 0.1);
        assert_eq!(arc.delay(Tran::Rise, Tran::Fall, 0.0, 0.0), Some(2.0));
        assert_eq!(arc.delay(Tran::Fall, Tran::Fall, 0.0, 0.0), None);
        assert_eq!(arc.slew(Tran::Rise, Tran::Rise, 0.0, 0.0), Some(0.1));
    }

    #[test]
    fn check_values() {
        let arc = TimingArc::constant_check(ArcKind::SetupFalling, 0.25);
        assert_eq!(arc.constraint(Tran::Fall, Tran::Rise, 0.0, 0.0), Some(0.25));
        assert_eq!(arc.constraint(Tran::Rise, Tran::Rise, 0.0, 0.0), None);
        assert!(arc.kind().is_setup());
        assert!(!arc.kind().is_hold());
    }

    #[test]
    fn arc_serde_roundtrip() {
        let arc = TimingArc::constant(TimingSense::PositiveUnate, ArcKind::Combinational, 1.5, 0.2);
        let json = serde_json::to_string(&arc).unwrap();
        let back: TimingArc = serde_json::from_str(&json).unwrap();
        assert_eq!(arc, back);
    }
}
