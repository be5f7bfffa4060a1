//! End-to-end pessimism removal on a two-flop design.
//!
//! ```text
//!          nclk        nbuf
//!   clk ───────► buf ───────┬──► ff1:CK ──► ff1:Q ──nq──► ff2:D
//!                           └──► ff2:CK ─────────(check)───┘
//! ```
//!
//! The clock buffer is 1 early and 3 late, ff1's clock-to-q is 1 early and
//! 10 late, and the period is 7. Setup at ff2 is 8 − 13 = −5 before CPPR;
//! the shared buffer contributes 3 − 1 = 2 of pessimism.

use chronos_config::TimerConfig;
use chronos_diagnostics::TerminalRenderer;
use chronos_timing::errors::{T102, T103, T104, T105};
use chronos_timing::{
    ArcKind, Circuit, PathKind, PinDirection, PinId, Split, TimingArc, TimingSense, Timer, Tran,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arc_pair(sense: TimingSense, kind: ArcKind, early: f64, late: f64) -> (TimingArc, TimingArc) {
    (
        TimingArc::constant(sense, kind, early, 0.0),
        TimingArc::constant(sense, kind, late, 0.0),
    )
}

fn wire(c: &mut Circuit, name: &str, driver: PinId, sinks: &[PinId]) {
    let net = c.insert_net(name).unwrap();
    c.connect(driver, net).unwrap();
    for &sink in sinks {
        c.connect(sink, net).unwrap();
    }
}

/// Inserts a flop with zero setup and hold and returns its CK, D and Q.
fn flop(c: &mut Circuit, name: &str) -> (PinId, PinId, PinId) {
    let g = c.insert_gate(name, "DFF_X1").unwrap();
    let ck = c.insert_gate_pin(g, "CK", PinDirection::Input, 1.0).unwrap();
    let d = c.insert_gate_pin(g, "D", PinDirection::Input, 1.0).unwrap();
    let q = c.insert_gate_pin(g, "Q", PinDirection::Output, 0.0).unwrap();
    let (early, late) = arc_pair(TimingSense::NonUnate, ArcKind::RisingEdge, 1.0, 10.0);
    c.insert_cell_arcs(ck, q, early, late).unwrap();
    c.insert_constraint_arc(
        ck,
        d,
        TimingArc::constant_check(ArcKind::SetupRising, 0.0),
        TimingArc::constant_check(ArcKind::HoldRising, 0.0),
    )
    .unwrap();
    (ck, d, q)
}

fn two_flops() -> Circuit {
    let mut c = Circuit::new();
    let clk = c.insert_primary_input("clk").unwrap();
    let buf = c.insert_gate("buf", "BUF_X4").unwrap();
    let a = c.insert_gate_pin(buf, "A", PinDirection::Input, 1.0).unwrap();
    let y = c.insert_gate_pin(buf, "Y", PinDirection::Output, 0.0).unwrap();
    let (early, late) = arc_pair(TimingSense::PositiveUnate, ArcKind::Combinational, 1.0, 3.0);
    c.insert_cell_arcs(a, y, early, late).unwrap();

    let (ck1, _, q1) = flop(&mut c, "ff1");
    let (ck2, d2, _) = flop(&mut c, "ff2");
    wire(&mut c, "nclk", clk, &[a]);
    wire(&mut c, "nbuf", y, &[ck1, ck2]);
    wire(&mut c, "nq", q1, &[d2]);
    c.set_clock("core", clk, 7.0).unwrap();
    c
}

fn timer(c: Circuit) -> Timer {
    Timer::new(c, TimerConfig::default()).unwrap()
}

// ===========================================================================
// Setup and hold credit
// ===========================================================================

#[test]
fn setup_slack_recovers_common_buffer() {
    let mut t = timer(two_flops());
    for rf in Tran::ALL {
        let slack = t.report_slack("ff2:D", Split::Late, rf).unwrap();
        assert_eq!(slack.pre_cppr, -5.0);
        assert_eq!(slack.post_cppr, -3.0);
    }
    assert!(t.sink().contains_code(T105));
}

#[test]
fn hold_slack_gains_common_spread() {
    let mut t = timer(two_flops());
    let slack = t.report_slack("ff2:D", Split::Early, Tran::Rise).unwrap();
    assert_eq!(slack.pre_cppr, -1.0);
    assert_eq!(slack.post_cppr, 1.0);
}

#[test]
fn disabling_cppr_reports_raw_slack() {
    let mut config = TimerConfig::default();
    config.analysis.cppr = false;
    let mut t = Timer::new(two_flops(), config).unwrap();
    assert_eq!(t.report_worst_slack(1).unwrap(), vec![-5.0]);
}

// ===========================================================================
// Path reports
// ===========================================================================

#[test]
fn worst_path_includes_launch_clock() {
    let mut t = timer(two_flops());
    let paths = t.report_worst_paths(1, None).unwrap();
    let path = &paths[0];
    assert_eq!(path.kind, PathKind::Setup);
    assert_eq!(path.split, Split::Late);
    assert_eq!(path.slack, -3.0);
    assert_eq!(path.credit, 2.0);

    let c = t.circuit();
    let names: Vec<&str> = path
        .elements
        .iter()
        .map(|e| c.pin_name(c.pin_of_node(e.node)))
        .collect();
    assert_eq!(names, ["clk", "buf:A", "buf:Y", "ff1:CK", "ff1:Q", "ff2:D"]);
    assert!(path.elements.iter().take(4).all(|e| e.tran == Tran::Rise));

    let json = serde_json::to_string(&paths).unwrap();
    assert!(json.contains("\"Setup\""));
}

#[test]
fn all_endpoints_ranked_worst_first() {
    let mut t = timer(two_flops());
    assert_eq!(t.report_worst_slack(10).unwrap(), vec![-3.0, -3.0, 1.0, 1.0]);
    assert_eq!(t.report_tns(None, None).unwrap(), -12.0);
    assert_eq!(t.report_wns(Some(Split::Early), None).unwrap(), Some(-1.0));
}

#[test]
fn cutoff_drops_passing_paths() {
    let mut config = TimerConfig::default();
    config.report.cutoff = Some(0.0);
    let mut t = Timer::new(two_flops(), config).unwrap();
    assert_eq!(t.report_worst_slack(10).unwrap(), vec![-3.0, -3.0]);
    assert!(t.sink().contains_code(T104));
}

#[test]
fn through_pin_restricts_paths() {
    let mut t = timer(two_flops());
    assert_eq!(t.report_worst_paths(10, Some("ff1:Q")).unwrap().len(), 4);
    assert!(t.report_worst_paths(10, Some("ff2:CK")).unwrap().is_empty());
    assert!(t.sink().contains_code(T102));

    let text = t.render_diagnostics(&TerminalRenderer::new(false));
    assert!(text.contains("warning[T102]"), "{text}");
    assert!(text.contains("--> pin `ff2:CK`"), "{text}");
}

// ===========================================================================
// Incomplete clocking
// ===========================================================================

#[test]
fn unclocked_capture_gets_no_credit() {
    let mut c = two_flops();
    let gclk = c.insert_primary_input("gclk").unwrap();
    let (ck3, d3, _) = flop(&mut c, "ff3");
    let nq = c.find_net("nq").unwrap();
    c.connect(d3, nq).unwrap();
    wire(&mut c, "ngclk", gclk, &[ck3]);

    let mut t = timer(c);
    let slack = t.report_slack("ff3:D", Split::Late, Tran::Rise).unwrap();
    // captured at 0 + 7 by an unclocked pin, launched at 13
    assert_eq!(slack.pre_cppr, -6.0);
    assert_eq!(slack.post_cppr, -6.0);
    assert!(t.sink().contains_code(T103));
    assert_eq!(t.report_worst_slack(1).unwrap(), vec![-6.0]);
}

#[test]
fn edits_invalidate_the_clock_tree() {
    let mut t = timer(two_flops());
    assert_eq!(t.report_worst_slack(1).unwrap(), vec![-3.0]);

    // Moving ff2's clock off the buffer removes the shared segment.
    let c = t.circuit_mut();
    let ck2 = c.find_pin("ff2:CK").unwrap();
    c.disconnect(ck2);
    let nclk = c.find_net("nclk").unwrap();
    c.connect(ck2, nclk).unwrap();
    assert!(!c.clock_tree().is_clock_tree_updated());

    // setup: launch 13, capture 0 + 7
    let slack = t.report_slack("ff2:D", Split::Late, Tran::Rise).unwrap();
    assert_eq!(slack.pre_cppr, -6.0);
    assert_eq!(slack.post_cppr, -6.0);
}
