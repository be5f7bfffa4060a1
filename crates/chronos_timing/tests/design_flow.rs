//! Circuit construction, constraints, parasitics and configuration working
//! together through the timer.

use chronos_common::Interner;
use chronos_config::{TimerConfig, CONFIG_FILE_NAME};
use chronos_timing::{
    ArcKind, Circuit, ClockConstraint, IoDelay, OutputLoad, PinDirection, PinId, Split, TimingArc,
    TimingConstraints, TimingSense, Timer, TimerError, Tran,
};
use std::fs;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cell(c: &mut Circuit, name: &str, sense: TimingSense, delay: f64) -> (PinId, PinId) {
    let g = c.insert_gate(name, "CELL").unwrap();
    let a = c.insert_gate_pin(g, "A", PinDirection::Input, 1.0).unwrap();
    let y = c.insert_gate_pin(g, "Y", PinDirection::Output, 0.0).unwrap();
    let arc = TimingArc::constant(sense, ArcKind::Combinational, delay, 0.0);
    c.insert_cell_arc(a, y, arc).unwrap();
    (a, y)
}

fn clock_pin(c: &mut Circuit, name: &str) -> PinId {
    let g = c.insert_gate(name, "DFF_X1").unwrap();
    let ck = c.insert_gate_pin(g, "CK", PinDirection::Input, 1.0).unwrap();
    let d = c.insert_gate_pin(g, "D", PinDirection::Input, 1.0).unwrap();
    c.insert_constraint_arc(
        ck,
        d,
        TimingArc::constant_check(ArcKind::SetupRising, 0.0),
        TimingArc::constant_check(ArcKind::HoldRising, 0.0),
    )
    .unwrap();
    ck
}

fn wire(c: &mut Circuit, name: &str, driver: PinId, sinks: &[PinId]) {
    let net = c.insert_net(name).unwrap();
    c.connect(driver, net).unwrap();
    for &sink in sinks {
        c.connect(sink, net).unwrap();
    }
}

/// `din -> u1 -> dout` with a resistive output net, timed against `clk`.
fn io_path(constraints: impl FnOnce(&Interner) -> TimingConstraints) -> Circuit {
    let mut c = Circuit::new();
    c.insert_primary_input("clk").unwrap();
    let din = c.insert_primary_input("din").unwrap();
    let dout = c.insert_primary_output("dout").unwrap();
    let (a, y) = cell(&mut c, "u1", TimingSense::PositiveUnate, 1.0);
    wire(&mut c, "n1", din, &[a]);
    wire(&mut c, "n2", y, &[dout]);

    let n2 = c.find_net("n2").unwrap();
    c.rctree_mut(n2).insert_segment("n2:1", "n2:2", 0.5);
    c.bind_rc_tap(n2, "n2:1", y).unwrap();
    c.bind_rc_tap(n2, "n2:2", dout).unwrap();

    let tc = constraints(c.interner());
    c.apply_constraints(&tc).unwrap();
    c
}

fn sdc(i: &Interner) -> TimingConstraints {
    let mut tc = TimingConstraints::new();
    tc.clock = Some(ClockConstraint {
        name: i.get_or_intern("core"),
        port: i.get_or_intern("clk"),
        period: 5.0,
    });
    tc.input_delays.push(IoDelay::all(i.get_or_intern("din"), 0.5));
    tc.output_delays.push(IoDelay::all(i.get_or_intern("dout"), 3.0));
    tc.output_loads.push(OutputLoad {
        port: i.get_or_intern("dout"),
        cap: 2.0,
    });
    tc
}

// ===========================================================================
// Constraints and parasitics
// ===========================================================================

#[test]
fn constrained_io_path() {
    let mut t = Timer::new(io_path(sdc), TimerConfig::default()).unwrap();
    // 0.5 input delay, 1.0 cell, 0.5 ohm into 2.0 of load
    assert_eq!(t.report_at("dout", Split::Late, Tran::Rise).unwrap(), 2.5);
    assert_eq!(t.report_rat("dout", Split::Late, Tran::Rise).unwrap(), 2.0);
    assert_eq!(t.report_slack("dout", Split::Late, Tran::Fall).unwrap().pre_cppr, -0.5);
    assert_eq!(t.report_slack("dout", Split::Early, Tran::Fall).unwrap().pre_cppr, 5.5);
    assert_eq!(t.report_rat("din", Split::Late, Tran::Rise).unwrap(), 0.0);
    assert!(t.report_slew("dout", Split::Late, Tran::Rise).unwrap() > 0.0);
}

#[test]
fn load_changes_reach_the_parasitics() {
    let mut t = Timer::new(io_path(sdc), TimerConfig::default()).unwrap();
    assert_eq!(t.report_at("dout", Split::Late, Tran::Rise).unwrap(), 2.5);
    let dout = t.circuit().find_pin("dout").unwrap();
    t.circuit_mut().set_load(dout, Split::Late, Tran::Rise, 6.0).unwrap();
    assert_eq!(t.report_at("dout", Split::Late, Tran::Rise).unwrap(), 4.5);
    assert_eq!(t.report_at("dout", Split::Late, Tran::Fall).unwrap(), 2.5);
}

#[test]
fn output_delay_without_clock_is_rejected() {
    let mut c = Circuit::new();
    c.insert_primary_output("dout").unwrap();
    let mut tc = TimingConstraints::new();
    tc.output_delays.push(IoDelay::all(c.interner().get_or_intern("dout"), 1.0));
    assert!(c.apply_constraints(&tc).is_err());
}

// ===========================================================================
// Clock tree
// ===========================================================================

#[test]
fn clock_tree_through_an_inverter() {
    let mut c = Circuit::new();
    let clk = c.insert_primary_input("clk").unwrap();
    let (a, y) = cell(&mut c, "inv", TimingSense::NegativeUnate, 1.0);
    let ck_a = clock_pin(&mut c, "ffa");
    let ck_b = clock_pin(&mut c, "ffb");
    let ck_c = clock_pin(&mut c, "ffc");
    wire(&mut c, "nclk", clk, &[ck_a, ck_b, a]);
    wire(&mut c, "ninv", y, &[ck_c]);
    c.set_clock("core", clk, 10.0).unwrap();

    let mut t = Timer::new(c, TimerConfig::default()).unwrap();
    t.update_timing().unwrap();
    let c = t.circuit();
    let (g, tree) = (c.graph(), c.clock_tree());
    let node = |p: PinId| c.pin(p).node();

    assert_eq!(tree.root(), Some(node(clk)));
    assert_eq!(tree.lca(g, node(ck_a), node(ck_b)), Some(node(clk)));
    assert_eq!(tree.lca(g, node(ck_a), node(ck_c)), Some(node(clk)));
    assert_eq!(tree.lca(g, node(ck_c), node(ck_c)), Some(node(ck_c)));
    assert_eq!(tree.depth(g, node(ck_a)), Some(1));
    assert_eq!(tree.num_negations(g, node(ck_a)), Some(0));
    assert_eq!(tree.num_negations(g, node(ck_c)), Some(1));
    assert_eq!(tree.cppr_credit(g, Split::Late, Tran::Rise, Tran::Rise, node(ck_a), node(ck_a)), 0.0);

    let trans: Vec<Tran> = tree
        .clock_path(g, node(ck_c), Tran::Rise)
        .into_iter()
        .map(|(rf, _)| rf)
        .collect();
    assert_eq!(trans, [Tran::Fall, Tran::Fall, Tran::Rise, Tran::Rise]);
}

// ===========================================================================
// Configuration on disk
// ===========================================================================

#[test]
fn timer_reads_design_config() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[analysis]\ncppr = false\nnum_threads = 2\n\n[report]\nnum_paths = 1\n",
    )
    .unwrap();
    let mut t = Timer::from_design_dir(io_path(sdc), dir.path()).unwrap();
    assert!(!t.config().analysis.cppr);
    assert_eq!(t.config().report.num_paths, 1);
    let paths = t.report_timing().unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].slack, -0.5);
}

#[test]
fn missing_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let t = Timer::from_design_dir(Circuit::new(), dir.path()).unwrap();
    assert!(t.config().analysis.cppr);
}

#[test]
fn invalid_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), "[analysis]\nnum_threads = 0\n").unwrap();
    let err = Timer::from_design_dir(Circuit::new(), dir.path()).err().unwrap();
    assert!(matches!(err, TimerError::Config(_)));
}
