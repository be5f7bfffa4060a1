//! Full timing propagation over a circuit.
//!
//! One call of [`propagate`] recomputes everything the queries read:
//!
//! 1. levelize the graph over non-constraint edges;
//! 2. reset node timing and test required times;
//! 3. bring every net's parasitic tree up to date;
//! 4. seed primary inputs and the clock source;
//! 5. forward, level by level: compute edge delays and relax AT and slew;
//! 6. derive test required times from the checks and user values;
//! 7. backward, level by level: relax RAT;
//! 8. compute endpoint slacks and refresh the endpoint heaps;
//! 9. rebuild jumps and the clock tree.

use crate::circuit::Circuit;
use crate::corner::{split_trans, Split, Tran};
use crate::edge::EdgeType;
use crate::endpoint::Test;
use crate::ids::{EdgeId, NodeId, PinId, TestId};
use chronos_common::ChronosResult;

/// Recomputes arrival, required and slack values for the whole circuit.
///
/// Fails only if the graph has a combinational loop, in which case no
/// timing value is touched.
pub(crate) fn propagate(circuit: &mut Circuit) -> ChronosResult<()> {
    circuit.graph.levelize()?;
    reset(circuit);
    update_parasitics(circuit);
    seed_sources(circuit);

    let levels: Vec<Vec<NodeId>> = circuit.graph.levels().to_vec();
    for &u in levels.iter().flatten() {
        let fanout: Vec<EdgeId> = circuit.graph.node(u).fanout().collect();
        for e in fanout {
            match circuit.graph.edge(e).edge_type() {
                EdgeType::RcTree => propagate_interconnect(circuit, e),
                EdgeType::Combinational => propagate_cell(circuit, e),
                EdgeType::Constraint => {}
            }
        }
    }

    update_test_rats(circuit);
    for &u in levels.iter().rev().flatten() {
        let fanout: Vec<EdgeId> = circuit.graph.node(u).fanout().collect();
        for e in fanout {
            let edge = circuit.graph.edge(e);
            if edge.is_constraint() {
                continue;
            }
            let arcs: Vec<(Tran, Tran)> = edge.arcs().collect();
            for el in Split::ALL {
                for &(irf, orf) in &arcs {
                    circuit.graph.relax_rat(el, irf, orf, e);
                }
            }
        }
    }
    update_endpoints(circuit);

    circuit.graph.update_jumps();
    if let Some(clock) = circuit.clock {
        let root = circuit.pin(clock.source).node();
        circuit.clock_tree.update_clock_tree(&mut circuit.graph, root);
    }
    Ok(())
}

fn reset(circuit: &mut Circuit) {
    circuit.graph.reset_timing();
    for test in circuit.tests.iter_mut().flatten() {
        test.reset_rat();
    }
}

fn update_parasitics(circuit: &mut Circuit) {
    for net in circuit.nets.iter_mut().flatten() {
        let tap = net.driver().and_then(|d| net.rctree.node_of_pin(d));
        if let Some(tap) = tap {
            if net.rctree.root() != Some(tap) {
                net.rctree.set_root(tap);
            }
        }
        net.rctree.update_rc_timing();
    }
}

fn seed_sources(circuit: &mut Circuit) {
    let clock_source = circuit.clock.map(|c| c.source);
    for pi in circuit.primary_inputs().to_vec() {
        let pin = circuit.pin(pi);
        let node = pin.node();
        let seeds: Vec<(Split, Tran, f64, f64)> = split_trans()
            .map(|(el, rf)| {
                let at = pin.input_at(el, rf).unwrap_or(0.0);
                let slew = pin.input_slew(el, rf).unwrap_or(0.0);
                (el, rf, at, slew)
            })
            .collect();
        let n = circuit.graph.node_mut(node);
        for (el, rf, at, slew) in seeds {
            n.seed_at(el, rf, at, clock_source == Some(pi));
            n.seed_slew(el, rf, slew);
        }
    }
}

/// Capacitance the pin drives: the root load of its net's parasitics, or
/// the sum of the sink pin capacitances when the net has none.
fn output_load(circuit: &mut Circuit, pin: PinId, el: Split, rf: Tran) -> f64 {
    let Some(net) = circuit.pin(pin).net() else {
        return 0.0;
    };
    let tree = &mut circuit.net_mut(net).rctree;
    if let Some(root) = tree.root() {
        return tree.load(root, el, rf);
    }
    let net = circuit.net(net);
    net.sinks().iter().map(|&p| circuit.pin(p).cap(el, rf)).sum()
}

fn propagate_interconnect(circuit: &mut Circuit, e: EdgeId) {
    let edge = circuit.graph.edge(e);
    let (from, net) = (edge.from(), edge.net());
    let sink = circuit.graph.node(edge.to()).pin();

    for (el, rf) in split_trans() {
        let src = circuit.graph.node(from);
        if !src.at(el, rf).is_finite() {
            continue;
        }
        let si = src.slew(el, rf);
        let (delay, slew) = match net {
            Some(net) => {
                let tree = &mut circuit.net_mut(net).rctree;
                match tree.root().and(tree.node_of_pin(sink)) {
                    Some(tap) => (tree.delay(tap, el, rf), tree.slew(tap, el, rf, si)),
                    None => (0.0, si),
                }
            }
            None => (0.0, si),
        };
        circuit.graph.edge_mut(e).set_delay(el, rf, rf, delay);
        circuit.graph.relax_at(el, rf, rf, e);
        circuit.graph.relax_slew(el, rf, e, slew);
    }
}

/// Evaluates the cell arc of `e` at the current input slew and output
/// load. Edges without a model, or without a table for a transition, keep
/// the delay they were given.
fn propagate_cell(circuit: &mut Circuit, e: EdgeId) {
    let edge = circuit.graph.edge(e);
    let (from, to) = (edge.from(), edge.to());
    let models = [edge.timing_arc(Split::Early), edge.timing_arc(Split::Late)];
    let arcs: Vec<(Tran, Tran)> = edge.arcs().collect();
    let driver = circuit.graph.node(to).pin();

    for el in Split::ALL {
        for &(irf, orf) in &arcs {
            let src = circuit.graph.node(from);
            if !src.at(el, irf).is_finite() {
                continue;
            }
            let si = src.slew(el, irf);
            let (delay, slew) = match models[el.index()] {
                Some(id) => {
                    let load = output_load(circuit, driver, el, orf);
                    let model = circuit.timing_arc(id);
                    (model.delay(irf, orf, si, load), model.slew(irf, orf, si, load))
                }
                None => (None, None),
            };
            if let Some(delay) = delay {
                circuit.graph.edge_mut(e).set_delay(el, irf, orf, delay);
            }
            circuit.graph.relax_at(el, irf, orf, e);
            circuit.graph.relax_slew(el, orf, e, slew.unwrap_or(si));
        }
    }
}

/// Required time a sequential check puts on its data pin.
///
/// Setup is checked against the next capturing edge at its earliest
/// arrival, hold against the same edge at its latest.
fn check_rat(circuit: &Circuit, test: &Test, clock_pin: PinId, el: Split, drf: Tran, period: f64) -> Option<f64> {
    let model = circuit.timing_arc(test.timing_arc(el)?);
    let crf = test.capture_tran(el)?;
    let clock = circuit.graph.node(circuit.pin(clock_pin).node());
    let data = circuit.graph.node(circuit.pin(test.constrained()).node());
    let capture_el = el.opposite();
    let clock_at = clock.at(capture_el, crf);
    if !clock_at.is_finite() {
        return None;
    }
    let value = model.constraint(crf, drf, clock.slew(capture_el, crf), data.slew(el, drf))?;
    Some(match el {
        Split::Early => clock_at + value,
        Split::Late => clock_at + period - value,
    })
}

fn update_test_rats(circuit: &mut Circuit) {
    let period = circuit.clock.map(|c| c.period);
    let mut rats: Vec<(TestId, NodeId, Split, Tran, f64)> = Vec::new();
    for test in circuit.tests() {
        let node = circuit.pin(test.constrained()).node();
        for (el, rf) in split_trans() {
            let rat = match test.related() {
                None => test.user_rat(el, rf),
                Some(clock_pin) => period.and_then(|p| check_rat(circuit, test, clock_pin, el, rf, p)),
            };
            if let Some(rat) = rat {
                rats.push((test.id(), node, el, rf, rat));
            }
        }
    }
    for (id, node, el, rf, rat) in rats {
        if let Some(Some(test)) = circuit.tests.get_mut(id.index()) {
            test.set_rat(el, rf, rat);
        }
        circuit.graph.node_mut(node).relax_rat(el, rf, rat);
    }
}

fn update_endpoints(circuit: &mut Circuit) {
    let mut slacks: Vec<(TestId, Split, Tran, f64)> = Vec::new();
    for test in circuit.tests() {
        let node = circuit.graph.node(circuit.pin(test.constrained()).node());
        for (el, rf) in split_trans() {
            slacks.push((test.id(), el, rf, el.slack(node.at(el, rf), test.rat(el, rf))));
        }
    }
    for (id, el, rf, slack) in slacks {
        if let Some(Some(test)) = circuit.tests.get_mut(id.index()) {
            test.set_slack(el, rf, slack);
        }
        let heap = &mut circuit.heaps[el.index()];
        if slack.is_finite() {
            heap.insert(&mut circuit.tests, id, rf);
        } else {
            heap.remove(&mut circuit.tests, id, rf);
        }
    }
}
