//! The circuit container: pins, nets, gates, tests and the graph built from
//! them.
//!
//! A [`Circuit`] owns one [`TimingGraph`] and keeps it in step with the
//! netlist: every pin is a node, every driver-to-sink connection of a net is
//! an RC-tree edge, every cell arc is a combinational edge, and every setup
//! or hold check is a constraint edge plus a [`Test`]. Primary outputs carry
//! a required-time test of their own.
//!
//! Names are interned in the circuit's own [`Interner`]. Gate pins are named
//! `gate:pin`; primary I/O pins by their port name.

use crate::clock_tree::ClockTree;
use crate::constraints::TimingConstraints;
use crate::corner::{Split, SplitTran, Tran, TimingSense};
use crate::cppr::CpprQuery;
use crate::edge::EdgeType;
use crate::endpoint::Test;
use crate::graph::TimingGraph;
use crate::heap::EndpointHeap;
use crate::ids::{EdgeId, GateId, NetId, NodeId, PinId, TestId, TimingArcId};
use crate::node::PinRole;
use crate::rctree::RcTree;
use crate::timing_arc::TimingArc;
use chronos_common::{ChronosResult, DesignObject, Ident, InternalError, Interner};
use chronos_diagnostics::Location;
use std::collections::HashMap;

/// Which side of its net a pin is on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PinDirection {
    /// The pin is driven by its net: gate inputs and primary outputs.
    Input,
    /// The pin drives its net: gate outputs and primary inputs.
    Output,
}

/// A gate pin or primary I/O port.
#[derive(Clone, Debug)]
pub struct Pin {
    name: Ident,
    gate: Option<GateId>,
    direction: PinDirection,
    net: Option<NetId>,
    node: NodeId,
    cap: SplitTran<f64>,
    input_at: SplitTran<Option<f64>>,
    input_slew: SplitTran<Option<f64>>,
    test: Option<TestId>,
}

impl Pin {
    fn new(name: Ident, gate: Option<GateId>, direction: PinDirection, node: NodeId, cap: f64) -> Self {
        Self {
            name,
            gate,
            direction,
            net: None,
            node,
            cap: SplitTran::splat(cap),
            input_at: SplitTran::splat(None),
            input_slew: SplitTran::splat(None),
            test: None,
        }
    }

    /// The pin's full name.
    pub fn name(&self) -> Ident {
        self.name
    }

    /// The gate the pin belongs to; `None` for primary I/O.
    pub fn gate(&self) -> Option<GateId> {
        self.gate
    }

    /// Which side of its net the pin is on.
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// The net the pin is connected to.
    pub fn net(&self) -> Option<NetId> {
        self.net
    }

    /// The pin's timing graph node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Input capacitance, or the external load of a primary output.
    pub fn cap(&self, el: Split, rf: Tran) -> f64 {
        self.cap[(el, rf)]
    }

    /// User arrival time of a primary input.
    pub fn input_at(&self, el: Split, rf: Tran) -> Option<f64> {
        self.input_at[(el, rf)]
    }

    /// User slew of a primary input.
    pub fn input_slew(&self, el: Split, rf: Tran) -> Option<f64> {
        self.input_slew[(el, rf)]
    }

    /// The required-time test of a primary output.
    pub fn test(&self) -> Option<TestId> {
        self.test
    }
}

/// A net with its driver, sinks and parasitics.
#[derive(Clone, Debug)]
pub struct Net {
    name: Ident,
    driver: Option<PinId>,
    sinks: Vec<PinId>,
    pub(crate) rctree: RcTree,
}

impl Net {
    /// The net name.
    pub fn name(&self) -> Ident {
        self.name
    }

    /// The pin driving the net.
    pub fn driver(&self) -> Option<PinId> {
        self.driver
    }

    /// The pins the net drives, in connection order.
    pub fn sinks(&self) -> &[PinId] {
        &self.sinks
    }

    /// The parasitic tree.
    pub fn rctree(&self) -> &RcTree {
        &self.rctree
    }
}

/// A cell instance.
#[derive(Clone, Debug)]
pub struct Gate {
    name: Ident,
    cell: Ident,
    pins: Vec<PinId>,
}

impl Gate {
    /// The instance name.
    pub fn name(&self) -> Ident {
        self.name
    }

    /// The library cell name.
    pub fn cell(&self) -> Ident {
        self.cell
    }

    /// The gate's pins in insertion order.
    pub fn pins(&self) -> &[PinId] {
        &self.pins
    }
}

/// The clock the design is analyzed under.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Clock {
    /// Clock name.
    pub name: Ident,
    /// The primary input the clock enters at.
    pub source: PinId,
    /// Clock period.
    pub period: f64,
}

fn slot<'a, T>(arena: &'a [Option<T>], index: usize, what: &str) -> &'a T {
    match arena.get(index) {
        Some(Some(v)) => v,
        _ => panic!("{what} {index} does not exist"),
    }
}

fn slot_mut<'a, T>(arena: &'a mut [Option<T>], index: usize, what: &str) -> &'a mut T {
    match arena.get_mut(index) {
        Some(Some(v)) => v,
        _ => panic!("{what} {index} does not exist"),
    }
}

/// A gate-level netlist and its timing graph.
pub struct Circuit {
    pub(crate) interner: Interner,
    pub(crate) graph: TimingGraph,
    pub(crate) pins: Vec<Option<Pin>>,
    pub(crate) nets: Vec<Option<Net>>,
    pub(crate) gates: Vec<Option<Gate>>,
    pub(crate) tests: Vec<Option<Test>>,
    pub(crate) timing_arcs: Vec<TimingArc>,
    pub(crate) clock: Option<Clock>,
    pub(crate) clock_tree: ClockTree,
    pub(crate) heaps: [EndpointHeap; 2],
    pin_names: HashMap<Ident, PinId>,
    net_names: HashMap<Ident, NetId>,
    gate_names: HashMap<Ident, GateId>,
    primary_inputs: Vec<PinId>,
    primary_outputs: Vec<PinId>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            graph: TimingGraph::new(),
            pins: Vec::new(),
            nets: Vec::new(),
            gates: Vec::new(),
            tests: Vec::new(),
            timing_arcs: Vec::new(),
            clock: None,
            clock_tree: ClockTree::new(),
            heaps: [EndpointHeap::new(Split::Early), EndpointHeap::new(Split::Late)],
            pin_names: HashMap::new(),
            net_names: HashMap::new(),
            gate_names: HashMap::new(),
            primary_inputs: Vec::new(),
            primary_outputs: Vec::new(),
        }
    }

    /// The interner holding every object name.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// The timing graph.
    pub fn graph(&self) -> &TimingGraph {
        &self.graph
    }

    /// The clock tree index.
    pub fn clock_tree(&self) -> &ClockTree {
        &self.clock_tree
    }

    /// The clock, if one is defined.
    pub fn clock(&self) -> Option<&Clock> {
        self.clock.as_ref()
    }

    /// Returns a pin. Panics if it does not exist.
    pub fn pin(&self, id: PinId) -> &Pin {
        slot(&self.pins, id.index(), "pin")
    }

    fn pin_mut(&mut self, id: PinId) -> &mut Pin {
        slot_mut(&mut self.pins, id.index(), "pin")
    }

    /// Returns a net. Panics if it does not exist.
    pub fn net(&self, id: NetId) -> &Net {
        slot(&self.nets, id.index(), "net")
    }

    pub(crate) fn net_mut(&mut self, id: NetId) -> &mut Net {
        slot_mut(&mut self.nets, id.index(), "net")
    }

    /// Returns a gate. Panics if it does not exist.
    pub fn gate(&self, id: GateId) -> &Gate {
        slot(&self.gates, id.index(), "gate")
    }

    /// Returns a test. Panics if it does not exist.
    pub fn test(&self, id: TestId) -> &Test {
        slot(&self.tests, id.index(), "test")
    }

    /// Returns a cell or check arc.
    pub fn timing_arc(&self, id: TimingArcId) -> &TimingArc {
        &self.timing_arcs[id.index()]
    }

    /// Every live test.
    pub fn tests(&self) -> impl Iterator<Item = &Test> {
        self.tests.iter().flatten()
    }

    /// Tests whose constrained pin is `pin`.
    pub fn tests_at(&self, pin: PinId) -> impl Iterator<Item = &Test> {
        self.tests().filter(move |t| t.constrained() == pin)
    }

    /// Number of live pins.
    pub fn num_pins(&self) -> usize {
        self.pins.iter().flatten().count()
    }

    /// Number of live nets.
    pub fn num_nets(&self) -> usize {
        self.nets.iter().flatten().count()
    }

    /// Number of live gates.
    pub fn num_gates(&self) -> usize {
        self.gates.iter().flatten().count()
    }

    /// Number of live tests.
    pub fn num_tests(&self) -> usize {
        self.tests().count()
    }

    /// Primary inputs in insertion order.
    pub fn primary_inputs(&self) -> &[PinId] {
        &self.primary_inputs
    }

    /// Primary outputs in insertion order.
    pub fn primary_outputs(&self) -> &[PinId] {
        &self.primary_outputs
    }

    /// The endpoint heap of `el`.
    pub fn endpoint_heap(&self, el: Split) -> &EndpointHeap {
        &self.heaps[el.index()]
    }

    /// Looks up a pin by name.
    pub fn find_pin(&self, name: &str) -> Option<PinId> {
        self.interner.get(name).and_then(|id| self.pin_names.get(&id).copied())
    }

    /// Looks up a net by name.
    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.interner.get(name).and_then(|id| self.net_names.get(&id).copied())
    }

    /// Looks up a gate by name.
    pub fn find_gate(&self, name: &str) -> Option<GateId> {
        self.interner.get(name).and_then(|id| self.gate_names.get(&id).copied())
    }

    /// The name of a pin.
    pub fn pin_name(&self, id: PinId) -> &str {
        self.interner.resolve(self.pin(id).name)
    }

    /// The pin a graph node belongs to.
    pub fn pin_of_node(&self, node: NodeId) -> PinId {
        self.graph.node(node).pin()
    }

    /// The diagnostic location of a pin.
    pub fn location(&self, id: PinId) -> Location {
        Location::Pin(self.pin(id).name)
    }

    fn insert_pin(
        &mut self,
        name: Ident,
        gate: Option<GateId>,
        direction: PinDirection,
        role: PinRole,
        cap: f64,
    ) -> ChronosResult<PinId> {
        if self.pin_names.contains_key(&name) {
            return Err(InternalError::duplicate(DesignObject::Pin, self.interner.resolve(name)));
        }
        let id = PinId::from_index(self.pins.len());
        let node = self.graph.insert_node(id, role);
        self.pins.push(Some(Pin::new(name, gate, direction, node, cap)));
        self.pin_names.insert(name, id);
        Ok(id)
    }

    /// Inserts a primary input port.
    pub fn insert_primary_input(&mut self, name: &str) -> ChronosResult<PinId> {
        let ident = self.interner.get_or_intern(name);
        let id = self.insert_pin(ident, None, PinDirection::Output, PinRole::PrimaryInput, 0.0)?;
        self.primary_inputs.push(id);
        Ok(id)
    }

    /// Inserts a primary output port together with its required-time test.
    pub fn insert_primary_output(&mut self, name: &str) -> ChronosResult<PinId> {
        let ident = self.interner.get_or_intern(name);
        let id = self.insert_pin(ident, None, PinDirection::Input, PinRole::PrimaryOutput, 0.0)?;
        self.primary_outputs.push(id);
        let test = TestId::from_index(self.tests.len());
        self.tests.push(Some(Test::output(test, id)));
        self.pin_mut(id).test = Some(test);
        Ok(id)
    }

    /// Inserts a gate instance of library cell `cell`.
    pub fn insert_gate(&mut self, name: &str, cell: &str) -> ChronosResult<GateId> {
        let ident = self.interner.get_or_intern(name);
        if self.gate_names.contains_key(&ident) {
            return Err(InternalError::duplicate(DesignObject::Gate, name));
        }
        let id = GateId::from_index(self.gates.len());
        self.gates.push(Some(Gate {
            name: ident,
            cell: self.interner.get_or_intern(cell),
            pins: Vec::new(),
        }));
        self.gate_names.insert(ident, id);
        Ok(id)
    }

    /// Inserts pin `name` on `gate`, named `gate:name`, with input
    /// capacitance `cap`.
    pub fn insert_gate_pin(
        &mut self,
        gate: GateId,
        name: &str,
        direction: PinDirection,
        cap: f64,
    ) -> ChronosResult<PinId> {
        let ident = self.interner.intern_gate_pin(self.gate(gate).name, name);
        let id = self.insert_pin(ident, Some(gate), direction, PinRole::Internal, cap)?;
        slot_mut(&mut self.gates, gate.index(), "gate").pins.push(id);
        Ok(id)
    }

    /// Inserts an unconnected net.
    pub fn insert_net(&mut self, name: &str) -> ChronosResult<NetId> {
        let ident = self.interner.get_or_intern(name);
        if self.net_names.contains_key(&ident) {
            return Err(InternalError::duplicate(DesignObject::Net, name));
        }
        let id = NetId::from_index(self.nets.len());
        self.nets.push(Some(Net {
            name: ident,
            driver: None,
            sinks: Vec::new(),
            rctree: RcTree::new(),
        }));
        self.net_names.insert(ident, id);
        Ok(id)
    }

    /// Invalidates the clock tree if `node` is part of it.
    fn touch_clock_tree(&mut self, node: NodeId) {
        if self.graph.contains_node(node) && self.graph.node(node).clock_tree_idx().is_some() {
            self.clock_tree.reset(&mut self.graph);
        }
    }

    fn insert_edge(&mut self, from: NodeId, to: NodeId, edge_type: EdgeType, sense: TimingSense) -> EdgeId {
        self.touch_clock_tree(from);
        self.graph.insert_edge(from, to, edge_type, sense)
    }

    fn remove_edge(&mut self, edge: EdgeId) {
        self.touch_clock_tree(self.graph.edge(edge).from());
        self.graph.remove_edge(edge);
    }

    fn set_role(&mut self, node: NodeId, role: PinRole) {
        if self.graph.node(node).role() != role {
            self.touch_clock_tree(node);
            self.graph.node_mut(node).set_role(role);
            self.graph.clear_jumps();
        }
    }

    fn insert_net_edge(&mut self, net: NetId, driver: PinId, sink: PinId) {
        let (from, to) = (self.pin(driver).node, self.pin(sink).node);
        let edge = self.insert_edge(from, to, EdgeType::RcTree, TimingSense::PositiveUnate);
        self.graph.edge_mut(edge).set_net(Some(net));
    }

    /// Connects `pin` to `net`, moving it off its current net if needed.
    ///
    /// Fails if `pin` drives and the net already has a driver.
    pub fn connect(&mut self, pin: PinId, net: NetId) -> ChronosResult<()> {
        if self.pin(pin).net == Some(net) {
            return Ok(());
        }
        if self.pin(pin).direction == PinDirection::Output {
            if let Some(driver) = self.net(net).driver {
                return Err(InternalError::new(format!(
                    "net `{}` is already driven by `{}`",
                    self.interner.resolve(self.net(net).name),
                    self.pin_name(driver)
                )));
            }
        }
        self.disconnect(pin);

        match self.pin(pin).direction {
            PinDirection::Output => {
                self.net_mut(net).driver = Some(pin);
                for sink in self.net(net).sinks.clone() {
                    self.insert_net_edge(net, pin, sink);
                }
            }
            PinDirection::Input => {
                self.net_mut(net).sinks.push(pin);
                if let Some(driver) = self.net(net).driver {
                    self.insert_net_edge(net, driver, pin);
                }
            }
        }
        self.pin_mut(pin).net = Some(net);
        Ok(())
    }

    /// Disconnects `pin` from its net, removing the net's edges to or from it.
    pub fn disconnect(&mut self, pin: PinId) {
        let Some(net) = self.pin(pin).net else {
            return;
        };
        let node = self.graph.node(self.pin(pin).node);
        let edges: Vec<EdgeId> = match self.pin(pin).direction {
            PinDirection::Output => node.fanout().collect(),
            PinDirection::Input => node.fanin().collect(),
        };
        for e in edges {
            if self.graph.edge(e).net() == Some(net) {
                self.remove_edge(e);
            }
        }
        let cap = self.pin(pin).cap;
        let n = self.net_mut(net);
        if n.driver == Some(pin) {
            n.driver = None;
        }
        n.sinks.retain(|&p| p != pin);
        // the tap stays, without this pin's load
        if let Some(tap) = n.rctree.unseat_pin(pin) {
            for (el, rf) in crate::corner::split_trans() {
                n.rctree.add_cap(tap, el, rf, -cap[(el, rf)]);
            }
        }
        self.pin_mut(pin).net = None;
    }

    /// Mutable access to the parasitics of `net`.
    ///
    /// Build the taps and segments first, then seat pins with
    /// [`bind_rc_tap`](Self::bind_rc_tap), which adds the pin capacitance to
    /// the tap.
    pub fn rctree_mut(&mut self, net: NetId) -> &mut RcTree {
        &mut self.net_mut(net).rctree
    }

    /// Seats `pin` at tap `tap` of its net's parasitic tree.
    ///
    /// The tap is created if missing and receives the pin capacitance. The
    /// driver's tap becomes the root.
    pub fn bind_rc_tap(&mut self, net: NetId, tap: &str, pin: PinId) -> ChronosResult<()> {
        if self.pin(pin).net != Some(net) {
            return Err(InternalError::new(format!(
                "pin `{}` is not connected to net `{}`",
                self.pin_name(pin),
                self.interner.resolve(self.net(net).name)
            )));
        }
        let cap = self.pin(pin).cap;
        let is_driver = self.net(net).driver == Some(pin);
        let tree = &mut self.net_mut(net).rctree;
        let node = tree.insert_node(tap);
        tree.seat_pin(node, pin);
        for (el, rf) in crate::corner::split_trans() {
            tree.add_cap(node, el, rf, cap[(el, rf)]);
        }
        if is_driver {
            tree.set_root(node);
        }
        Ok(())
    }

    fn cell_pins(&self, from: PinId, to: PinId) -> ChronosResult<()> {
        let (a, b) = (self.pin(from), self.pin(to));
        match (a.gate, b.gate) {
            (Some(ga), Some(gb)) if ga == gb => Ok(()),
            _ => Err(InternalError::new(format!(
                "`{}` and `{}` are not pins of the same gate",
                self.pin_name(from),
                self.pin_name(to)
            ))),
        }
    }

    fn push_arc(&mut self, arc: TimingArc) -> TimingArcId {
        let id = TimingArcId::from_index(self.timing_arcs.len());
        self.timing_arcs.push(arc);
        id
    }

    /// Inserts a cell arc from `from` to `to` using `arc` for both splits.
    pub fn insert_cell_arc(&mut self, from: PinId, to: PinId, arc: TimingArc) -> ChronosResult<EdgeId> {
        self.insert_cell_arcs(from, to, arc.clone(), arc)
    }

    /// Inserts a cell arc with separate early and late models.
    ///
    /// Edge-triggered arcs make `from` a clock pin, which starts data paths.
    pub fn insert_cell_arcs(
        &mut self,
        from: PinId,
        to: PinId,
        early: TimingArc,
        late: TimingArc,
    ) -> ChronosResult<EdgeId> {
        self.cell_pins(from, to)?;
        if early.kind() != late.kind() || early.timing_sense() != late.timing_sense() {
            return Err(InternalError::new(format!(
                "early and late models of `{}` -> `{}` disagree",
                self.pin_name(from),
                self.pin_name(to)
            )));
        }
        if early.kind().is_constraint() {
            return Err(InternalError::new(format!(
                "`{}` -> `{}` is a timing check, not a cell arc",
                self.pin_name(from),
                self.pin_name(to)
            )));
        }
        let (kind, sense) = (early.kind(), early.timing_sense());
        let (u, v) = (self.pin(from).node, self.pin(to).node);
        if kind.trigger().is_some() {
            self.set_role(u, PinRole::ClockSink);
        }
        let early = self.push_arc(early);
        let late = self.push_arc(late);
        let edge = self.insert_edge(u, v, EdgeType::Combinational, sense);
        let e = self.graph.edge_mut(edge);
        e.set_trigger(kind.trigger());
        e.set_timing_arc(Split::Early, Some(early));
        e.set_timing_arc(Split::Late, Some(late));
        Ok(edge)
    }

    /// Inserts a setup/hold check of `constrained` against clock pin
    /// `related` and returns its test.
    pub fn insert_constraint_arc(
        &mut self,
        related: PinId,
        constrained: PinId,
        setup: TimingArc,
        hold: TimingArc,
    ) -> ChronosResult<TestId> {
        if !setup.kind().is_setup() || !hold.kind().is_hold() {
            return Err(InternalError::new(format!(
                "check `{}` -> `{}` needs a setup and a hold model",
                self.pin_name(related),
                self.pin_name(constrained)
            )));
        }
        let (setup_kind, hold_kind) = (setup.kind(), hold.kind());
        let (u, v) = (self.pin(related).node, self.pin(constrained).node);
        self.set_role(u, PinRole::ClockSink);
        let setup = self.push_arc(setup);
        let hold = self.push_arc(hold);
        let edge = self.insert_edge(u, v, EdgeType::Constraint, TimingSense::NonUnate);
        let e = self.graph.edge_mut(edge);
        e.set_timing_arc(Split::Early, Some(hold));
        e.set_timing_arc(Split::Late, Some(setup));

        let id = TestId::from_index(self.tests.len());
        let mut test = Test::sequential(id, constrained, related);
        test.set_timing_arc(Split::Late, setup, setup_kind);
        test.set_timing_arc(Split::Early, hold, hold_kind);
        test.set_edge(Some(edge));
        self.tests.push(Some(test));
        Ok(id)
    }

    fn remove_test(&mut self, id: TestId) {
        for heap in &mut self.heaps {
            for rf in Tran::ALL {
                heap.remove(&mut self.tests, id, rf);
            }
        }
        self.tests[id.index()] = None;
    }

    /// Removes a pin with its node, edges and tests.
    pub fn remove_pin(&mut self, pin: PinId) {
        self.disconnect(pin);
        let doomed: Vec<TestId> = self
            .tests()
            .filter(|t| t.constrained() == pin || t.related() == Some(pin))
            .map(Test::id)
            .collect();
        for test in doomed {
            self.remove_test(test);
        }

        let node = self.pin(pin).node;
        let fanin: Vec<NodeId> = self
            .graph
            .node(node)
            .fanin()
            .map(|e| self.graph.edge(e).from())
            .collect();
        self.touch_clock_tree(node);
        for from in fanin {
            self.touch_clock_tree(from);
        }
        self.graph.remove_node(node);

        let p = slot(&self.pins, pin.index(), "pin");
        let (name, gate) = (p.name, p.gate);
        if let Some(gate) = gate {
            slot_mut(&mut self.gates, gate.index(), "gate").pins.retain(|&q| q != pin);
        }
        if self.clock.is_some_and(|c| c.source == pin) {
            self.clock = None;
        }
        self.pin_names.remove(&name);
        self.primary_inputs.retain(|&q| q != pin);
        self.primary_outputs.retain(|&q| q != pin);
        self.pins[pin.index()] = None;
    }

    /// Removes a gate and all of its pins.
    pub fn remove_gate(&mut self, gate: GateId) {
        for pin in self.gate(gate).pins.clone() {
            self.remove_pin(pin);
        }
        let name = self.gate(gate).name;
        self.gate_names.remove(&name);
        self.gates[gate.index()] = None;
    }

    /// Disconnects every pin of a net and removes it.
    pub fn remove_net(&mut self, net: NetId) {
        let n = self.net(net);
        let pins: Vec<PinId> = n.driver.into_iter().chain(n.sinks.iter().copied()).collect();
        for pin in pins {
            self.disconnect(pin);
        }
        let name = self.net(net).name;
        self.net_names.remove(&name);
        self.nets[net.index()] = None;
    }

    fn primary_input(&self, pin: PinId) -> ChronosResult<()> {
        if self.primary_inputs.contains(&pin) {
            Ok(())
        } else {
            Err(InternalError::new(format!("`{}` is not a primary input", self.pin_name(pin))))
        }
    }

    fn primary_output(&self, pin: PinId) -> ChronosResult<TestId> {
        match self.pin(pin).test {
            Some(test) => Ok(test),
            None => Err(InternalError::new(format!("`{}` is not a primary output", self.pin_name(pin)))),
        }
    }

    /// Defines the clock on primary input `source`.
    pub fn set_clock(&mut self, name: &str, source: PinId, period: f64) -> ChronosResult<()> {
        self.primary_input(source)?;
        if period.is_nan() || period <= 0.0 {
            return Err(InternalError::new(format!("clock `{name}` has non-positive period {period}")));
        }
        self.clock = Some(Clock {
            name: self.interner.get_or_intern(name),
            source,
            period,
        });
        self.clock_tree.reset(&mut self.graph);
        Ok(())
    }

    /// Sets the arrival time of a primary input.
    pub fn set_at(&mut self, pin: PinId, el: Split, rf: Tran, at: f64) -> ChronosResult<()> {
        self.primary_input(pin)?;
        self.pin_mut(pin).input_at[(el, rf)] = Some(at);
        Ok(())
    }

    /// Sets the slew of a primary input.
    pub fn set_slew(&mut self, pin: PinId, el: Split, rf: Tran, slew: f64) -> ChronosResult<()> {
        self.primary_input(pin)?;
        self.pin_mut(pin).input_slew[(el, rf)] = Some(slew);
        Ok(())
    }

    /// Sets the required time of a primary output.
    pub fn set_rat(&mut self, pin: PinId, el: Split, rf: Tran, rat: f64) -> ChronosResult<()> {
        let test = self.primary_output(pin)?;
        slot_mut(&mut self.tests, test.index(), "test").set_user_rat(el, rf, Some(rat));
        Ok(())
    }

    /// Sets the external load of a primary output.
    pub fn set_load(&mut self, pin: PinId, el: Split, rf: Tran, cap: f64) -> ChronosResult<()> {
        self.primary_output(pin)?;
        let old = self.pin(pin).cap[(el, rf)];
        self.pin_mut(pin).cap[(el, rf)] = cap;
        if let Some(net) = self.pin(pin).net {
            let tree = &mut self.net_mut(net).rctree;
            if let Some(tap) = tree.node_of_pin(pin) {
                tree.add_cap(tap, el, rf, cap - old);
            }
        }
        Ok(())
    }

    fn resolve_port(&self, port: Ident) -> ChronosResult<PinId> {
        self.pin_names.get(&port).copied().ok_or_else(|| {
            InternalError::unknown(DesignObject::Port, self.interner.resolve(port))
        })
    }

    /// Applies boundary constraints, resolving port names against this
    /// circuit's pins.
    ///
    /// Output delays become required times relative to the clock, so a clock
    /// must be present when any output delay is given.
    pub fn apply_constraints(&mut self, constraints: &TimingConstraints) -> ChronosResult<()> {
        if let Some(clock) = &constraints.clock {
            let source = self.resolve_port(clock.port)?;
            let name = self.interner.resolve(clock.name).to_string();
            self.set_clock(&name, source, clock.period)?;
        }
        for delay in &constraints.input_delays {
            let pin = self.resolve_port(delay.port)?;
            for (el, rf) in crate::corner::split_trans().filter(|&(el, rf)| delay.applies_to(el, rf)) {
                self.set_at(pin, el, rf, delay.value)?;
            }
        }
        for slew in &constraints.input_transitions {
            let pin = self.resolve_port(slew.port)?;
            for (el, rf) in crate::corner::split_trans().filter(|&(el, rf)| slew.applies_to(el, rf)) {
                self.set_slew(pin, el, rf, slew.value)?;
            }
        }
        for delay in &constraints.output_delays {
            let pin = self.resolve_port(delay.port)?;
            let Some(clock) = &constraints.clock else {
                return Err(InternalError::new(format!(
                    "output delay on `{}` needs a clock",
                    self.pin_name(pin)
                )));
            };
            for (el, rf) in crate::corner::split_trans().filter(|&(el, rf)| delay.applies_to(el, rf)) {
                self.set_rat(pin, el, rf, clock.output_rat(el, delay.value))?;
            }
        }
        for load in &constraints.output_loads {
            let pin = self.resolve_port(load.port)?;
            for (el, rf) in crate::corner::split_trans() {
                self.set_load(pin, el, rf, load.cap)?;
            }
        }
        Ok(())
    }

    /// Arrival time at a pin from the last update.
    pub fn at(&self, pin: PinId, el: Split, rf: Tran) -> f64 {
        self.graph.node(self.pin(pin).node).at(el, rf)
    }

    /// Required time at a pin from the last update.
    pub fn rat(&self, pin: PinId, el: Split, rf: Tran) -> f64 {
        self.graph.node(self.pin(pin).node).rat(el, rf)
    }

    /// Slew at a pin from the last update.
    pub fn slew(&self, pin: PinId, el: Split, rf: Tran) -> f64 {
        self.graph.node(self.pin(pin).node).slew(el, rf)
    }

    /// Pre-CPPR slack at a pin from the last update.
    pub fn slack(&self, pin: PinId, el: Split, rf: Tran) -> f64 {
        self.graph.node(self.pin(pin).node).slack(el, rf)
    }

    /// A path query for the `(el, rf)` endpoint of `test`.
    pub fn cppr_query(&self, test: TestId, el: Split, rf: Tran) -> CpprQuery<'_> {
        let t = self.test(test);
        let endpoint = self.pin(t.constrained()).node;
        let capturer = t.related().map(|p| self.pin(p).node);
        let query = CpprQuery::new(
            &self.graph,
            &self.clock_tree,
            t,
            endpoint,
            capturer,
            el,
            rf,
            self.location(t.constrained()),
        );
        match t.related() {
            Some(clock_pin) => query.capturer_name(self.pin_name(clock_pin)),
            None => query,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing_arc::ArcKind;

    fn inverter(c: &mut Circuit, name: &str) -> (PinId, PinId) {
        let g = c.insert_gate(name, "INV_X1").unwrap();
        let a = c.insert_gate_pin(g, "A", PinDirection::Input, 1.0).unwrap();
        let y = c.insert_gate_pin(g, "Y", PinDirection::Output, 0.0).unwrap();
        let arc = TimingArc::constant(TimingSense::NegativeUnate, ArcKind::Combinational, 2.0, 0.5);
        c.insert_cell_arc(a, y, arc).unwrap();
        (a, y)
    }

    #[test]
    fn names_resolve() {
        let mut c = Circuit::new();
        let pi = c.insert_primary_input("in").unwrap();
        let (a, _) = inverter(&mut c, "u1");
        assert_eq!(c.find_pin("in"), Some(pi));
        assert_eq!(c.find_pin("u1:A"), Some(a));
        assert_eq!(c.pin_name(a), "u1:A");
        assert!(c.find_gate("u1").is_some());
        assert!(c.find_pin("u1:Z").is_none());
        assert!(c.insert_primary_input("in").is_err());
        assert!(c.insert_gate("u1", "BUF").is_err());
    }

    #[test]
    fn connect_builds_net_edges() {
        let mut c = Circuit::new();
        let pi = c.insert_primary_input("in").unwrap();
        let (a1, _) = inverter(&mut c, "u1");
        let (a2, _) = inverter(&mut c, "u2");
        let n = c.insert_net("n1").unwrap();
        c.connect(a1, n).unwrap();
        assert_eq!(c.graph().num_edges(), 2);
        c.connect(pi, n).unwrap();
        c.connect(a2, n).unwrap();
        assert_eq!(c.graph().num_edges(), 4);
        assert_eq!(c.net(n).driver(), Some(pi));
        assert_eq!(c.net(n).sinks(), &[a1, a2]);

        let other = c.insert_primary_input("in2").unwrap();
        assert!(c.connect(other, n).is_err());

        c.disconnect(a1);
        assert_eq!(c.graph().num_edges(), 3);
        assert_eq!(c.pin(a1).net(), None);
        c.remove_net(n);
        assert_eq!(c.graph().num_edges(), 2);
        assert_eq!(c.pin(pi).net(), None);
    }

    #[test]
    fn cell_arcs_must_stay_inside_a_gate() {
        let mut c = Circuit::new();
        let (a, _) = inverter(&mut c, "u1");
        let (_, y) = inverter(&mut c, "u2");
        let arc = TimingArc::constant(TimingSense::PositiveUnate, ArcKind::Combinational, 1.0, 0.1);
        assert!(c.insert_cell_arc(a, y, arc).is_err());
    }

    #[test]
    fn constraint_arc_creates_test() {
        let mut c = Circuit::new();
        let g = c.insert_gate("ff", "DFF").unwrap();
        let ck = c.insert_gate_pin(g, "CK", PinDirection::Input, 1.0).unwrap();
        let d = c.insert_gate_pin(g, "D", PinDirection::Input, 1.0).unwrap();
        let setup = TimingArc::constant_check(ArcKind::SetupRising, 0.5);
        let hold = TimingArc::constant_check(ArcKind::HoldRising, 0.2);
        assert!(c.insert_constraint_arc(ck, d, hold.clone(), setup.clone()).is_err());
        let t = c.insert_constraint_arc(ck, d, setup, hold).unwrap();
        let test = c.test(t);
        assert_eq!(test.related(), Some(ck));
        assert_eq!(test.capture_tran(Split::Late), Some(Tran::Rise));
        assert_eq!(c.graph().node(c.pin(ck).node()).role(), PinRole::ClockSink);
        assert_eq!(c.tests_at(d).count(), 1);

        c.remove_pin(ck);
        assert_eq!(c.num_tests(), 0);
        assert_eq!(c.gate(g).pins(), &[d]);
    }

    #[test]
    fn primary_output_has_rat_test() {
        let mut c = Circuit::new();
        let po = c.insert_primary_output("out").unwrap();
        let pi = c.insert_primary_input("in").unwrap();
        c.set_rat(po, Split::Late, Tran::Rise, 5.0).unwrap();
        let t = c.pin(po).test().unwrap();
        assert_eq!(c.test(t).user_rat(Split::Late, Tran::Rise), Some(5.0));
        assert!(c.set_rat(pi, Split::Late, Tran::Rise, 5.0).is_err());
        assert!(c.set_at(po, Split::Late, Tran::Rise, 1.0).is_err());
        c.set_at(pi, Split::Late, Tran::Rise, 1.0).unwrap();
        assert_eq!(c.pin(pi).input_at(Split::Late, Tran::Rise), Some(1.0));
    }

    #[test]
    fn rc_taps_carry_pin_caps() {
        let mut c = Circuit::new();
        let pi = c.insert_primary_input("in").unwrap();
        let (a, _) = inverter(&mut c, "u1");
        let n = c.insert_net("n1").unwrap();
        c.connect(pi, n).unwrap();
        c.connect(a, n).unwrap();
        c.rctree_mut(n).insert_segment("n1:1", "n1:2", 2.0);
        c.bind_rc_tap(n, "n1:1", pi).unwrap();
        c.bind_rc_tap(n, "n1:2", a).unwrap();
        let tree = c.rctree_mut(n);
        let root = tree.root().unwrap();
        assert_eq!(tree.load(root, Split::Late, Tran::Rise), 1.0);
        let po = c.insert_primary_output("out").unwrap();
        assert!(c.bind_rc_tap(n, "n1:3", po).is_err());
    }

    #[test]
    fn disconnect_releases_the_tap_load() {
        let mut c = Circuit::new();
        let pi = c.insert_primary_input("in").unwrap();
        let (a1, _) = inverter(&mut c, "u1");
        let (a2, _) = inverter(&mut c, "u2");
        let n = c.insert_net("n1").unwrap();
        for pin in [pi, a1, a2] {
            c.connect(pin, n).unwrap();
        }
        // shared 1 ohm trunk, then 2 ohm to a1 and 3 ohm to a2
        let tree = c.rctree_mut(n);
        tree.insert_segment("n1:1", "n1:m", 1.0);
        tree.insert_segment("n1:m", "n1:2", 2.0);
        tree.insert_segment("n1:m", "n1:3", 3.0);
        c.bind_rc_tap(n, "n1:1", pi).unwrap();
        c.bind_rc_tap(n, "n1:2", a1).unwrap();
        c.bind_rc_tap(n, "n1:3", a2).unwrap();
        let tap1 = c.rctree_mut(n).node_of_pin(a1).unwrap();
        let tap2 = c.rctree_mut(n).node_of_pin(a2).unwrap();
        assert_eq!(c.rctree_mut(n).delay(tap1, Split::Late, Tran::Rise), 1.0 * 2.0 + 2.0 * 1.0);

        c.disconnect(a2);
        let tree = c.rctree_mut(n);
        assert!(!tree.is_rc_timing_updated());
        assert_eq!(tree.node_of_pin(a2), None);
        assert_eq!(tree.node(tap2).cap(Split::Late, Tran::Rise), 0.0);
        assert_eq!(tree.total_cap(Split::Early, Tran::Fall), 1.0);
        assert_eq!(tree.delay(tap1, Split::Late, Tran::Rise), 1.0 * 1.0 + 2.0 * 1.0);
        let root = tree.root().unwrap();
        assert_eq!(tree.load(root, Split::Late, Tran::Rise), 1.0);

        // reconnecting does not inherit the old seat
        c.connect(a2, n).unwrap();
        assert_eq!(c.rctree_mut(n).node_of_pin(a2), None);
        c.bind_rc_tap(n, "n1:3", a2).unwrap();
        let root = c.rctree_mut(n).root().unwrap();
        assert_eq!(c.rctree_mut(n).load(root, Split::Late, Tran::Rise), 2.0);
    }

    #[test]
    fn apply_constraints_resolves_ports() {
        use crate::constraints::{ClockConstraint, IoDelay, OutputLoad};
        let mut c = Circuit::new();
        let clk = c.insert_primary_input("clk").unwrap();
        let din = c.insert_primary_input("din").unwrap();
        let dout = c.insert_primary_output("dout").unwrap();
        let mut tc = TimingConstraints::new();
        let i = c.interner();
        tc.clock = Some(ClockConstraint {
            name: i.get_or_intern("core"),
            port: i.get_or_intern("clk"),
            period: 10.0,
        });
        tc.input_delays.push(IoDelay::all(i.get_or_intern("din"), 1.5));
        tc.output_delays.push(IoDelay::all(i.get_or_intern("dout"), 2.0));
        tc.output_loads.push(OutputLoad {
            port: i.get_or_intern("dout"),
            cap: 4.0,
        });
        c.apply_constraints(&tc).unwrap();

        assert_eq!(c.clock().map(|k| k.source), Some(clk));
        assert_eq!(c.pin(din).input_at(Split::Early, Tran::Fall), Some(1.5));
        let t = c.pin(dout).test().unwrap();
        assert_eq!(c.test(t).user_rat(Split::Late, Tran::Rise), Some(8.0));
        assert_eq!(c.test(t).user_rat(Split::Early, Tran::Rise), Some(-2.0));
        assert_eq!(c.pin(dout).cap(Split::Late, Tran::Fall), 4.0);

        let mut bad = TimingConstraints::new();
        bad.input_delays.push(IoDelay::all(c.interner().get_or_intern("nope"), 1.0));
        assert!(c.apply_constraints(&bad).is_err());
    }
}
