//! The timer: a circuit plus the configuration and diagnostics it is
//! analyzed with.
//!
//! Editing goes through [`Timer::circuit_mut`], which marks the timing
//! stale. Every report brings the timing up to date first, so callers never
//! see values from before an edit.

use crate::circuit::Circuit;
use crate::corner::{Split, Tran};
use crate::cppr::{CpprScratch, Path};
use crate::errors;
use crate::ids::{NodeId, PinId, TestId};
use crate::propagate::propagate;
use chronos_common::{ChronosResult, DesignObject, InternalError};
use chronos_config::{ConfigError, TimerConfig};
use chronos_diagnostics::{DiagnosticRenderer, DiagnosticSink, Location};
use rayon::prelude::*;
use std::path::Path as FsPath;

/// Errors from setting up a [`Timer`].
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The timer could not be built from the configuration.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Slack at a pin before and after pessimism removal.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct PinSlack {
    /// Slack from the propagated arrival and required times.
    pub pre_cppr: f64,
    /// Slack of the worst path into the pin's checks with pessimism
    /// removed. Pins without checks report their pre-CPPR slack.
    pub post_cppr: f64,
}

/// Static timing analysis over one circuit.
pub struct Timer {
    circuit: Circuit,
    config: TimerConfig,
    sink: DiagnosticSink,
    pool: Option<rayon::ThreadPool>,
    dirty: bool,
}

impl Timer {
    /// Creates a timer, building a dedicated thread pool when the
    /// configuration fixes the number of threads.
    pub fn new(circuit: Circuit, config: TimerConfig) -> ChronosResult<Self> {
        let pool = match config.analysis.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| InternalError::new(format!("cannot build thread pool: {e}")))?,
            ),
            None => None,
        };
        Ok(Self {
            circuit,
            config,
            sink: DiagnosticSink::new(),
            pool,
            dirty: true,
        })
    }

    /// Creates a timer configured by the `chronos.toml` in `design_dir`, or
    /// with defaults if there is none.
    pub fn from_design_dir(circuit: Circuit, design_dir: &FsPath) -> Result<Self, TimerError> {
        let config = chronos_config::load_config(design_dir)?;
        Ok(Self::new(circuit, config)?)
    }

    /// The analyzed circuit.
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// Mutable access to the circuit. Timing is recomputed by the next
    /// report.
    pub fn circuit_mut(&mut self) -> &mut Circuit {
        self.dirty = true;
        &mut self.circuit
    }

    /// The analysis configuration.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Diagnostics emitted so far.
    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// Renders every diagnostic emitted so far, resolving design object
    /// names through the circuit's interner.
    pub fn render_diagnostics(&self, renderer: &dyn DiagnosticRenderer) -> String {
        self.sink
            .diagnostics()
            .iter()
            .map(|diag| renderer.render(diag, self.circuit.interner()))
            .collect()
    }

    /// Returns `true` if the circuit changed since the last update.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Brings the timing up to date.
    ///
    /// A combinational loop is reported as `T107` and returned as an error.
    /// Sequential checks without a clock and failing checks are reported as
    /// warnings.
    pub fn update_timing(&mut self) -> ChronosResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Err(e) = propagate(&mut self.circuit) {
            self.sink.emit(errors::error_combinational_loop(&e.message));
            return Err(e);
        }
        self.dirty = false;

        let c = &self.circuit;
        if c.clock().is_none() {
            let checks = c.tests().filter(|t| t.is_sequential()).count();
            if checks > 0 {
                self.sink.emit(errors::warning_no_clock(checks));
            }
        }
        for el in Split::ALL {
            let Some((test, rf)) = c.endpoint_heap(el).top() else {
                continue;
            };
            let t = c.test(test);
            let slack = t.slack(el, rf);
            if slack < 0.0 {
                let kind = t.path_kind(el).name();
                self.sink
                    .emit(errors::warning_timing_not_met(kind, slack, c.location(t.constrained())));
            }
        }
        Ok(())
    }

    fn find_pin(&self, name: &str) -> ChronosResult<PinId> {
        self.circuit
            .find_pin(name)
            .ok_or_else(|| InternalError::unknown(DesignObject::Pin, name))
    }

    /// Arrival time at a pin.
    pub fn report_at(&mut self, pin: &str, el: Split, rf: Tran) -> ChronosResult<f64> {
        self.update_timing()?;
        let pin = self.find_pin(pin)?;
        Ok(self.circuit.at(pin, el, rf))
    }

    /// Required time at a pin.
    pub fn report_rat(&mut self, pin: &str, el: Split, rf: Tran) -> ChronosResult<f64> {
        self.update_timing()?;
        let pin = self.find_pin(pin)?;
        Ok(self.circuit.rat(pin, el, rf))
    }

    /// Slew at a pin.
    pub fn report_slew(&mut self, pin: &str, el: Split, rf: Tran) -> ChronosResult<f64> {
        self.update_timing()?;
        let pin = self.find_pin(pin)?;
        Ok(self.circuit.slew(pin, el, rf))
    }

    /// Slack at a pin before and after pessimism removal.
    pub fn report_slack(&mut self, pin: &str, el: Split, rf: Tran) -> ChronosResult<PinSlack> {
        self.update_timing()?;
        let pin = self.find_pin(pin)?;
        let c = &self.circuit;
        let pre_cppr = c.slack(pin, el, rf);
        let mut scratch = CpprScratch::default();
        let post_cppr = c
            .tests_at(pin)
            .map(|t| {
                c.cppr_query(t.id(), el, rf)
                    .cppr(self.config.analysis.cppr)
                    .get_slack(&mut scratch, 1, &self.sink)
            })
            .min_by(f64::total_cmp)
            .unwrap_or(pre_cppr);
        Ok(PinSlack { pre_cppr, post_cppr })
    }

    /// The `k` worst paths across all endpoints, worst first.
    ///
    /// With `through`, only paths through that pin are considered. Paths
    /// with slack above the configured cutoff are dropped.
    pub fn report_worst_paths(&mut self, k: usize, through: Option<&str>) -> ChronosResult<Vec<Path>> {
        self.update_timing()?;
        if k == 0 {
            self.sink.emit(errors::error_zero_paths(Location::Design));
            return Ok(Vec::new());
        }
        let through = match through {
            Some(name) => Some((self.circuit.pin(self.find_pin(name)?).node(), name)),
            None => None,
        };

        let c = &self.circuit;
        let cutoff = self.config.report.cutoff.unwrap_or(f64::INFINITY);
        let mut endpoints: Vec<(TestId, Split, Tran)> = Vec::new();
        for el in Split::ALL {
            let heap = c.endpoint_heap(el);
            for (test, rf) in heap.worst(&c.tests, heap.len()) {
                // post-CPPR slack is never below pre-CPPR slack
                if c.test(test).slack(el, rf) <= cutoff {
                    endpoints.push((test, el, rf));
                }
            }
        }
        if let Some((node, name)) = through {
            let cone = fanout_cone(c, node);
            endpoints.retain(|&(test, _, _)| cone[c.pin(c.test(test).constrained()).node().index()]);
            if endpoints.is_empty() {
                let location = c.location(c.pin_of_node(node));
                self.sink.emit(errors::warning_unreachable_through(name, location));
                return Ok(Vec::new());
            }
        }

        let (sink, cppr) = (&self.sink, self.config.analysis.cppr);
        let run = || {
            endpoints
                .par_iter()
                .map_init(CpprScratch::default, |scratch, &(test, el, rf)| {
                    let mut query = c.cppr_query(test, el, rf).cppr(cppr).cutoff(cutoff);
                    if let Some((node, name)) = through {
                        query = query.through(node, name);
                    }
                    query.report_worst_paths(scratch, k, sink)
                })
                .flatten()
                .collect::<Vec<Path>>()
        };
        let mut paths = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        paths.sort_by(|a, b| {
            a.slack
                .total_cmp(&b.slack)
                .then_with(|| a.test.cmp(&b.test))
                .then_with(|| a.split.index().cmp(&b.split.index()))
                .then_with(|| a.tran.index().cmp(&b.tran.index()))
        });
        paths.truncate(k);
        Ok(paths)
    }

    /// The configured number of worst paths.
    pub fn report_timing(&mut self) -> ChronosResult<Vec<Path>> {
        let k = self.config.report.num_paths;
        self.report_worst_paths(k, None)
    }

    /// Post-CPPR slacks of the `k` worst paths, worst first.
    pub fn report_worst_slack(&mut self, k: usize) -> ChronosResult<Vec<f64>> {
        Ok(self
            .report_worst_paths(k, None)?
            .into_iter()
            .map(|p| p.slack)
            .collect())
    }

    fn endpoint_slacks(&self, el: Option<Split>, rf: Option<Tran>) -> impl Iterator<Item = f64> + '_ {
        let c = &self.circuit;
        Split::ALL
            .into_iter()
            .filter(move |&s| el.map_or(true, |e| e == s))
            .flat_map(move |s| {
                let heap = c.endpoint_heap(s);
                heap.worst(&c.tests, heap.len())
                    .into_iter()
                    .filter(move |&(_, t)| rf.map_or(true, |r| r == t))
                    .map(move |(test, t)| c.test(test).slack(s, t))
            })
    }

    /// Total negative pre-CPPR slack over the endpoints of the given split
    /// and transition, or of all of them.
    pub fn report_tns(&mut self, el: Option<Split>, rf: Option<Tran>) -> ChronosResult<f64> {
        self.update_timing()?;
        Ok(self.endpoint_slacks(el, rf).map(|s| s.min(0.0)).sum())
    }

    /// Worst negative pre-CPPR slack, or zero when every endpoint passes.
    /// `None` when no endpoint is constrained.
    pub fn report_wns(&mut self, el: Option<Split>, rf: Option<Tran>) -> ChronosResult<Option<f64>> {
        self.update_timing()?;
        Ok(self
            .endpoint_slacks(el, rf)
            .min_by(f64::total_cmp)
            .map(|s| s.min(0.0)))
    }
}

/// Marks the non-constraint fanout cone of `root`, `root` included.
fn fanout_cone(circuit: &Circuit, root: NodeId) -> Vec<bool> {
    let graph = circuit.graph();
    let mut seen = vec![false; graph.node_capacity()];
    seen[root.index()] = true;
    let mut stack = vec![root];
    while let Some(v) = stack.pop() {
        for e in graph.node(v).fanout() {
            let edge = graph.edge(e);
            if !edge.is_constraint() && !seen[edge.to().index()] {
                seen[edge.to().index()] = true;
                stack.push(edge.to());
            }
        }
    }
    seen
}
