//! Tick driver.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tracing::{debug, debug_span, trace, warn};

use crate::circuit::{
    ApparentEMFState, CircuitGraph, ComponentId, LineId, PinMap, PinState, Side,
};
use crate::components::Lifecycle;
use crate::error::{CographError, Result};
use crate::REFERENCE_TEMPERATURE_C;

use super::reconcile::{reconcile, EndpointAssertion, Reconciled};
use super::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, MIN_RESISTANCE, OPEN_CIRCUIT_RESISTANCE,
};

/// Configuration for the tick driver.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Maximum relaxation iterations per tick.
    pub max_iterations: usize,
    /// Agreement tolerance, in volts for potentials and amps for currents.
    pub tolerance: f64,
    /// Baseline temperature handed to components at definition.
    pub ambient_temp_c: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            ambient_temp_c: REFERENCE_TEMPERATURE_C,
        }
    }
}

impl SimulatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum relaxation iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the agreement tolerance.
    ///
    /// Looser tolerances converge in fewer iterations; reactive circuits
    /// relax geometrically, so each decade of tolerance costs a few
    /// iterations.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the ambient temperature in °C.
    pub fn with_ambient_temp(mut self, ambient_temp_c: f64) -> Self {
        self.ambient_temp_c = ambient_temp_c;
        self
    }

    /// Check that the configuration can drive a tick.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(CographError::invalid_param(
                "max_iterations must be at least 1",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(CographError::invalid_param(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        if !self.ambient_temp_c.is_finite() {
            return Err(CographError::invalid_param(
                "ambient temperature must be finite",
            ));
        }
        Ok(())
    }
}

/// Summary of a committed tick.
#[derive(Debug, Clone)]
pub struct TickResult {
    /// Tick number just committed
    pub tick: u64,
    /// Relaxation iterations used
    pub iterations: usize,
    /// Largest line mismatch in the final iteration
    pub residual: f64,
    /// Committed state of every line, in definition order
    pub edges: Vec<(String, ApparentEMFState)>,
    /// Components whose transfer function failed; their pins were treated
    /// as open for the tick
    pub faults: Vec<(String, CographError)>,
}

/// The lines attached at one pin.
#[derive(Debug, Clone)]
pub(crate) struct PinLines {
    pub(crate) pin: String,
    pub(crate) lines: Vec<(LineId, Side)>,
}

/// Attached lines per component pin, resolved through the edge index.
#[derive(Debug, Clone)]
pub(crate) struct Topology {
    pins: Vec<Vec<PinLines>>,
}

impl Topology {
    pub(crate) fn build(graph: &CircuitGraph) -> Self {
        let pins = graph
            .components
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let id = ComponentId(index);
                entry
                    .node
                    .pins()
                    .iter()
                    .filter_map(|(pin, slot)| {
                        let lines: Vec<(LineId, Side)> = slot
                            .lines
                            .keys()
                            .filter_map(|edge| graph.edge_index.get(edge))
                            .filter_map(|&line| {
                                let edge = &graph.lines[line.0].edge;
                                if !edge.is_attached() {
                                    return None;
                                }
                                if edge.u().component == id && edge.u().pin == pin {
                                    Some((line, Side::U))
                                } else if edge.v().component == id && edge.v().pin == pin {
                                    Some((line, Side::V))
                                } else {
                                    None
                                }
                            })
                            .collect();
                        (!lines.is_empty()).then(|| PinLines {
                            pin: pin.to_string(),
                            lines,
                        })
                    })
                    .collect()
            })
            .collect();
        Self { pins }
    }

    /// Connected pins of a component.
    pub(crate) fn pins(&self, id: ComponentId) -> &[PinLines] {
        self.pins.get(id.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lines attached at one pin.
    pub(crate) fn lines_on(&self, id: ComponentId, pin: &str) -> &[(LineId, Side)] {
        self.pins(id)
            .iter()
            .find(|p| p.pin == pin)
            .map(|p| p.lines.as_slice())
            .unwrap_or(&[])
    }
}

impl CircuitGraph {
    /// Advance the simulation by one tick.
    ///
    /// On success the new line states are committed and the tick counter
    /// increases by one. On [`CographError::ConvergenceFailure`] nothing is
    /// committed: line states, component state and the tick counter are
    /// left as they were, so the tick can be retried after
    /// [`CircuitGraph::set_config`].
    pub fn advance_tick(&mut self) -> Result<TickResult> {
        let tick = self.tick + 1;
        let span = debug_span!("advance_tick", tick);
        let _enter = span.enter();

        let mut activated = Vec::new();
        let mut active = Vec::new();
        for (index, entry) in self.components.iter_mut().enumerate() {
            let was_active = entry.node.lifecycle() == Lifecycle::Active;
            if entry.node.activate() {
                if !was_active {
                    activated.push(ComponentId(index));
                }
                active.push(ComponentId(index));
            }
        }
        let topology = Topology::build(self);
        self.warn_divergent_pins(&topology, &active);

        let attached: Vec<LineId> = (0..self.lines.len())
            .map(LineId)
            .filter(|line| self.lines[line.0].edge.is_attached())
            .collect();

        let mut states = self.committed.clone();
        let mut outgoing: Vec<Option<PinMap>> = vec![None; self.components.len()];
        let mut faults = Vec::new();
        self.evaluate(&topology, &states, tick, &active, &mut outgoing, &mut faults);

        let mut residual = 0.0f64;
        let mut worst: Option<LineId> = None;
        for iteration in 1..=self.config.max_iterations {
            let results: Vec<(LineId, Reconciled)> = attached
                .iter()
                .map(|&line| (line, self.reconcile_line(line, &topology, &outgoing, &states)))
                .collect();

            residual = 0.0;
            worst = None;
            let mut relaxed = Vec::new();
            for (line, result) in results {
                if result.mismatch.is_nan() || result.mismatch > residual {
                    residual = result.mismatch;
                    worst = Some(line);
                }
                states[line.0] = result.state;
                if !result.agreed {
                    relaxed.push(line);
                }
            }
            trace!(iteration, residual, relaxed = relaxed.len(), "relaxation pass");

            if relaxed.is_empty() {
                return Ok(self.commit(tick, iteration, residual, states, outgoing, faults, &topology, &active));
            }

            let affected: BTreeSet<ComponentId> = relaxed
                .iter()
                .flat_map(|line| {
                    let edge = &self.lines[line.0].edge;
                    [edge.u().component, edge.v().component]
                })
                .collect();
            let affected: Vec<ComponentId> = affected.into_iter().collect();
            self.evaluate(&topology, &states, tick, &affected, &mut outgoing, &mut faults);
        }

        let edge = worst
            .map(|line| self.lines[line.0].label.clone())
            .unwrap_or_default();
        warn!(tick, residual, %edge, "tick did not converge");
        for id in activated {
            self.components[id.0].node.revert_activation();
        }
        Err(CographError::convergence_failure(
            tick,
            self.config.max_iterations,
            residual,
            edge,
        ))
    }

    /// Advance `ticks` ticks, stopping at the first error.
    pub fn run(&mut self, ticks: u64) -> Result<Vec<TickResult>> {
        (0..ticks).map(|_| self.advance_tick()).collect()
    }

    /// Pin view of a component against the given line states.
    ///
    /// Potential is the mean of the attached line ends, current is the sum
    /// flowing into the component and properties combine in parallel.
    pub(crate) fn gather(
        &self,
        topology: &Topology,
        id: ComponentId,
        states: &[ApparentEMFState],
    ) -> PinMap {
        topology
            .pins(id)
            .iter()
            .map(|pin| {
                let mut potential = 0.0;
                let mut current = 0.0;
                for &(line, side) in &pin.lines {
                    let edge = &self.lines[line.0].edge;
                    potential += edge.potential_at(&states[line.0], side);
                    current += edge.current_into(&states[line.0], side);
                }
                let properties = pin
                    .lines
                    .iter()
                    .map(|&(line, _)| *self.lines[line.0].edge.conductor())
                    .reduce(|acc, p| acc.parallel(&p))
                    .unwrap_or_default();
                let emf = ApparentEMFState::new(potential / pin.lines.len() as f64, current);
                (pin.pin.clone(), PinState::new(emf, properties))
            })
            .collect()
    }

    /// Run the transfer functions of `ids` in parallel.
    fn evaluate(
        &self,
        topology: &Topology,
        states: &[ApparentEMFState],
        tick: u64,
        ids: &[ComponentId],
        outgoing: &mut [Option<PinMap>],
        faults: &mut Vec<(String, CographError)>,
    ) {
        let results: Vec<(ComponentId, Result<PinMap>)> = ids
            .par_iter()
            .map(|&id| {
                let incoming = self.gather(topology, id, states);
                (id, self.components[id.0].node.on_tdelta(tick, &incoming))
            })
            .collect();

        for (id, result) in results {
            match result {
                Ok(assertions) => outgoing[id.0] = Some(assertions),
                Err(err) => {
                    let label = self.component_label(id).to_string();
                    warn!(tick, component = %label, error = %err, "transfer function failed");
                    outgoing[id.0] = None;
                    if !faults.iter().any(|(l, _)| *l == label) {
                        let err = err.with_component(label.as_str());
                        faults.push((label, err));
                    }
                }
            }
        }
    }

    fn reconcile_line(
        &self,
        line: LineId,
        topology: &Topology,
        outgoing: &[Option<PinMap>],
        states: &[ApparentEMFState],
    ) -> Reconciled {
        let edge = &self.lines[line.0].edge;
        let a = self.endpoint_assertion(line, Side::U, topology, outgoing, states);
        let b = self.endpoint_assertion(line, Side::V, topology, outgoing, states);
        reconcile(&a, &b, edge.conductor().resistance_ohms, self.config.tolerance)
    }

    /// The assertion one end of `line` makes about that line alone.
    ///
    /// A pin's assertion covers all of its lines. Every other line at the pin
    /// is modelled by the Thevenin source its far end presents through the
    /// conductor, and the pin's assertion is reduced by what those lines
    /// draw. This line is left with the remaining current behind the pin's
    /// impedance in parallel with the other lines.
    fn endpoint_assertion(
        &self,
        line: LineId,
        side: Side,
        topology: &Topology,
        outgoing: &[Option<PinMap>],
        states: &[ApparentEMFState],
    ) -> EndpointAssertion {
        let end = self.lines[line.0].edge.end(side);
        let Some(pin) = asserted_pin(outgoing, end.component, &end.pin) else {
            return self.base_assertion(line, side, topology, outgoing, states);
        };

        let potential = pin.potential();
        let mut current = pin.current();
        let mut conductance = 0.0;
        for &(other, other_side) in topology.lines_on(end.component, &end.pin) {
            if other == line {
                continue;
            }
            let edge = &self.lines[other.0].edge;
            let far = self.base_assertion(other, other_side.opposite(), topology, outgoing, states);
            let series = far.impedance + edge.conductor().resistance_ohms;
            if series < MIN_RESISTANCE {
                current -= edge.current_into(&states[other.0], other_side);
                continue;
            }
            let g = 1.0 / series;
            current -= g * (far.potential - far.impedance * far.current - potential);
            conductance += g;
        }

        let impedance = pin.impedance() / (1.0 + pin.impedance() * conductance);
        EndpointAssertion::new(potential, current, impedance)
    }

    /// An end's assertion with the other lines at its pin held at their
    /// last known currents. Ends without an assertion are open.
    fn base_assertion(
        &self,
        line: LineId,
        side: Side,
        topology: &Topology,
        outgoing: &[Option<PinMap>],
        states: &[ApparentEMFState],
    ) -> EndpointAssertion {
        let edge = &self.lines[line.0].edge;
        let end = edge.end(side);
        match asserted_pin(outgoing, end.component, &end.pin) {
            Some(pin) => {
                let others: f64 = topology
                    .lines_on(end.component, &end.pin)
                    .iter()
                    .filter(|(other, _)| *other != line)
                    .map(|&(other, other_side)| {
                        self.lines[other.0]
                            .edge
                            .current_into(&states[other.0], other_side)
                    })
                    .sum();
                EndpointAssertion::new(pin.potential(), pin.current() - others, pin.impedance())
            }
            None => EndpointAssertion::new(
                edge.potential_at(&states[line.0], side),
                0.0,
                OPEN_CIRCUIT_RESISTANCE,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &mut self,
        tick: u64,
        iterations: usize,
        residual: f64,
        states: Vec<ApparentEMFState>,
        outgoing: Vec<Option<PinMap>>,
        faults: Vec<(String, CographError)>,
        topology: &Topology,
        active: &[ComponentId],
    ) -> TickResult {
        self.committed = states;
        let views: Vec<(ComponentId, PinMap)> = active
            .iter()
            .map(|&id| (id, self.gather(topology, id, &self.committed)))
            .collect();
        for (id, view) in views {
            self.components[id.0].node.on_commit(tick, &view);
        }
        self.asserted = outgoing;
        self.tick = tick;
        debug!(iterations, residual, "tick committed");

        TickResult {
            tick,
            iterations,
            residual,
            edges: self
                .lines
                .iter()
                .zip(&self.committed)
                .map(|(entry, state)| (entry.label.clone(), *state))
                .collect(),
            faults,
        }
    }

    /// Log pins whose attached lines report different potentials.
    fn warn_divergent_pins(&self, topology: &Topology, active: &[ComponentId]) {
        for &id in active {
            for pin in topology.pins(id).iter().filter(|p| p.lines.len() > 1) {
                let (low, high) = pin.lines.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(low, high), &(line, side)| {
                        let v = self.lines[line.0]
                            .edge
                            .potential_at(&self.committed[line.0], side);
                        (low.min(v), high.max(v))
                    },
                );
                if high - low > self.config.tolerance {
                    warn!(
                        component = self.component_label(id),
                        pin = %pin.pin,
                        spread = high - low,
                        "lines at pin disagree on potential, using the mean"
                    );
                }
            }
        }
    }
}

/// The outgoing assertion of `component` at `pin`, if it produced one.
fn asserted_pin<'a>(
    outgoing: &'a [Option<PinMap>],
    component: ComponentId,
    pin: &str,
) -> Option<&'a PinState> {
    outgoing
        .get(component.0)
        .and_then(Option::as_ref)
        .and_then(|pins| pins.get(pin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::PhysicalProperties;
    use crate::components::ComponentNode;
    use approx::assert_relative_eq;

    fn ohm_circuit(wire: PhysicalProperties) -> CircuitGraph {
        let mut graph = CircuitGraph::new();
        graph.define("V1", ComponentNode::voltage_dc(5.0)).unwrap();
        graph.define("R1", ComponentNode::resistor(1000.0)).unwrap();
        graph.link("W1", ("V1", "pos"), ("R1", "p1"), wire).unwrap();
        graph.link("W2", ("R1", "p2"), ("V1", "neg"), wire).unwrap();
        graph
    }

    #[test]
    fn test_config_validation() {
        assert!(SimulatorConfig::new().validate().is_ok());
        assert!(SimulatorConfig::new().with_max_iterations(0).validate().is_err());
        assert!(SimulatorConfig::new().with_tolerance(0.0).validate().is_err());
        assert!(SimulatorConfig::new()
            .with_tolerance(f64::NAN)
            .validate()
            .is_err());
        assert!(CircuitGraph::with_config(SimulatorConfig::new().with_max_iterations(0)).is_err());
    }

    #[test]
    fn test_topology_sides() {
        let graph = ohm_circuit(PhysicalProperties::IDEAL_CONDUCTOR);
        let topology = Topology::build(&graph);
        assert_eq!(topology.lines_on(ComponentId(0), "pos"), &[(LineId(0), Side::U)]);
        assert_eq!(topology.lines_on(ComponentId(0), "neg"), &[(LineId(1), Side::V)]);
        assert_eq!(topology.lines_on(ComponentId(1), "p2"), &[(LineId(1), Side::U)]);
        assert!(topology.lines_on(ComponentId(1), "p3").is_empty());
    }

    #[test]
    fn test_ohm_circuit_converges() {
        let mut graph = ohm_circuit(PhysicalProperties::IDEAL_CONDUCTOR);
        let result = graph.advance_tick().unwrap();
        assert_eq!(result.tick, 1);
        assert!(result.iterations <= 3);
        assert!(result.faults.is_empty());

        let w1 = graph.edge_state("W1").unwrap();
        let w2 = graph.edge_state("W2").unwrap();
        assert_relative_eq!(w1.current_amps, 0.005, epsilon = 1e-9);
        assert_relative_eq!(w2.current_amps, 0.005, epsilon = 1e-9);
        assert_relative_eq!(w1.potential_volts - w2.potential_volts, 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_floating_component_is_skipped() {
        let mut graph = ohm_circuit(PhysicalProperties::IDEAL_CONDUCTOR);
        graph.define("R2", ComponentNode::resistor(10.0)).unwrap();
        graph.advance_tick().unwrap();
        assert!(graph.asserted("R2").is_none());
        assert!(graph.asserted("R1").is_some());
        assert_eq!(graph.component("R2").unwrap().ticks(), 0);
        assert_eq!(graph.component("R1").unwrap().ticks(), 1);
    }

    #[test]
    fn test_empty_graph_still_ticks() {
        let mut graph = CircuitGraph::new();
        let result = graph.advance_tick().unwrap();
        assert_eq!(result.tick, 1);
        assert!(result.edges.is_empty());
        assert_eq!(graph.tick(), 1);
    }

    #[test]
    fn test_run_collects_results() {
        let mut graph = ohm_circuit(PhysicalProperties::HOOKUP_WIRE);
        let results = graph.run(3).unwrap();
        assert_eq!(
            results.iter().map(|r| r.tick).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(graph.tick(), 3);
    }
}
