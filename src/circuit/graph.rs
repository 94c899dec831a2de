//! Circuit graph structure.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::edge::{Endpoint, LineEdge};
use super::types::{ApparentEMFState, ComponentId, EdgeId, LineId, PhysicalProperties, PinMap};
use super::validate;
use crate::components::{AttributeValue, ComponentNode, Lifecycle};
use crate::error::{CographError, Result};
use crate::solver::{SimulatorConfig, Topology};

/// Anything that can be registered under a label.
#[derive(Debug)]
pub enum GraphItem {
    Component(ComponentNode),
    Line(LineEdge),
}

impl From<ComponentNode> for GraphItem {
    fn from(node: ComponentNode) -> Self {
        GraphItem::Component(node)
    }
}

impl From<LineEdge> for GraphItem {
    fn from(edge: LineEdge) -> Self {
        GraphItem::Line(edge)
    }
}

/// What a label refers to.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Component(ComponentId),
    Line(LineId),
}

#[derive(Debug)]
pub(crate) struct ComponentEntry {
    pub(crate) label: String,
    pub(crate) node: ComponentNode,
}

#[derive(Debug)]
pub(crate) struct LineEntry {
    pub(crate) label: String,
    pub(crate) edge: LineEdge,
}

/// A labelled circuit of components and the lines between them.
#[derive(Debug, Default)]
pub struct CircuitGraph {
    /// Labels are unique across components and lines
    labels: HashMap<String, Slot>,

    /// Components in definition order
    pub(crate) components: Vec<ComponentEntry>,

    /// Lines in definition order
    pub(crate) lines: Vec<LineEntry>,

    /// Edge id to line slot
    pub(crate) edge_index: HashMap<EdgeId, LineId>,

    /// Last committed state of each line, indexed like `lines`
    pub(crate) committed: Vec<ApparentEMFState>,

    /// Assertions each component made in the last committed tick
    pub(crate) asserted: Vec<Option<PinMap>>,

    /// Number of committed ticks
    pub(crate) tick: u64,

    pub(crate) config: SimulatorConfig,
}

impl CircuitGraph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with a custom configuration.
    pub fn with_config(config: SimulatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Replace the configuration, e.g. to retry a tick with a looser
    /// tolerance or a higher iteration cap.
    pub fn set_config(&mut self, config: SimulatorConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Register a component or line under `label`.
    ///
    /// Components that were never initialised get the configured ambient
    /// temperature as their baseline.
    pub fn define(&mut self, label: impl Into<String>, item: impl Into<GraphItem>) -> Result<()> {
        let label = label.into();
        if self.labels.contains_key(&label) {
            return Err(CographError::DuplicateLabel { label });
        }

        match item.into() {
            GraphItem::Component(mut node) => {
                if node.lifecycle() == Lifecycle::Uninitialized {
                    node.initialise(self.config.ambient_temp_c);
                }
                let id = ComponentId(self.components.len());
                debug!(%label, %id, kind = node.kind_name(), "component defined");
                self.labels.insert(label.clone(), Slot::Component(id));
                self.components.push(ComponentEntry { label, node });
                self.asserted.push(None);
            }
            GraphItem::Line(edge) => {
                let id = LineId(self.lines.len());
                debug!(%label, %id, edge = %edge.id(), "line defined");
                self.labels.insert(label.clone(), Slot::Line(id));
                self.edge_index.insert(edge.id(), id);
                self.lines.push(LineEntry { label, edge });
                self.committed.push(ApparentEMFState::ZERO);
            }
        }
        Ok(())
    }

    /// Register an item whose type is only known at runtime.
    ///
    /// Accepts a [`ComponentNode`] or a [`GraphItem`]; anything else fails
    /// with [`CographError::UnrecognizedItemType`].
    pub fn define_any<T: Any>(&mut self, label: impl Into<String>, item: T) -> Result<()> {
        let label = label.into();
        if self.labels.contains_key(&label) {
            return Err(CographError::DuplicateLabel { label });
        }

        let boxed: Box<dyn Any> = Box::new(item);
        let item = match boxed.downcast::<ComponentNode>() {
            Ok(node) => GraphItem::Component(*node),
            Err(boxed) => match boxed.downcast::<GraphItem>() {
                Ok(item) => *item,
                Err(_) => {
                    return Err(CographError::UnrecognizedItemType {
                        label,
                        type_name: type_name::<T>().to_string(),
                    })
                }
            },
        };
        self.define(label, item)
    }

    /// Join `u` and `v` (each a component label and pin name) with a new
    /// line and register it under `label`.
    ///
    /// All preconditions are checked before anything is modified.
    pub fn link(
        &mut self,
        label: impl Into<String>,
        u: (&str, &str),
        v: (&str, &str),
        properties: PhysicalProperties,
    ) -> Result<EdgeId> {
        let label = label.into();
        if self.labels.contains_key(&label) {
            return Err(CographError::DuplicateLabel { label });
        }

        let u_end = validate::resolve_endpoint(self, u)?;
        let v_end = validate::resolve_endpoint(self, v)?;
        if u_end == v_end {
            return Err(CographError::invalid_topology(format!(
                "line '{}' would join {}:{} to itself",
                label, u.0, u.1
            )));
        }

        let edge = LineEdge::new(properties, u_end, v_end);
        let id = edge.id();
        self.connect_ends(&edge)?;
        self.define(label, edge)?;
        Ok(id)
    }

    /// Disconnect a line from both endpoints without removing it.
    ///
    /// A detached line is skipped by the tick driver and keeps its last
    /// committed state. Detaching twice is a no-op.
    pub fn detach(&mut self, label: &str) -> Result<()> {
        let line = self.line_id(label)?;
        let edge = &self.lines[line.0].edge;
        if !edge.is_attached() {
            return Ok(());
        }
        let (id, u, v) = (edge.id(), edge.u().clone(), edge.v().clone());
        self.with_node(u.component, |node| node.on_line_disconnect(&u.pin, id))?;
        self.with_node(v.component, |node| node.on_line_disconnect(&v.pin, id))?;
        self.lines[line.0].edge.set_attached(false);
        debug!(label, "line detached");
        Ok(())
    }

    /// Reconnect a detached line to both endpoints.
    pub fn attach(&mut self, label: &str) -> Result<()> {
        let line = self.line_id(label)?;
        if self.lines[line.0].edge.is_attached() {
            return Ok(());
        }
        let entry = &self.lines[line.0];
        let (id, conductor, u, v) = (
            entry.edge.id(),
            *entry.edge.conductor(),
            entry.edge.u().clone(),
            entry.edge.v().clone(),
        );
        self.with_node(u.component, |node| node.on_line_connect(&u.pin, id, conductor))?;
        self.with_node(v.component, |node| node.on_line_connect(&v.pin, id, conductor))?;
        self.lines[line.0].edge.set_attached(true);
        debug!(label, "line attached");
        Ok(())
    }

    fn connect_ends(&mut self, edge: &LineEdge) -> Result<()> {
        for end in [edge.u(), edge.v()] {
            self.with_node(end.component, |node| {
                node.on_line_connect(&end.pin, edge.id(), *edge.conductor())
            })?;
        }
        Ok(())
    }

    /// Run a component callback, reporting errors under the component's label.
    fn with_node<T>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut ComponentNode) -> Result<T>,
    ) -> Result<T> {
        let entry = &mut self.components[id.0];
        f(&mut entry.node).map_err(|err| err.with_component(entry.label.as_str()))
    }

    /// Set an attribute on the named component.
    ///
    /// Returns `false` for unknown labels, unknown keys and kind mismatches.
    pub fn set_attribute(
        &mut self,
        label: &str,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> bool {
        match self.component_id(label) {
            Some(id) => self.components[id.0].node.on_set_attribute(key, value),
            None => false,
        }
    }

    // ============ Queries ============

    /// All labels: components first, then lines, each in definition order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.components
            .iter()
            .map(|c| c.label.as_str())
            .chain(self.lines.iter().map(|l| l.label.as_str()))
    }

    /// Number of committed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Components with their labels, in definition order.
    pub fn components(&self) -> impl Iterator<Item = (&str, &ComponentNode)> {
        self.components.iter().map(|c| (c.label.as_str(), &c.node))
    }

    /// Lines with their labels, in definition order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &LineEdge)> {
        self.lines.iter().map(|l| (l.label.as_str(), &l.edge))
    }

    /// Look up a component by label.
    pub fn component(&self, label: &str) -> Option<&ComponentNode> {
        self.component_id(label).map(|id| &self.components[id.0].node)
    }

    /// Look up a line by label.
    pub fn edge(&self, label: &str) -> Option<&LineEdge> {
        self.line_id(label).ok().map(|id| &self.lines[id.0].edge)
    }

    /// Last committed state of a line, measured at its `u` end.
    pub fn edge_state(&self, label: &str) -> Option<ApparentEMFState> {
        self.line_id(label).ok().map(|id| self.committed[id.0])
    }

    /// Committed pin view of a component: what it would receive as
    /// `incoming` on the next tick. Open pins are absent.
    pub fn incoming_view(&self, label: &str) -> Result<PinMap> {
        let id = self
            .component_id(label)
            .ok_or_else(|| CographError::unknown_label(label))?;
        let topology = Topology::build(self);
        Ok(self.gather(&topology, id, &self.committed))
    }

    /// Assertions the component made in the last committed tick.
    pub fn asserted(&self, label: &str) -> Option<&PinMap> {
        self.component_id(label)
            .and_then(|id| self.asserted[id.0].as_ref())
    }

    /// Largest Kirchhoff current imbalance over pins with several lines.
    ///
    /// For each such pin, compares the committed line currents flowing into
    /// the component against the current the component asserted.
    pub fn kirchhoff_residual(&self) -> f64 {
        let topology = Topology::build(self);
        let mut worst = 0.0f64;
        for (i, asserted) in self.asserted.iter().enumerate() {
            let Some(asserted) = asserted else { continue };
            for pin in topology.pins(ComponentId(i)) {
                if pin.lines.len() < 2 {
                    continue;
                }
                let Some(assertion) = asserted.get(&pin.pin) else { continue };
                let inflow: f64 = pin
                    .lines
                    .iter()
                    .map(|&(line, side)| {
                        self.lines[line.0]
                            .edge
                            .current_into(&self.committed[line.0], side)
                    })
                    .sum();
                worst = worst.max((inflow - assertion.current()).abs());
            }
        }
        worst
    }

    pub(crate) fn component_id(&self, label: &str) -> Option<ComponentId> {
        match self.labels.get(label) {
            Some(Slot::Component(id)) => Some(*id),
            _ => None,
        }
    }

    fn line_id(&self, label: &str) -> Result<LineId> {
        match self.labels.get(label) {
            Some(Slot::Line(id)) => Ok(*id),
            _ => Err(CographError::unknown_label(label)),
        }
    }

    pub(crate) fn component_label(&self, id: ComponentId) -> &str {
        &self.components[id.0].label
    }

    fn describe_end(&self, end: &Endpoint) -> String {
        format!("{}:{}", self.component_label(end.component), end.pin)
    }
}

impl fmt::Display for CircuitGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Components:")?;
        for entry in &self.components {
            writeln!(f, "\t[{}: {}]", entry.label, entry.node.kind_name())?;
        }
        writeln!(f, "Lines:")?;
        for (entry, state) in self.lines.iter().zip(&self.committed) {
            writeln!(
                f,
                "\t[{} {} [{}] -> [{}] {}]",
                entry.label,
                entry.edge.id(),
                self.describe_end(entry.edge.u()),
                self.describe_end(entry.edge.v()),
                state
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_and_load() -> CircuitGraph {
        let mut graph = CircuitGraph::new();
        graph.define("V1", ComponentNode::voltage_dc(5.0)).unwrap();
        graph.define("R1", ComponentNode::resistor(1000.0)).unwrap();
        graph
    }

    #[test]
    fn test_define_duplicate_label() {
        let mut graph = source_and_load();
        let err = graph
            .define("R1", ComponentNode::resistor(220.0))
            .unwrap_err();
        assert_eq!(
            err,
            CographError::DuplicateLabel {
                label: "R1".to_string()
            }
        );
        assert_eq!(graph.components().count(), 2);
    }

    #[test]
    fn test_define_initialises_with_ambient() {
        let config = SimulatorConfig::new().with_ambient_temp(40.0);
        let mut graph = CircuitGraph::with_config(config).unwrap();
        graph.define("R1", ComponentNode::resistor(1000.0)).unwrap();
        graph
            .define("R2", ComponentNode::resistor(1000.0).on_initialisation(10.0))
            .unwrap();

        let r1 = graph.component("R1").unwrap();
        assert_eq!(r1.lifecycle(), Lifecycle::Initialized);
        assert_eq!(r1.ambient_temp_c(), 40.0);
        assert_eq!(graph.component("R2").unwrap().ambient_temp_c(), 10.0);
    }

    #[test]
    fn test_define_any_rejects_unknown_types() {
        let mut graph = CircuitGraph::new();
        let err = graph.define_any("X1", 42u32).unwrap_err();
        assert!(matches!(
            err,
            CographError::UnrecognizedItemType { ref type_name, .. } if type_name == "u32"
        ));

        graph
            .define_any("R1", ComponentNode::resistor(1000.0))
            .unwrap();
        graph
            .define_any("R2", GraphItem::from(ComponentNode::resistor(1000.0)))
            .unwrap();
        assert_eq!(graph.labels().collect::<Vec<_>>(), vec!["R1", "R2"]);
    }

    #[test]
    fn test_link_registers_both_ends() {
        let mut graph = source_and_load();
        let id = graph
            .link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();

        let edge = graph.edge("W1").unwrap();
        assert_eq!(edge.id(), id);
        assert!(graph
            .component("V1")
            .unwrap()
            .pin_lines("pos")
            .unwrap()
            .contains_key(&id));
        assert!(graph
            .component("R1")
            .unwrap()
            .pin_lines("p1")
            .unwrap()
            .contains_key(&id));
        assert_eq!(graph.edge_state("W1"), Some(ApparentEMFState::ZERO));
    }

    #[test]
    fn test_link_unknown_label() {
        let mut graph = source_and_load();
        let err = graph
            .link("W1", ("V1", "pos"), ("R9", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap_err();
        assert_eq!(err, CographError::unknown_label("R9"));
        assert!(graph.edge("W1").is_none());
        assert!(graph.component("V1").unwrap().connected_pins().is_empty());
    }

    #[test]
    fn test_link_to_a_line_label_is_unknown() {
        let mut graph = source_and_load();
        graph
            .link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();
        let err = graph
            .link("W2", ("W1", "pos"), ("R1", "p2"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap_err();
        assert!(matches!(err, CographError::UnknownLabel { .. }));
    }

    #[test]
    fn test_link_unknown_pin_leaves_graph_untouched() {
        let mut graph = source_and_load();
        let err = graph
            .link("W1", ("V1", "pos"), ("R1", "p3"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap_err();
        assert_eq!(err, CographError::unknown_pin("R1", "p3"));
        assert!(graph.component("V1").unwrap().connected_pins().is_empty());
        assert_eq!(graph.edges().count(), 0);
    }

    #[test]
    fn test_attach_errors_name_the_label() {
        let mut graph = source_and_load();
        graph
            .link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();
        graph.detach("W1").unwrap();

        // Swap R1 for a node without a `p1` pin behind the line's back
        let id = graph.component_id("R1").unwrap();
        graph.components[id.0].node = ComponentNode::voltage_dc(1.0);

        let err = graph.attach("W1").unwrap_err();
        assert_eq!(err, CographError::unknown_pin("R1", "p1"));
        assert_eq!(err.to_string(), "Unknown pin 'p1' on 'R1'");
    }

    #[test]
    fn test_link_duplicate_label_connects_nothing() {
        let mut graph = source_and_load();
        let err = graph
            .link("R1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap_err();
        assert!(matches!(err, CographError::DuplicateLabel { .. }));
        assert!(graph.component("V1").unwrap().connected_pins().is_empty());
    }

    #[test]
    fn test_link_pin_to_itself() {
        let mut graph = source_and_load();
        let err = graph
            .link("W1", ("R1", "p1"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap_err();
        assert!(matches!(err, CographError::InvalidTopology { .. }));
    }

    #[test]
    fn test_detach_and_attach() {
        let mut graph = source_and_load();
        let id = graph
            .link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();

        graph.detach("W1").unwrap();
        assert!(!graph.edge("W1").unwrap().is_attached());
        assert!(graph.component("R1").unwrap().connected_pins().is_empty());
        graph.detach("W1").unwrap();

        graph.attach("W1").unwrap();
        assert!(graph.edge("W1").unwrap().is_attached());
        assert!(graph
            .component("R1")
            .unwrap()
            .pin_lines("p1")
            .unwrap()
            .contains_key(&id));

        assert!(matches!(
            graph.detach("R1"),
            Err(CographError::UnknownLabel { .. })
        ));
    }

    #[test]
    fn test_set_attribute_delegates() {
        let mut graph = source_and_load();
        assert!(graph.set_attribute("V1", "voltage_selector_state", 12.0));
        assert!(!graph.set_attribute("V1", "voltage_selector_state", true));
        assert!(!graph.set_attribute("V9", "voltage_selector_state", 12.0));
        assert_eq!(
            graph.component("V1").unwrap().attribute("voltage_selector_state"),
            Some(&AttributeValue::Float(12.0))
        );
    }

    #[test]
    fn test_display_lists_components_and_lines() {
        let mut graph = source_and_load();
        graph
            .link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();
        let text = graph.to_string();
        assert!(text.contains("[V1: voltage source]"));
        assert!(text.contains("[V1:pos] -> [R1:p1]"));
    }
}
