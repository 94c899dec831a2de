//! Line edges: conductors joining two component pins.

use super::types::{ApparentEMFState, ComponentId, EdgeId, PhysicalProperties, Side};

/// One end of a line: a component slot and one of its pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub component: ComponentId,
    pub pin: String,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(component: ComponentId, pin: impl Into<String>) -> Self {
        Self {
            component,
            pin: pin.into(),
        }
    }
}

/// A conductor connecting exactly two (component, pin) endpoints.
///
/// Lines are only created by [`CircuitGraph::link`](super::CircuitGraph::link);
/// their committed electrical state lives in the graph.
#[derive(Debug)]
pub struct LineEdge {
    id: EdgeId,
    conductor: PhysicalProperties,
    u: Endpoint,
    v: Endpoint,
    attached: bool,
}

impl LineEdge {
    pub(crate) fn new(conductor: PhysicalProperties, u: Endpoint, v: Endpoint) -> Self {
        Self {
            id: EdgeId::new(),
            conductor,
            u,
            v,
            attached: true,
        }
    }

    /// Unique id of this line.
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Physical properties of the conductor.
    pub fn conductor(&self) -> &PhysicalProperties {
        &self.conductor
    }

    /// The `u` endpoint. Committed state is measured here.
    pub fn u(&self) -> &Endpoint {
        &self.u
    }

    /// The `v` endpoint.
    pub fn v(&self) -> &Endpoint {
        &self.v
    }

    /// Endpoint at the given side.
    pub fn end(&self, side: Side) -> &Endpoint {
        match side {
            Side::U => &self.u,
            Side::V => &self.v,
        }
    }

    /// Whether both endpoints currently have this line registered.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub(crate) fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// Potential at one end of the line given its committed state.
    ///
    /// The `v` end sits one resistive drop below the `u` end.
    pub fn potential_at(&self, state: &ApparentEMFState, side: Side) -> f64 {
        match side {
            Side::U => state.potential_volts,
            Side::V => state.potential_volts - state.current_amps * self.conductor.resistance_ohms,
        }
    }

    /// Current flowing from the line into the component at one end.
    pub fn current_into(&self, state: &ApparentEMFState, side: Side) -> f64 {
        match side {
            Side::U => -state.current_amps,
            Side::V => state.current_amps,
        }
    }
}
