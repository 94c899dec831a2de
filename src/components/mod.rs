//! Component models for circuit simulation.
//!
//! This module provides models for all supported circuit components:
//! - Linear: Resistor, Capacitor
//! - Sources: Voltage Source, Current Source
//!
//! Every component is a [`ComponentNode`]: a fixed variant ([`ComponentKind`])
//! plus the state the graph drives through the lifecycle hooks (ambient
//! temperature, pin connectivity, typed attributes, tick counter). Each tick
//! the graph hands a component its incoming pin view and the component
//! answers with one assertion per pin.

mod attributes;
mod linear;
mod pins;
mod sources;

pub use attributes::{AttributeKind, AttributeStore, AttributeValue};
pub use linear::{Capacitor, Resistor, DEFAULT_STEP_SECONDS};
pub use pins::{PinSlot, PinTable};
pub use sources::{CurrentSource, VoltageSource};

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::circuit::{EdgeId, PhysicalProperties, PinMap, PinState};
use crate::error::{CographError, Result};
use crate::solver::OPEN_CIRCUIT_RESISTANCE;
use crate::REFERENCE_TEMPERATURE_C;

/// Lifecycle of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Constructed, no ambient temperature baseline yet
    Uninitialized,
    /// Baseline set, has not taken part in a tick
    Initialized,
    /// Has taken part in at least one tick
    Active,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Initialized => "initialized",
            Lifecycle::Active => "active",
        };
        write!(f, "{}", name)
    }
}

/// The component variants.
#[derive(Debug, Clone)]
pub enum ComponentKind {
    Resistor(Resistor),
    VoltageSource(VoltageSource),
    CurrentSource(CurrentSource),
    Capacitor(Capacitor),
}

impl ComponentKind {
    /// Short name of the variant.
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Resistor(_) => "resistor",
            ComponentKind::VoltageSource(_) => "voltage source",
            ComponentKind::CurrentSource(_) => "current source",
            ComponentKind::Capacitor(_) => "capacitor",
        }
    }

    /// Pin names, in terminal order.
    pub fn pins(&self) -> [&'static str; 2] {
        match self {
            ComponentKind::Resistor(_) => Resistor::PINS,
            ComponentKind::VoltageSource(_) => VoltageSource::PINS,
            ComponentKind::CurrentSource(_) => CurrentSource::PINS,
            ComponentKind::Capacitor(_) => Capacitor::PINS,
        }
    }

    fn basis(&self) -> [(&'static str, PhysicalProperties); 2] {
        match self {
            ComponentKind::Resistor(r) => r.basis(),
            ComponentKind::VoltageSource(v) => v.basis(),
            ComponentKind::CurrentSource(i) => i.basis(),
            ComponentKind::Capacitor(c) => c.basis(),
        }
    }

    fn attribute_schema(&self) -> &'static [(&'static str, AttributeKind)] {
        match self {
            ComponentKind::Resistor(_) => Resistor::ATTRIBUTES,
            ComponentKind::VoltageSource(_) => VoltageSource::ATTRIBUTES,
            ComponentKind::CurrentSource(_) => CurrentSource::ATTRIBUTES,
            ComponentKind::Capacitor(_) => Capacitor::ATTRIBUTES,
        }
    }

    fn attribute_values(&self) -> Vec<(&'static str, AttributeValue)> {
        match self {
            ComponentKind::Resistor(r) => r.attribute_values(),
            ComponentKind::VoltageSource(v) => v.attribute_values(),
            ComponentKind::CurrentSource(i) => i.attribute_values(),
            ComponentKind::Capacitor(c) => c.attribute_values(),
        }
    }

    fn apply_attribute(&mut self, key: &str, value: &AttributeValue) {
        match self {
            ComponentKind::Resistor(r) => r.apply_attribute(key, value),
            ComponentKind::VoltageSource(v) => v.apply_attribute(key, value),
            ComponentKind::CurrentSource(i) => i.apply_attribute(key, value),
            ComponentKind::Capacitor(c) => c.apply_attribute(key, value),
        }
    }

    fn transfer(&self, ambient_temp_c: f64, a: &PinState, b: &PinState) -> [PinState; 2] {
        match self {
            ComponentKind::Resistor(r) => r.transfer(ambient_temp_c, a, b),
            ComponentKind::VoltageSource(v) => v.transfer(a, b),
            ComponentKind::CurrentSource(i) => i.transfer(a, b),
            ComponentKind::Capacitor(c) => c.transfer(a, b),
        }
    }

    fn commit(&mut self, a: &PinState, b: &PinState) {
        if let ComponentKind::Capacitor(c) = self {
            c.commit(a, b);
        }
    }
}

/// A circuit component as seen by the graph.
#[derive(Debug, Clone)]
pub struct ComponentNode {
    kind: ComponentKind,
    lifecycle: Lifecycle,
    ambient_temp_c: f64,
    pins: PinTable,
    attributes: AttributeStore,
    ticks: u64,
}

impl ComponentNode {
    /// Wrap a component variant. The node starts Uninitialized with no lines.
    pub fn new(kind: ComponentKind) -> Self {
        let pins = PinTable::from_basis(kind.basis());
        let mut attributes = AttributeStore::new(kind.attribute_schema());
        for (key, value) in kind.attribute_values() {
            attributes.set(key, value);
        }
        Self {
            kind,
            lifecycle: Lifecycle::Uninitialized,
            ambient_temp_c: REFERENCE_TEMPERATURE_C,
            pins,
            attributes,
            ticks: 0,
        }
    }

    /// A resistor of the given resistance.
    pub fn resistor(ohms: f64) -> Self {
        Self::new(ComponentKind::Resistor(Resistor::new(ohms)))
    }

    /// An ideal DC voltage source.
    pub fn voltage_dc(volts: f64) -> Self {
        Self::new(ComponentKind::VoltageSource(VoltageSource::new(volts)))
    }

    /// An ideal DC current source.
    pub fn current_dc(amps: f64) -> Self {
        Self::new(ComponentKind::CurrentSource(CurrentSource::new(amps)))
    }

    /// A discharged capacitor.
    pub fn capacitor(farads: f64) -> Self {
        Self::new(ComponentKind::Capacitor(Capacitor::new(farads)))
    }

    /// Set the ambient temperature baseline, builder style.
    pub fn on_initialisation(mut self, ambient_temp_c: f64) -> Self {
        self.initialise(ambient_temp_c);
        self
    }

    /// Set the ambient temperature baseline.
    ///
    /// Calling again re-baselines the temperature without changing the
    /// lifecycle of an already Active component.
    pub fn initialise(&mut self, ambient_temp_c: f64) {
        self.ambient_temp_c = ambient_temp_c;
        if self.lifecycle == Lifecycle::Uninitialized {
            self.lifecycle = Lifecycle::Initialized;
        }
    }

    /// Move an Initialized component with at least one line to Active.
    ///
    /// Returns whether the component may take part in the coming tick.
    pub(crate) fn activate(&mut self) -> bool {
        if self.lifecycle == Lifecycle::Initialized && self.pins.any_connected() {
            self.lifecycle = Lifecycle::Active;
        }
        self.lifecycle == Lifecycle::Active && self.pins.any_connected()
    }

    /// Return a component activated by a tick that did not commit.
    pub(crate) fn revert_activation(&mut self) {
        if self.lifecycle == Lifecycle::Active {
            self.lifecycle = Lifecycle::Initialized;
        }
    }

    /// Register that `edge` now terminates at `pin`.
    pub fn on_line_connect(
        &mut self,
        pin: &str,
        edge: EdgeId,
        properties: PhysicalProperties,
    ) -> Result<()> {
        if self.pins.connect(pin, edge, properties) {
            Ok(())
        } else {
            Err(CographError::unknown_pin(self.kind.name(), pin))
        }
    }

    /// Remove the registration of `edge` on `pin`.
    pub fn on_line_disconnect(&mut self, pin: &str, edge: EdgeId) -> Result<PhysicalProperties> {
        if !self.pins.contains(pin) {
            return Err(CographError::unknown_pin(self.kind.name(), pin));
        }
        self.pins
            .disconnect(pin, &edge)
            .ok_or_else(|| CographError::UnknownEdge {
                pin: pin.to_string(),
                edge,
            })
    }

    /// The transfer function.
    ///
    /// `incoming` holds the committed view of every connected pin; pins
    /// missing from it are open. Returns one assertion per incoming pin.
    pub fn on_tdelta(&self, tick: u64, incoming: &PinMap) -> Result<PinMap> {
        if self.lifecycle != Lifecycle::Active || !self.pins.any_connected() {
            return Err(CographError::ComponentNotReady {
                component: self.kind.name().to_string(),
                lifecycle: self.lifecycle.to_string(),
            });
        }
        if let Some(pin) = incoming.keys().find(|pin| !self.pins.contains(pin)) {
            return Err(CographError::unknown_pin(self.kind.name(), pin.as_str()));
        }

        let [a, b] = self.kind.pins();
        let outgoing = match (incoming.get(a), incoming.get(b)) {
            (Some(pa), Some(pb)) => {
                let [oa, ob] = self.kind.transfer(self.ambient_temp_c, pa, pb);
                PinMap::from([(a.to_string(), oa), (b.to_string(), ob)])
            }
            // One terminal open: no current can flow through the element
            _ => incoming
                .iter()
                .map(|(pin, view)| {
                    (
                        pin.clone(),
                        PinState::assert(view.potential(), 0.0, OPEN_CIRCUIT_RESISTANCE),
                    )
                })
                .collect(),
        };
        trace!(tick, kind = self.kind.name(), "transfer evaluated");
        Ok(outgoing)
    }

    /// Advance retained state after the graph committed tick `tick`.
    pub fn on_commit(&mut self, tick: u64, committed: &PinMap) {
        let [a, b] = self.kind.pins();
        if let (Some(pa), Some(pb)) = (committed.get(a), committed.get(b)) {
            self.kind.commit(pa, pb);
        }
        self.ticks = tick;
    }

    /// Try to set a typed attribute.
    ///
    /// Unknown keys and kind mismatches are rejected with `false`. Accepted
    /// values are stored as the component clamps them, and the pin basis
    /// follows the new values.
    pub fn on_set_attribute(&mut self, key: &str, value: impl Into<AttributeValue>) -> bool {
        let value = value.into();
        if !self.attributes.set(key, value.clone()) {
            return false;
        }
        self.kind.apply_attribute(key, &value);
        self.pins.rebase(self.kind.basis());
        for (key, value) in self.kind.attribute_values() {
            self.attributes.set(key, value);
        }
        true
    }

    /// Attribute name to expected kind.
    pub fn attribute_lookup(&self) -> &BTreeMap<&'static str, AttributeKind> {
        self.attributes.schema()
    }

    /// Current value of an attribute.
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Pin name to normalised properties at 1 V, 1 A, 25 °C.
    pub fn input_basis_table(&self) -> BTreeMap<String, PhysicalProperties> {
        self.pins
            .iter()
            .map(|(pin, slot)| (pin.to_string(), slot.basis))
            .collect()
    }

    /// The component variant.
    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    /// Short name of the variant.
    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Current lifecycle stage.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Ambient temperature baseline.
    pub fn ambient_temp_c(&self) -> f64 {
        self.ambient_temp_c
    }

    /// Last tick this component committed.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The pin registry.
    pub fn pins(&self) -> &PinTable {
        &self.pins
    }

    /// Names of pins with at least one line.
    pub fn connected_pins(&self) -> Vec<&str> {
        self.pins
            .iter()
            .filter(|(_, slot)| slot.is_connected())
            .map(|(pin, _)| pin)
            .collect()
    }

    /// Lines registered on `pin`, if the pin exists.
    pub fn pin_lines(&self, pin: &str) -> Option<&BTreeMap<EdgeId, PhysicalProperties>> {
        self.pins.get(pin).map(|slot| &slot.lines)
    }
}

impl From<Resistor> for ComponentNode {
    fn from(r: Resistor) -> Self {
        Self::new(ComponentKind::Resistor(r))
    }
}

impl From<VoltageSource> for ComponentNode {
    fn from(v: VoltageSource) -> Self {
        Self::new(ComponentKind::VoltageSource(v))
    }
}

impl From<CurrentSource> for ComponentNode {
    fn from(i: CurrentSource) -> Self {
        Self::new(ComponentKind::CurrentSource(i))
    }
}

impl From<Capacitor> for ComponentNode {
    fn from(c: Capacitor) -> Self {
        Self::new(ComponentKind::Capacitor(c))
    }
}
