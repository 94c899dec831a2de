//! Voltage and current sources.

use crate::circuit::{PhysicalProperties, PinState};
use crate::solver::OPEN_CIRCUIT_RESISTANCE;

use super::attributes::{AttributeKind, AttributeValue};

/// An ideal DC voltage source with optional internal resistance.
///
/// The source enforces: V+ - V- = V_source. Its current is whatever the
/// rest of the network draws through it.
#[derive(Debug, Clone)]
pub struct VoltageSource {
    pub dc_value: f64,
    pub internal_resistance: f64,
}

impl VoltageSource {
    pub const PINS: [&'static str; 2] = ["pos", "neg"];

    pub(crate) const ATTRIBUTES: &'static [(&'static str, AttributeKind)] = &[
        ("voltage_selector_state", AttributeKind::Float),
        ("internal_resistance_ohms", AttributeKind::Float),
    ];

    /// Create a new voltage source.
    pub fn new(dc_value: f64) -> Self {
        Self {
            dc_value,
            internal_resistance: 0.0,
        }
    }

    /// Set the internal resistance.
    pub fn with_internal_resistance(mut self, ohms: f64) -> Self {
        self.internal_resistance = ohms.max(0.0);
        self
    }

    /// Get the source voltage.
    pub fn voltage(&self) -> f64 {
        self.dc_value
    }

    pub(crate) fn basis(&self) -> [(&'static str, PhysicalProperties); 2] {
        let props = PhysicalProperties::IDEAL_CONDUCTOR;
        [(Self::PINS[0], props), (Self::PINS[1], props)]
    }

    pub(crate) fn apply_attribute(&mut self, key: &str, value: &AttributeValue) {
        let Some(v) = value.as_float() else { return };
        match key {
            "voltage_selector_state" => self.dc_value = v,
            "internal_resistance_ohms" => self.internal_resistance = v.max(0.0),
            _ => {}
        }
    }

    pub(crate) fn attribute_values(&self) -> Vec<(&'static str, AttributeValue)> {
        vec![
            ("voltage_selector_state", self.dc_value.into()),
            ("internal_resistance_ohms", self.internal_resistance.into()),
        ]
    }

    /// Hold the terminals E apart around their observed mid potential and
    /// pass the network current through.
    pub(crate) fn transfer(&self, pos: &PinState, neg: &PinState) -> [PinState; 2] {
        let mid = (pos.potential() + neg.potential()) / 2.0;
        let i = (pos.current() - neg.current()) / 2.0;
        let half = self.dc_value / 2.0;
        [
            PinState::assert(mid + half, i, self.internal_resistance),
            PinState::assert(mid - half, -i, self.internal_resistance),
        ]
    }
}

/// An ideal DC current source.
///
/// Current flows out of the `pos` pin into the network and returns
/// through `neg`.
#[derive(Debug, Clone)]
pub struct CurrentSource {
    pub dc_value: f64,
}

impl CurrentSource {
    pub const PINS: [&'static str; 2] = ["pos", "neg"];

    pub(crate) const ATTRIBUTES: &'static [(&'static str, AttributeKind)] =
        &[("current_selector_state", AttributeKind::Float)];

    /// Create a new current source.
    pub fn new(dc_value: f64) -> Self {
        Self { dc_value }
    }

    /// Get the current source value.
    pub fn current(&self) -> f64 {
        self.dc_value
    }

    pub(crate) fn basis(&self) -> [(&'static str, PhysicalProperties); 2] {
        let props = PhysicalProperties::resistive(OPEN_CIRCUIT_RESISTANCE);
        [(Self::PINS[0], props), (Self::PINS[1], props)]
    }

    pub(crate) fn apply_attribute(&mut self, key: &str, value: &AttributeValue) {
        if let ("current_selector_state", Some(v)) = (key, value.as_float()) {
            self.dc_value = v;
        }
    }

    pub(crate) fn attribute_values(&self) -> Vec<(&'static str, AttributeValue)> {
        vec![("current_selector_state", self.dc_value.into())]
    }

    /// Fixed current behind an open-circuit impedance; potentials are left
    /// to the network.
    pub(crate) fn transfer(&self, pos: &PinState, neg: &PinState) -> [PinState; 2] {
        [
            PinState::assert(pos.potential(), -self.dc_value, OPEN_CIRCUIT_RESISTANCE),
            PinState::assert(neg.potential(), self.dc_value, OPEN_CIRCUIT_RESISTANCE),
        ]
    }
}
