//! Linear passive components: Resistor, Capacitor.

use crate::circuit::{PhysicalProperties, PinState};
use crate::solver::MIN_RESISTANCE;
use crate::REFERENCE_TEMPERATURE_C;

use super::attributes::{AttributeKind, AttributeValue};

/// Default companion-model step for capacitors (1 ms per tick).
pub const DEFAULT_STEP_SECONDS: f64 = 1e-3;

/// Smallest capacitance accepted, to keep the companion impedance finite.
const MIN_CAPACITANCE: f64 = 1e-18;

/// A resistor with an optional linear temperature coefficient.
#[derive(Debug, Clone)]
pub struct Resistor {
    /// Resistance at the 25 °C reference
    pub resistance: f64,
    /// Fractional change in resistance per °C away from the reference
    pub temperature_coefficient: f64,
}

impl Resistor {
    pub const PINS: [&'static str; 2] = ["p1", "p2"];

    pub(crate) const ATTRIBUTES: &'static [(&'static str, AttributeKind)] = &[
        ("resistance_ohms", AttributeKind::Float),
        ("temperature_coefficient", AttributeKind::Float),
    ];

    /// Create a new resistor.
    pub fn new(resistance: f64) -> Self {
        Self {
            resistance: resistance.max(MIN_RESISTANCE), // Minimum resistance to avoid a short
            temperature_coefficient: 0.0,
        }
    }

    /// Set the temperature coefficient (per °C).
    pub fn with_temperature_coefficient(mut self, alpha: f64) -> Self {
        self.temperature_coefficient = alpha;
        self
    }

    /// Resistance at the given ambient temperature.
    ///
    /// R(T) = R_ref * (1 + alpha * (T - 25))
    pub fn effective_resistance(&self, ambient_temp_c: f64) -> f64 {
        let factor = 1.0 + self.temperature_coefficient * (ambient_temp_c - REFERENCE_TEMPERATURE_C);
        (self.resistance * factor).max(MIN_RESISTANCE)
    }

    pub(crate) fn basis(&self) -> [(&'static str, PhysicalProperties); 2] {
        let props = PhysicalProperties::resistive(self.resistance);
        [(Self::PINS[0], props), (Self::PINS[1], props)]
    }

    pub(crate) fn apply_attribute(&mut self, key: &str, value: &AttributeValue) {
        let Some(v) = value.as_float() else { return };
        match key {
            "resistance_ohms" => self.resistance = v.max(MIN_RESISTANCE),
            "temperature_coefficient" => self.temperature_coefficient = v,
            _ => {}
        }
    }

    pub(crate) fn attribute_values(&self) -> Vec<(&'static str, AttributeValue)> {
        vec![
            ("resistance_ohms", self.resistance.into()),
            ("temperature_coefficient", self.temperature_coefficient.into()),
        ]
    }

    /// Ohm's law across the observed pin potentials.
    ///
    /// Each pin sees the resistor as its mid potential behind half the
    /// resistance, so both ends move symmetrically during relaxation.
    pub(crate) fn transfer(&self, ambient_temp_c: f64, p1: &PinState, p2: &PinState) -> [PinState; 2] {
        let r = self.effective_resistance(ambient_temp_c);
        let i = (p1.potential() - p2.potential()) / r;
        [
            PinState::assert(p1.potential(), i, r / 2.0),
            PinState::assert(p2.potential(), -i, r / 2.0),
        ]
    }
}

/// A capacitor.
///
/// Between ticks the capacitor is modelled with a backward-Euler companion
/// model:
///   v(t) = v(t-dt) + (dt/C) * i(t)
///
/// which is a voltage source v(t-dt) in series with an equivalent
/// resistance dt/C.
#[derive(Debug, Clone)]
pub struct Capacitor {
    pub capacitance: f64,
    /// Simulated time covered by one tick
    pub step_seconds: f64,
    /// Voltage across the capacitor (p1 - p2) at the last committed tick
    pub voltage: f64,
}

impl Capacitor {
    pub const PINS: [&'static str; 2] = ["p1", "p2"];

    pub(crate) const ATTRIBUTES: &'static [(&'static str, AttributeKind)] = &[
        ("capacitance_farads", AttributeKind::Float),
        ("step_seconds", AttributeKind::Float),
    ];

    /// Create a new, discharged capacitor.
    pub fn new(capacitance: f64) -> Self {
        Self {
            capacitance: capacitance.max(MIN_CAPACITANCE),
            step_seconds: DEFAULT_STEP_SECONDS,
            voltage: 0.0,
        }
    }

    /// Set the time covered by one tick.
    pub fn with_step(mut self, step_seconds: f64) -> Self {
        self.step_seconds = step_seconds;
        self
    }

    /// Equivalent resistance of the companion model, dt/C.
    pub fn companion_impedance(&self) -> f64 {
        (self.step_seconds / self.capacitance).max(MIN_RESISTANCE)
    }

    pub(crate) fn basis(&self) -> [(&'static str, PhysicalProperties); 2] {
        let props = PhysicalProperties::capacitive(self.capacitance);
        [(Self::PINS[0], props), (Self::PINS[1], props)]
    }

    pub(crate) fn apply_attribute(&mut self, key: &str, value: &AttributeValue) {
        let Some(v) = value.as_float() else { return };
        match key {
            "capacitance_farads" => self.capacitance = v.max(MIN_CAPACITANCE),
            "step_seconds" => self.step_seconds = v.max(0.0),
            _ => {}
        }
    }

    pub(crate) fn attribute_values(&self) -> Vec<(&'static str, AttributeValue)> {
        vec![
            ("capacitance_farads", self.capacitance.into()),
            ("step_seconds", self.step_seconds.into()),
        ]
    }

    /// Companion model around the observed mid potential.
    ///
    /// The charging current is whatever the network currently pushes
    /// through the capacitor.
    pub(crate) fn transfer(&self, p1: &PinState, p2: &PinState) -> [PinState; 2] {
        let z = self.companion_impedance();
        let i = (p1.current() - p2.current()) / 2.0;
        let v = self.voltage + z * i;
        let mid = (p1.potential() + p2.potential()) / 2.0;
        [
            PinState::assert(mid + v / 2.0, i, z / 2.0),
            PinState::assert(mid - v / 2.0, -i, z / 2.0),
        ]
    }

    /// Latch the committed voltage as the next tick's history term.
    pub(crate) fn commit(&mut self, p1: &PinState, p2: &PinState) {
        self.voltage = p1.potential() - p2.potential();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::ApparentEMFState;

    fn pin(potential: f64, current: f64) -> PinState {
        PinState::new(
            ApparentEMFState::new(potential, current),
            PhysicalProperties::IDEAL_CONDUCTOR,
        )
    }

    #[test]
    fn test_resistor_ohms_law() {
        let r = Resistor::new(1000.0);
        let [p1, p2] = r.transfer(REFERENCE_TEMPERATURE_C, &pin(2.5, 0.0), &pin(-2.5, 0.0));
        assert!((p1.current() - 0.005).abs() < 1e-12);
        assert!((p2.current() + 0.005).abs() < 1e-12);
        assert!((p1.impedance() - 500.0).abs() < 1e-12);
    }

    #[test]
    fn test_resistor_temperature_coefficient() {
        let r = Resistor::new(1000.0).with_temperature_coefficient(0.004);
        assert!((r.effective_resistance(25.0) - 1000.0).abs() < 1e-9);
        assert!((r.effective_resistance(75.0) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_capacitor_companion_model() {
        let mut c = Capacitor::new(1e-6);

        // dt/C = 1e-3 / 1e-6 = 1 kOhm
        assert!((c.companion_impedance() - 1000.0).abs() < 1e-9);

        // Discharged with no current: both pins sit at the mid potential
        let [p1, p2] = c.transfer(&pin(1.0, 0.0), &pin(1.0, 0.0));
        assert!((p1.potential() - 1.0).abs() < 1e-12);
        assert!((p2.potential() - 1.0).abs() < 1e-12);

        // 1 mA through it for one step adds 1 V
        let [p1, p2] = c.transfer(&pin(0.0, 0.001), &pin(0.0, -0.001));
        assert!((p1.potential() - p2.potential() - 1.0).abs() < 1e-12);

        c.commit(&pin(2.0, 0.0), &pin(-1.0, 0.0));
        assert!((c.voltage - 3.0).abs() < 1e-12);
    }
}
