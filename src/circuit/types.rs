//! Core types for circuit representation.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

/// Globally unique identity of a line edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        EdgeId(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a component slot in the graph's component arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

/// Index of a line slot in the graph's line arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub usize);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Which end of a line a pin sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    U,
    V,
}

impl Side {
    /// The other end of the line.
    pub fn opposite(self) -> Side {
        match self {
            Side::U => Side::V,
            Side::V => Side::U,
        }
    }
}

/// Physical character of a conductor, or of a component pin at the
/// reference operating point (1 V, 1 A, 25 °C).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalProperties {
    pub resistance_ohms: f64,
    pub capacitance_farads: f64,
    pub inductance_henries: f64,
    pub temperature_delta_celsius: f64,
}

impl PhysicalProperties {
    /// A lossless conductor.
    pub const IDEAL_CONDUCTOR: PhysicalProperties = PhysicalProperties {
        resistance_ohms: 0.0,
        capacitance_farads: 0.0,
        inductance_henries: 0.0,
        temperature_delta_celsius: 0.0,
    };

    /// Default line used when wiring pins together (0.1 Ω).
    pub const HOOKUP_WIRE: PhysicalProperties = PhysicalProperties {
        resistance_ohms: 0.1,
        capacitance_farads: 0.0,
        inductance_henries: 0.0,
        temperature_delta_celsius: 0.0,
    };

    /// Create a new set of properties.
    pub fn new(
        resistance_ohms: f64,
        capacitance_farads: f64,
        inductance_henries: f64,
        temperature_delta_celsius: f64,
    ) -> Self {
        Self {
            resistance_ohms,
            capacitance_farads,
            inductance_henries,
            temperature_delta_celsius,
        }
    }

    /// Purely resistive properties.
    pub fn resistive(resistance_ohms: f64) -> Self {
        Self {
            resistance_ohms,
            ..Self::IDEAL_CONDUCTOR
        }
    }

    /// Purely capacitive properties.
    pub fn capacitive(capacitance_farads: f64) -> Self {
        Self {
            capacitance_farads,
            ..Self::IDEAL_CONDUCTOR
        }
    }

    /// Combine two conductors terminating on the same pin.
    ///
    /// Resistance and inductance combine in parallel, capacitance adds, and
    /// the temperature delta keeps the larger excursion.
    pub fn parallel(&self, other: &PhysicalProperties) -> PhysicalProperties {
        let temperature_delta_celsius =
            if self.temperature_delta_celsius.abs() >= other.temperature_delta_celsius.abs() {
                self.temperature_delta_celsius
            } else {
                other.temperature_delta_celsius
            };
        PhysicalProperties {
            resistance_ohms: parallel_sum(self.resistance_ohms, other.resistance_ohms),
            capacitance_farads: self.capacitance_farads + other.capacitance_farads,
            inductance_henries: parallel_sum(self.inductance_henries, other.inductance_henries),
            temperature_delta_celsius,
        }
    }
}

// x·y/(x+y), with a zero branch shorting the pair.
fn parallel_sum(x: f64, y: f64) -> f64 {
    if x == 0.0 || y == 0.0 {
        0.0
    } else {
        x * y / (x + y)
    }
}

/// Instantaneous electrical state on one edge or pin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ApparentEMFState {
    pub potential_volts: f64,
    pub current_amps: f64,
}

impl ApparentEMFState {
    /// The tick-0 state of every line.
    pub const ZERO: ApparentEMFState = ApparentEMFState {
        potential_volts: 0.0,
        current_amps: 0.0,
    };

    /// Create a new state.
    pub fn new(potential_volts: f64, current_amps: f64) -> Self {
        Self {
            potential_volts,
            current_amps,
        }
    }
}

impl fmt::Display for ApparentEMFState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} V, {:.6} A", self.potential_volts, self.current_amps)
    }
}

/// State exchanged with a component for one pin.
///
/// Incoming: `emf` is the potential at the pin and the current flowing into
/// the component through it; `properties` are the combined line properties.
/// Outgoing: `emf` is what the component asserts for the pin, and
/// `properties.resistance_ohms` is its source impedance seen from the pin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PinState {
    pub emf: ApparentEMFState,
    pub properties: PhysicalProperties,
}

impl PinState {
    /// Create a new pin state.
    pub fn new(emf: ApparentEMFState, properties: PhysicalProperties) -> Self {
        Self { emf, properties }
    }

    /// An assertion of `potential` and `current` behind `impedance_ohms`.
    pub fn assert(potential_volts: f64, current_amps: f64, impedance_ohms: f64) -> Self {
        Self {
            emf: ApparentEMFState::new(potential_volts, current_amps),
            properties: PhysicalProperties::resistive(impedance_ohms),
        }
    }

    /// Potential at the pin.
    pub fn potential(&self) -> f64 {
        self.emf.potential_volts
    }

    /// Current into the component through the pin.
    pub fn current(&self) -> f64 {
        self.emf.current_amps
    }

    /// Source impedance carried by an outgoing assertion.
    pub fn impedance(&self) -> f64 {
        self.properties.resistance_ohms
    }
}

/// Pin name to pin state.
pub type PinMap = BTreeMap<String, PinState>;
