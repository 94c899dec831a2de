//! Per-component pin registry.

use std::collections::BTreeMap;

use crate::circuit::{EdgeId, PhysicalProperties};

/// Basis properties of one pin plus the lines terminating on it.
#[derive(Debug, Clone)]
pub struct PinSlot {
    pub basis: PhysicalProperties,
    pub lines: BTreeMap<EdgeId, PhysicalProperties>,
}

impl PinSlot {
    /// Whether at least one line terminates here.
    pub fn is_connected(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Pin name to slot. The key set is fixed at construction from the basis
/// table and is the authoritative list of valid pins.
#[derive(Debug, Clone, Default)]
pub struct PinTable {
    slots: BTreeMap<String, PinSlot>,
}

impl PinTable {
    /// Build an unconnected table from a basis table.
    pub fn from_basis<'a>(basis: impl IntoIterator<Item = (&'a str, PhysicalProperties)>) -> Self {
        let slots = basis
            .into_iter()
            .map(|(pin, basis)| {
                (
                    pin.to_string(),
                    PinSlot {
                        basis,
                        lines: BTreeMap::new(),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// Replace the basis of known pins, keeping their lines.
    pub fn rebase<'a>(&mut self, basis: impl IntoIterator<Item = (&'a str, PhysicalProperties)>) {
        for (pin, properties) in basis {
            if let Some(slot) = self.slots.get_mut(pin) {
                slot.basis = properties;
            }
        }
    }

    /// Whether `pin` is a valid pin name.
    pub fn contains(&self, pin: &str) -> bool {
        self.slots.contains_key(pin)
    }

    /// Look up a slot.
    pub fn get(&self, pin: &str) -> Option<&PinSlot> {
        self.slots.get(pin)
    }

    /// Register `edge` on `pin`. Returns `false` for an unknown pin.
    pub fn connect(&mut self, pin: &str, edge: EdgeId, properties: PhysicalProperties) -> bool {
        match self.slots.get_mut(pin) {
            Some(slot) => {
                slot.lines.insert(edge, properties);
                true
            }
            None => false,
        }
    }

    /// Remove `edge` from `pin`, returning the properties it was registered with.
    pub fn disconnect(&mut self, pin: &str, edge: &EdgeId) -> Option<PhysicalProperties> {
        self.slots.get_mut(pin)?.lines.remove(edge)
    }

    /// Iterate over pins in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PinSlot)> {
        self.slots.iter().map(|(pin, slot)| (pin.as_str(), slot))
    }

    /// Whether any pin has a line.
    pub fn any_connected(&self) -> bool {
        self.slots.values().any(PinSlot::is_connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PinTable {
        PinTable::from_basis([
            ("p1", PhysicalProperties::resistive(1000.0)),
            ("p2", PhysicalProperties::resistive(1000.0)),
        ])
    }

    #[test]
    fn test_connect_unknown_pin_is_rejected() {
        let mut pins = table();
        assert!(!pins.connect("p3", EdgeId::new(), PhysicalProperties::HOOKUP_WIRE));
        assert!(!pins.any_connected());
    }

    #[test]
    fn test_connect_then_disconnect() {
        let mut pins = table();
        let edge = EdgeId::new();
        assert!(pins.connect("p1", edge, PhysicalProperties::HOOKUP_WIRE));
        assert!(pins.get("p1").is_some_and(PinSlot::is_connected));
        assert_eq!(
            pins.disconnect("p1", &edge),
            Some(PhysicalProperties::HOOKUP_WIRE)
        );
        assert!(pins.disconnect("p1", &edge).is_none());
        assert!(!pins.any_connected());
    }
}
