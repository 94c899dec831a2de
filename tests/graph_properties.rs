//! Property tests for graph construction and tick bookkeeping.

use std::collections::HashSet;

use cograph::{CircuitGraph, CographError, ComponentNode, PhysicalProperties};
use proptest::prelude::*;

const IDEAL: PhysicalProperties = PhysicalProperties::IDEAL_CONDUCTOR;

fn ohm(volts: f64, ohms: f64, wire: PhysicalProperties) -> CircuitGraph {
    let mut graph = CircuitGraph::new();
    graph.define("V1", ComponentNode::voltage_dc(volts)).unwrap();
    graph.define("R1", ComponentNode::resistor(ohms)).unwrap();
    graph.link("W1", ("V1", "pos"), ("R1", "p1"), wire).unwrap();
    graph.link("W2", ("R1", "p2"), ("V1", "neg"), wire).unwrap();
    graph
}

proptest! {
    #[test]
    fn labels_stay_unique(labels in prop::collection::vec("[a-d]{1,2}", 1..30)) {
        let mut graph = CircuitGraph::new();
        let mut seen = HashSet::new();

        for label in &labels {
            let result = graph.define(label.as_str(), ComponentNode::resistor(100.0));
            if seen.insert(label.clone()) {
                prop_assert!(result.is_ok());
            } else {
                let is_duplicate = matches!(result, Err(CographError::DuplicateLabel { .. }));
                prop_assert!(is_duplicate);
            }
        }

        let defined: Vec<&str> = graph.labels().collect();
        let unique: HashSet<&str> = defined.iter().copied().collect();
        prop_assert_eq!(defined.len(), unique.len());
        prop_assert_eq!(defined.len(), seen.len());
    }

    #[test]
    fn line_labels_share_the_namespace(label in "[A-Z][0-9]") {
        let mut graph = ohm(5.0, 1000.0, IDEAL);
        let taken = graph.labels().any(|l| l == label);
        let result = graph.link(label.as_str(), ("V1", "pos"), ("R1", "p1"), IDEAL);
        prop_assert_eq!(result.is_err(), taken);
    }

    #[test]
    fn links_to_missing_pins_are_rejected(pin in "[a-z]{1,4}[0-9]?") {
        prop_assume!(pin != "p1" && pin != "p2");
        let mut graph = CircuitGraph::new();
        graph.define("V1", ComponentNode::voltage_dc(5.0)).unwrap();
        graph.define("R1", ComponentNode::resistor(1000.0)).unwrap();

        let err = graph
            .link("W1", ("V1", "pos"), ("R1", pin.as_str()), IDEAL)
            .unwrap_err();
        prop_assert_eq!(err, CographError::unknown_pin("R1", pin.as_str()));
        prop_assert!(graph.edge("W1").is_none());
        prop_assert!(graph.component("V1").unwrap().connected_pins().is_empty());
    }

    #[test]
    fn ohms_law_holds(volts in 0.5f64..20.0, ohms in 10.0f64..100_000.0) {
        let mut graph = ohm(volts, ohms, IDEAL);
        graph.advance_tick().unwrap();

        let expected = volts / ohms;
        let current = graph.edge_state("W1").unwrap().current_amps;
        prop_assert!((current - expected).abs() <= 1e-9 * expected.max(1.0));

        let drop = graph.edge_state("W1").unwrap().potential_volts
            - graph.edge_state("W2").unwrap().potential_volts;
        prop_assert!((drop - volts).abs() <= 1e-9 * volts.max(1.0));
    }

    #[test]
    fn ticks_advance_by_one(ticks in 1u64..8) {
        let mut graph = ohm(5.0, 1000.0, PhysicalProperties::HOOKUP_WIRE);
        for expected in 1..=ticks {
            let result = graph.advance_tick().unwrap();
            prop_assert_eq!(result.tick, expected);
            prop_assert_eq!(graph.tick(), expected);
        }
    }

    #[test]
    fn detach_attach_is_idempotent(repeats in 1usize..4) {
        let mut graph = ohm(5.0, 1000.0, IDEAL);
        graph.advance_tick().unwrap();

        for _ in 0..repeats {
            graph.detach("W1").unwrap();
        }
        prop_assert!(graph.component("R1").unwrap().pin_lines("p1").unwrap().is_empty());
        for _ in 0..repeats {
            graph.attach("W1").unwrap();
        }
        prop_assert_eq!(graph.component("R1").unwrap().pin_lines("p1").unwrap().len(), 1);

        graph.advance_tick().unwrap();
        let current = graph.edge_state("W1").unwrap().current_amps;
        prop_assert!((current - 0.005).abs() < 1e-9);
    }
}

#[test]
fn queries_do_not_disturb_ticks() {
    let mut quiet = ohm(5.0, 1000.0, PhysicalProperties::HOOKUP_WIRE);
    let mut busy = ohm(5.0, 1000.0, PhysicalProperties::HOOKUP_WIRE);

    for _ in 0..3 {
        let _ = busy.labels().count();
        let _ = busy.incoming_view("R1").unwrap();
        let _ = busy.kirchhoff_residual();
        let _ = busy.asserted("V1");
        let _ = busy.to_string();

        let a = quiet.advance_tick().unwrap();
        let b = busy.advance_tick().unwrap();
        assert_eq!(a.edges, b.edges);
        assert_eq!(a.iterations, b.iterations);
    }
}

#[test]
fn unrecognised_items_are_rejected() {
    let mut graph = CircuitGraph::new();
    let err = graph.define_any("X1", "not a component").unwrap_err();
    assert!(matches!(err, CographError::UnrecognizedItemType { .. }));
    assert_eq!(graph.labels().count(), 0);
}
