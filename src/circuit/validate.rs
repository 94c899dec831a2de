//! Circuit validation.

use crate::error::{CographError, Result};

use super::edge::Endpoint;
use super::CircuitGraph;

/// Resolve a `(label, pin)` pair to an endpoint, checking that the label
/// names a component and that the pin is in its basis table.
pub(crate) fn resolve_endpoint(graph: &CircuitGraph, (label, pin): (&str, &str)) -> Result<Endpoint> {
    let id = graph
        .component_id(label)
        .ok_or_else(|| CographError::unknown_label(label))?;
    if !graph.components[id.0].node.pins().contains(pin) {
        return Err(CographError::unknown_pin(label, pin));
    }
    Ok(Endpoint::new(id, pin))
}

/// Validate a circuit graph for simulation.
///
/// Checks:
/// - Every attached line is registered at both of its endpoint pins
/// - Every registration at a pin refers to an attached line ending there
/// - Each line has a committed state
pub fn validate_circuit(graph: &CircuitGraph) -> Result<()> {
    if graph.committed.len() != graph.lines.len() {
        return Err(CographError::invalid_topology(format!(
            "{} lines but {} committed states",
            graph.lines.len(),
            graph.committed.len()
        )));
    }

    for entry in &graph.lines {
        let edge = &entry.edge;
        for end in [edge.u(), edge.v()] {
            let registered = graph
                .components
                .get(end.component.0)
                .and_then(|c| c.node.pin_lines(&end.pin))
                .is_some_and(|lines| lines.contains_key(&edge.id()));
            if registered != edge.is_attached() {
                return Err(CographError::invalid_topology(format!(
                    "line '{}' is {} but {} registered at {}:{}",
                    entry.label,
                    if edge.is_attached() { "attached" } else { "detached" },
                    if registered { "is" } else { "is not" },
                    graph.component_label(end.component),
                    end.pin
                )));
            }
        }
    }

    for entry in &graph.components {
        for (pin, slot) in entry.node.pins().iter() {
            for edge_id in slot.lines.keys() {
                let ends_here = graph
                    .edge_index
                    .get(edge_id)
                    .map(|line| &graph.lines[line.0].edge)
                    .is_some_and(|edge| {
                        edge.is_attached()
                            && [edge.u(), edge.v()].iter().any(|end| {
                                graph.components[end.component.0].label == entry.label
                                    && end.pin == pin
                            })
                    });
                if !ends_here {
                    return Err(CographError::invalid_topology(format!(
                        "pin {}:{} holds unknown line {}",
                        entry.label, pin, edge_id
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::PhysicalProperties;
    use crate::components::ComponentNode;
    use crate::circuit::EdgeId;

    #[test]
    fn test_linked_graph_is_valid() {
        let mut graph = CircuitGraph::new();
        graph.define("V1", ComponentNode::voltage_dc(5.0)).unwrap();
        graph.define("R1", ComponentNode::resistor(1000.0)).unwrap();
        graph
            .link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();
        assert!(validate_circuit(&graph).is_ok());

        graph.detach("W1").unwrap();
        assert!(validate_circuit(&graph).is_ok());
    }

    #[test]
    fn test_stray_registration_is_reported() {
        let mut node = ComponentNode::resistor(1000.0);
        node.on_line_connect("p1", EdgeId::new(), PhysicalProperties::HOOKUP_WIRE)
            .unwrap();
        let mut graph = CircuitGraph::new();
        graph.define("R1", node).unwrap();
        assert!(matches!(
            validate_circuit(&graph),
            Err(CographError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_resolve_endpoint() {
        let mut graph = CircuitGraph::new();
        graph.define("R1", ComponentNode::resistor(1000.0)).unwrap();
        assert_eq!(
            resolve_endpoint(&graph, ("R1", "p2")).unwrap().pin,
            "p2"
        );
        assert_eq!(
            resolve_endpoint(&graph, ("R1", "base")).unwrap_err(),
            CographError::unknown_pin("R1", "base")
        );
    }
}
