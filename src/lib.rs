//! # Cograph
//!
//! A tick-driven electrical circuit simulator built on a labelled graph.
//!
//! This library provides:
//! - A graph of labelled components joined pin-to-pin by line edges
//! - Component models (resistors, capacitors, voltage and current sources)
//!   that each see only their own pins
//! - A tick driver that reconciles what the two ends of every line assert
//!   until the whole circuit agrees, then commits the new line states
//!
//! ## Architecture
//!
//! - [`circuit`] - Graph construction, line edges and electrical state types
//! - [`components`] - Component nodes: lifecycle, pins, attributes and
//!   transfer functions
//! - [`solver`] - Per-line reconciliation and the tick driver
//! - [`error`] - Error types
//!
//! ## Usage
//!
//! ```
//! use cograph::{CircuitGraph, ComponentNode, PhysicalProperties};
//!
//! let mut graph = CircuitGraph::new();
//! graph.define("V1", ComponentNode::voltage_dc(5.0))?;
//! graph.define("R1", ComponentNode::resistor(1000.0))?;
//! graph.link("W1", ("V1", "pos"), ("R1", "p1"), PhysicalProperties::IDEAL_CONDUCTOR)?;
//! graph.link("W2", ("R1", "p2"), ("V1", "neg"), PhysicalProperties::IDEAL_CONDUCTOR)?;
//!
//! let result = graph.advance_tick()?;
//! assert_eq!(result.tick, 1);
//! let current = graph.edge_state("W1").map(|s| s.current_amps).unwrap_or_default();
//! assert!((current - 0.005).abs() < 1e-9);
//! # Ok::<(), cograph::CographError>(())
//! ```
//!
//! ## Tick Method
//!
//! Every tick is a synchronous superstep:
//!
//! 1. Each active component reads the committed state of its lines and
//!    asserts a potential, current and impedance for each pin
//! 2. Each line reconciles the assertions at its two ends; lines that
//!    disagree are relaxed and their components evaluated again
//! 3. Once every line agrees the new states are committed and the tick
//!    counter advances
//!
//! Reactive elements are discretised with backward Euler, one step per tick.

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{ApparentEMFState, CircuitGraph, EdgeId, PhysicalProperties, PinMap, PinState};
pub use components::{ComponentKind, ComponentNode, Lifecycle};
pub use error::{CographError, Result};
pub use solver::{SimulatorConfig, TickResult};

/// Reference temperature for basis properties, in °C.
pub const REFERENCE_TEMPERATURE_C: f64 = 25.0;
