//! Circuit graph representation and validation.
//!
//! This module provides the labelled graph the simulator runs on. The
//! [`CircuitGraph`] owns every component and line edge, the committed
//! electrical state of each line, and the global tick counter.

mod edge;
mod graph;
mod types;
mod validate;

pub use edge::{Endpoint, LineEdge};
pub use graph::{CircuitGraph, GraphItem};
pub use types::*;
pub use validate::validate_circuit;
