//! Tick solver.
//!
//! Each tick every active component evaluates its transfer function
//! against the committed pin view, and every attached line reconciles the
//! two assertions made at its ends. Lines whose ends disagree are relaxed
//! to the Thevenin intersection of both assertions and their components
//! are evaluated again, until every line agrees within tolerance.
//!
//! An assertion `(V*, i*, Z)` made at a pin describes the line
//! ```text
//! V = V* + Z (i - i*)
//! ```
//! where `i` is the current flowing into the component. A line of series
//! resistance `Re` carrying current `I` from `u` to `v` has
//! `i_u = -I`, `i_v = I` and `V_u - V_v = I Re`.

mod reconcile;
mod simulator;

pub use reconcile::{reconcile, EndpointAssertion, Reconciled};
pub use simulator::{SimulatorConfig, TickResult};
pub(crate) use simulator::Topology;

/// Agreement tolerance, applied to volts and amps alike.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Maximum relaxation iterations per tick.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Minimum resistance, to keep impedance sums away from zero.
pub const MIN_RESISTANCE: f64 = 1e-12;

/// Impedance asserted by a pin that cannot carry current.
pub const OPEN_CIRCUIT_RESISTANCE: f64 = 1e12;
