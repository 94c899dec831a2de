//! Error types for the cograph circuit simulator.
//!
//! This module provides a unified error type [`CographError`] that covers
//! all error conditions that can occur during graph construction, component
//! connectivity changes, and tick processing.

use thiserror::Error;

use crate::circuit::EdgeId;

/// Result type alias using [`CographError`].
pub type Result<T> = std::result::Result<T, CographError>;

/// Unified error type for all cograph operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CographError {
    // ============ Construction Errors ============
    /// A label is already taken by a component or a line
    #[error("Label '{label}' is already defined")]
    DuplicateLabel { label: String },

    /// `define` received something that is neither a component nor a line
    #[error("Cannot define '{label}': unrecognised item type {type_name}")]
    UnrecognizedItemType { label: String, type_name: String },

    /// A label is not defined, or names the wrong kind of item
    #[error("Unknown label '{label}'")]
    UnknownLabel { label: String },

    /// Invalid circuit topology
    #[error("Invalid circuit topology: {message}")]
    InvalidTopology { message: String },

    // ============ Connectivity Errors ============
    /// Pin not present in the component's basis table
    #[error("Unknown pin '{pin}' on '{component}'")]
    UnknownPin { component: String, pin: String },

    /// Edge was never connected to the pin
    #[error("Unknown edge {edge} on pin '{pin}'")]
    UnknownEdge { pin: String, edge: EdgeId },

    // ============ Simulation Errors ============
    /// Transfer function invoked outside the Active/connected state
    #[error("Component '{component}' is not ready for tick processing ({lifecycle})")]
    ComponentNotReady { component: String, lifecycle: String },

    /// Relaxation did not converge within the iteration cap
    #[error("Tick {tick} did not converge after {iterations} iterations (residual: {residual:.2e} on line '{edge}')")]
    ConvergenceFailure {
        tick: u64,
        iterations: usize,
        residual: f64,
        edge: String,
    },

    /// Invalid simulation parameter
    #[error("Invalid simulation parameter: {message}")]
    InvalidSimulationParam { message: String },
}

impl CographError {
    /// Create an unknown pin error
    pub fn unknown_pin(component: impl Into<String>, pin: impl Into<String>) -> Self {
        Self::UnknownPin {
            component: component.into(),
            pin: pin.into(),
        }
    }

    /// Create an unknown label error
    pub fn unknown_label(label: impl Into<String>) -> Self {
        Self::UnknownLabel {
            label: label.into(),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create an invalid simulation parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidSimulationParam {
            message: message.into(),
        }
    }

    /// Create a convergence failure error
    pub fn convergence_failure(
        tick: u64,
        iterations: usize,
        residual: f64,
        edge: impl Into<String>,
    ) -> Self {
        Self::ConvergenceFailure {
            tick,
            iterations,
            residual,
            edge: edge.into(),
        }
    }

    /// Name `label` as the component in errors raised by a component node.
    pub fn with_component(self, label: impl Into<String>) -> Self {
        match self {
            Self::UnknownPin { pin, .. } => Self::UnknownPin {
                component: label.into(),
                pin,
            },
            Self::ComponentNotReady { lifecycle, .. } => Self::ComponentNotReady {
                component: label.into(),
                lifecycle,
            },
            other => other,
        }
    }

    /// Whether the error came from the tick driver rather than construction.
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            Self::ConvergenceFailure { .. } | Self::ComponentNotReady { .. }
        )
    }
}
