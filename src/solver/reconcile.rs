//! Reconciliation of the two assertions made at the ends of a line.

use crate::circuit::ApparentEMFState;

use super::MIN_RESISTANCE;

/// What one endpoint asserts about a single line.
///
/// `current` is the share of the pin current attributed to this line,
/// flowing into the component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointAssertion {
    pub potential: f64,
    pub current: f64,
    pub impedance: f64,
}

impl EndpointAssertion {
    pub fn new(potential: f64, current: f64, impedance: f64) -> Self {
        Self {
            potential,
            current,
            impedance,
        }
    }
}

/// Outcome of reconciling one line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    /// New line state, measured at the `u` end
    pub state: ApparentEMFState,
    /// Both ends already agreed within tolerance
    pub agreed: bool,
    /// Larger of the current and potential disagreement
    pub mismatch: f64,
}

/// Reconcile the assertions at the `u` end (`a`) and `v` end (`b`) of a
/// line with series resistance `line_resistance`.
///
/// When the ends agree the line takes their common state. Otherwise the
/// line current is the intersection of both Thevenin lines:
/// ```text
/// I = (Va - Vb - Za ia + Zb ib) / (Za + Zb + Re)
/// ```
/// and the potentials are read from the stiffer end.
pub fn reconcile(
    a: &EndpointAssertion,
    b: &EndpointAssertion,
    line_resistance: f64,
    tolerance: f64,
) -> Reconciled {
    let re = line_resistance;
    let current = (b.current - a.current) / 2.0;
    let current_mismatch = (a.current + b.current).abs();
    let potential_mismatch = (a.potential - b.potential - current * re).abs();
    let mismatch = current_mismatch.max(potential_mismatch);

    if mismatch <= tolerance {
        let potential = (a.potential + b.potential + current * re) / 2.0;
        return Reconciled {
            state: ApparentEMFState::new(potential, current),
            agreed: true,
            mismatch,
        };
    }

    let total = a.impedance + b.impedance + re;
    let state = if total < MIN_RESISTANCE {
        // Two stiff ends on a lossless line
        ApparentEMFState::new((a.potential + b.potential) / 2.0, current)
    } else {
        let i = (a.potential - b.potential - a.impedance * a.current + b.impedance * b.current) / total;
        let potential = if a.impedance <= b.impedance {
            a.potential + a.impedance * (-i - a.current)
        } else {
            b.potential + b.impedance * (i - b.current) + i * re
        };
        ApparentEMFState::new(potential, i)
    };

    Reconciled {
        state,
        agreed: false,
        mismatch,
    }
}
