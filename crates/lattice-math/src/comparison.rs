//! Tolerant floating-point checks used when validating lattice inputs.

use lattice_core::Real;

/// Tolerance used when checking that branch probabilities sum to one.
pub const PROBABILITY_TOLERANCE: Real = 1e-9;

/// `true` if `|a − b| ≤ tolerance`.
#[inline]
pub fn close(a: Real, b: Real, tolerance: Real) -> bool {
    (a - b).abs() <= tolerance
}

/// `true` if every value is finite and the total is within
/// [`PROBABILITY_TOLERANCE`] of one.
pub fn sums_to_one(probabilities: &[Real]) -> bool {
    probabilities.iter().all(|p| p.is_finite())
        && close(probabilities.iter().sum(), 1.0, PROBABILITY_TOLERANCE)
}
