//! # lattice-math
//!
//! Mathematical utilities used by the lattice engine: bounded intervals,
//! floating-point comparison helpers and the bisection root finder.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Floating-point comparison utilities.
pub mod comparison;

/// Bounded intervals with inclusive/exclusive endpoints.
pub mod interval;

/// 1D root-finding solvers.
pub mod solvers1d;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use comparison::{close, sums_to_one};
pub use interval::Interval;
pub use solvers1d::{bisection, Bisection};
