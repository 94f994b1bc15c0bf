//! Bounded intervals on the real line.
//!
//! An [`Interval`] carries a lower and an upper bound, each independently
//! inclusive or exclusive. Solvers use it to describe their search domain.

use std::fmt;

use lattice_core::{ensure, Result};
use num_traits::Float;

/// A bounded interval with independently inclusive/exclusive endpoints.
///
/// Intervals are immutable once built. Degenerate intervals (`lower ==
/// upper`) are allowed only when both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval<T> {
    lower: T,
    upper: T,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

impl<T: Float + fmt::Debug> Interval<T> {
    /// Build an interval with explicit endpoint flags.
    ///
    /// # Errors
    /// `InvalidArgument` if either bound is not finite, if `lower > upper`,
    /// or if the interval is empty (`lower == upper` with an open end).
    pub fn new(lower: T, lower_inclusive: bool, upper: T, upper_inclusive: bool) -> Result<Self> {
        ensure!(
            lower.is_finite() && upper.is_finite(),
            "interval bounds must be finite, got [{lower:?}, {upper:?}]"
        );
        ensure!(
            lower <= upper,
            "interval lower bound {lower:?} exceeds upper bound {upper:?}"
        );
        ensure!(
            lower < upper || (lower_inclusive && upper_inclusive),
            "interval ({lower:?}, {upper:?}) is empty"
        );
        Ok(Self {
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        })
    }

    /// `[lower, upper]`
    pub fn closed(lower: T, upper: T) -> Result<Self> {
        Self::new(lower, true, upper, true)
    }

    /// `(lower, upper)`
    pub fn open(lower: T, upper: T) -> Result<Self> {
        Self::new(lower, false, upper, false)
    }

    /// Lower bound.
    pub fn lower(&self) -> T {
        self.lower
    }

    /// Upper bound.
    pub fn upper(&self) -> T {
        self.upper
    }

    /// Whether the lower bound belongs to the interval.
    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    /// Whether the upper bound belongs to the interval.
    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }

    /// `upper − lower`.
    pub fn width(&self) -> T {
        self.upper - self.lower
    }

    /// Midpoint of the bounds.
    pub fn midpoint(&self) -> T {
        self.lower + (self.upper - self.lower) / (T::one() + T::one())
    }

    /// Return `true` if `x` lies in the interval, honouring the endpoint flags.
    pub fn contains(&self, x: T) -> bool {
        let above = if self.lower_inclusive {
            x >= self.lower
        } else {
            x > self.lower
        };
        let below = if self.upper_inclusive {
            x <= self.upper
        } else {
            x < self.upper
        };
        above && below
    }
}

impl<T: fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lower_inclusive { '[' } else { '(' };
        let close = if self.upper_inclusive { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.lower, self.upper)
    }
}
