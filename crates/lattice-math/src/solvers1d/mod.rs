//! 1D root-finding solvers.
//!
//! The [`Bisection`] solver inverts a scalar function over an [`Interval`]:
//! it looks for `x` with `|f(x) − target| < tolerance`. Failing to bracket a
//! root, or running out of iterations, is an ordinary outcome reported as
//! `None` so callers can retry with a wider interval.

use std::fmt;

use lattice_core::{ensure, Result, Settings};
use num_traits::Float;

use crate::interval::Interval;

// ── Bisection ────────────────────────────────────────────────────────────────

/// Bisection solver with a bounded number of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bisection {
    max_iterations: u32,
}

impl Default for Bisection {
    /// Uses the iteration cap from the global [`Settings`].
    fn default() -> Self {
        Self {
            max_iterations: Settings::instance().max_bisection_iterations(),
        }
    }
}

impl Bisection {
    /// Solver using the default iteration cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Solver with an explicit iteration cap.
    pub fn with_max_iterations(max_iterations: u32) -> Self {
        Self { max_iterations }
    }

    /// The iteration cap.
    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Find `x` in `domain` such that `|f(x) − target| < tolerance`.
    ///
    /// Returns `Ok(None)` when `f − target` does not change sign over the
    /// interval, when an endpoint evaluates to a non-finite value, or when
    /// the iteration cap is reached.
    ///
    /// # Errors
    /// `InvalidArgument` if `tolerance` is not finite and strictly positive,
    /// or if `target` is not finite.
    pub fn solve<T, F>(
        &self,
        f: F,
        domain: &Interval<T>,
        target: T,
        tolerance: T,
    ) -> Result<Option<T>>
    where
        T: Float + fmt::Debug,
        F: Fn(T) -> T,
    {
        ensure!(
            tolerance.is_finite() && tolerance > T::zero(),
            "bisection tolerance must be positive, got {tolerance:?}"
        );
        ensure!(
            target.is_finite(),
            "bisection target must be finite, got {target:?}"
        );

        let mut lo = domain.lower();
        let mut hi = domain.upper();
        let g_lo = f(lo) - target;
        let g_hi = f(hi) - target;

        if !g_lo.is_finite() || !g_hi.is_finite() {
            tracing::debug!(?lo, ?hi, "bisection: non-finite value at an endpoint");
            return Ok(None);
        }
        if domain.is_lower_inclusive() && g_lo.abs() < tolerance {
            return Ok(Some(lo));
        }
        if domain.is_upper_inclusive() && g_hi.abs() < tolerance {
            return Ok(Some(hi));
        }
        if g_lo.signum() == g_hi.signum() {
            tracing::debug!(?lo, ?hi, "bisection: no sign change over interval");
            return Ok(None);
        }

        let two = T::one() + T::one();
        let mut g_lo = g_lo;
        for iteration in 0..self.max_iterations {
            let mid = lo + (hi - lo) / two;
            let g_mid = f(mid) - target;
            tracing::trace!(iteration, ?mid, ?g_mid, "bisection step");

            if !g_mid.is_finite() {
                return Ok(None);
            }
            if g_mid.abs() < tolerance {
                return Ok(Some(mid));
            }
            if g_mid.signum() == g_lo.signum() {
                lo = mid;
                g_lo = g_mid;
            } else {
                hi = mid;
            }
        }

        tracing::debug!(
            max_iterations = self.max_iterations,
            "bisection: iteration cap reached"
        );
        Ok(None)
    }
}

/// Bisection with the default iteration cap.
///
/// Shorthand for `Bisection::default().solve(f, domain, target, tolerance)`.
pub fn bisection<T, F>(f: F, domain: &Interval<T>, target: T, tolerance: T) -> Result<Option<T>>
where
    T: Float + fmt::Debug,
    F: Fn(T) -> T,
{
    Bisection::default().solve(f, domain, target, tolerance)
}
