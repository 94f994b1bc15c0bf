//! Error types for qlattice.
//!
//! Every fallible operation in the workspace returns [`Result`], whose error
//! side is the single `thiserror`-derived [`Error`] enum below. Input
//! validation goes through the [`ensure!`](crate::ensure) macro, numeric
//! invariants checked after a computation through
//! [`ensure_post!`](crate::ensure_post), and unexpected internal states
//! through [`fail!`](crate::fail).
//!
//! A bisection search that cannot bracket a root is *not* an error; it is
//! reported as `None` by the solver.

use thiserror::Error;

/// The top-level error type used throughout qlattice.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error.
    #[error("{0}")]
    Runtime(String),

    /// Invalid configuration or out-of-domain input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A numeric invariant failed to hold after a computation.
    #[error("postcondition not satisfied: {0}")]
    Postcondition(String),

    /// Index out of range.
    #[error("index ({index}) out of range [0, {size})")]
    IndexOutOfRange {
        /// The index that was out of range.
        index: usize,
        /// The size of the container.
        size: usize,
    },

    /// A requested allocation exceeds the configured ceiling.
    #[error("resource limit exceeded: {}, limit is {limit}", requested_nodes(.requested))]
    ResourceLimit {
        /// The number of nodes requested; `usize::MAX` when the count does
        /// not fit in `usize`.
        requested: usize,
        /// The configured maximum.
        limit: usize,
    },
}

fn requested_nodes(requested: &usize) -> String {
    if *requested == usize::MAX {
        "node count does not fit in usize".to_owned()
    } else {
        format!("{requested} nodes requested")
    }
}

/// Shorthand `Result` type used throughout qlattice.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Validate an input, returning `Err(Error::InvalidArgument(...))` if
/// `$cond` is false.
///
/// # Example
/// ```
/// use lattice_core::{ensure, Error, Result};
///
/// fn step_size(maturity: f64, steps: usize) -> Result<f64> {
///     ensure!(steps > 0, "number of steps must be positive");
///     Ok(maturity / steps as f64)
/// }
/// assert_eq!(step_size(1.0, 4), Ok(0.25));
/// assert!(matches!(step_size(1.0, 0), Err(Error::InvalidArgument(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::InvalidArgument(
                format!($($msg)*)
            ));
        }
    };
}

/// Check a computed result, returning `Err(Error::Postcondition(...))` if
/// `$cond` is false.
///
/// # Example
/// ```
/// use lattice_core::{ensure_post, Error, Result};
///
/// fn down_probability(p_up: f64) -> Result<f64> {
///     let p_down = 1.0 - p_up;
///     ensure_post!((0.0..=1.0).contains(&p_down), "p_down {p_down} outside [0, 1]");
///     Ok(p_down)
/// }
/// assert!(down_probability(0.6).is_ok());
/// assert!(matches!(down_probability(1.5), Err(Error::Postcondition(_))));
/// ```
#[macro_export]
macro_rules! ensure_post {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Postcondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Return `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use lattice_core::{fail, Error, Result};
///
/// fn root_value(value: Option<f64>) -> Result<f64> {
///     match value {
///         Some(v) => Ok(v),
///         None => fail!("root has not been valued"),
///     }
/// }
/// assert!(matches!(root_value(None), Err(Error::Runtime(_))));
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}
