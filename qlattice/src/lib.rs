//! # qlattice
//!
//! Recombining lattices for option pricing: a flat node arena with
//! closed-form index arithmetic, pluggable branching schemes, and
//! backward-induction valuation with greeks.
//!
//! This crate is a **façade** that re-exports all public items from the
//! underlying workspace crates. Application code should depend on this
//! crate rather than the individual `lattice-*` crates.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! qlattice = "0.1"
//! ```
//!
//! ```rust
//! use qlattice::methods::lattice::{CoxRossRubinstein, LatticePricer, TreeVariables};
//!
//! let vars = TreeVariables::from_maturity(0.2, 1.0, 100, 0.05, 0.0)?;
//! let put = |s: f64| (100.0 - s).max(0.0);
//! let valuation = LatticePricer::new(CoxRossRubinstein, 100)
//!     .price_continuous(100.0, &vars, put)?;
//! assert!(valuation.value > 5.0 && valuation.value < 6.5);
//! # Ok::<(), qlattice::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, aliases, settings and error definitions.
pub use lattice_core as core;

/// Tolerant comparison, intervals and root finding.
pub use lattice_math as math;

/// Lattice index, tree, branching schemes and pricer.
pub use lattice_methods as methods;
