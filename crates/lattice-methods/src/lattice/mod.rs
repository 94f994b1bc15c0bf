//! Lattice methods for option pricing.
//!
//! # Overview
//!
//! * [`LatticeIndex`]: closed-form index arithmetic for recombining
//!   lattices with any branch factor
//! * [`LatticeTree`]: arena of [`Node`]s with forward and backward
//!   traversal
//! * [`BranchingScheme`]: per-step shifts and probabilities: CRR binomial
//!   and trinomial, equal-probability, Trigeorgis, Tian
//! * [`LatticePricer`]: backward-induction pricing, greeks, implied
//!   volatility and batch pricing
//!
//! # Example
//!
//! ```
//! use lattice_methods::lattice::{CoxRossRubinstein, LatticePricer, TreeVariables};
//!
//! let vars = TreeVariables::from_maturity(0.2, 1.0, 2, 0.05, 0.0).unwrap();
//! let call = |s: f64| (s - 100.0).max(0.0);
//! let v = LatticePricer::new(CoxRossRubinstein, 2)
//!     .price_continuous(100.0, &vars, call)
//!     .unwrap();
//! assert!((v.value - 9.5405).abs() < 1e-2);
//! ```

pub mod branching;
pub mod index;
pub mod pricer;
pub mod tree;

pub use branching::{
    Branching, BranchingScheme, CoxRossRubinstein, CrrTrinomial, EqualProbability, Tian,
    TreeVariables, Trigeorgis,
};
pub use index::LatticeIndex;
pub use pricer::{
    continuous_discount, Exercise, LatticePricer, LatticeValuation, PricingRequest, PricingState,
};
pub use tree::{LatticeTree, Node};
