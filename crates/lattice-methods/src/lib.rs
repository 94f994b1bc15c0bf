//! # lattice-methods
//!
//! Recombining lattice methods for derivative pricing.
//!
//! # Modules
//!
//! * [`lattice`]: index arithmetic, the node arena, branching models and
//!   the backward-induction pricer

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Lattice methods: index arithmetic, trees, branching models, pricing.
pub mod lattice;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use lattice::{
    continuous_discount, Branching, BranchingScheme, CoxRossRubinstein, CrrTrinomial,
    EqualProbability, Exercise, LatticeIndex, LatticePricer, LatticeTree, LatticeValuation, Node,
    PricingRequest, PricingState, Tian, TreeVariables, Trigeorgis,
};
