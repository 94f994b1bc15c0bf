//! Backward-induction pricing on a recombining lattice.
//!
//! [`LatticePricer`] combines a [`BranchingScheme`], a [`LatticeTree`], a
//! caller-supplied payoff and a discount function:
//!
//! 1. the scheme's branch factor sizes a tree of `steps` steps;
//! 2. a forward pass writes the underlying price at every node, starting
//!    from the spot and applying the shift of the branch taken;
//! 3. a backward pass writes the payoff at the leaves and
//!    `df · Σ p_k · V_k` at interior nodes (or the larger of that and the
//!    immediate payoff under [`Exercise::American`]);
//! 4. the root value is returned together with delta and gamma read off
//!    the first levels of the lattice.

use std::cell::RefCell;

use lattice_core::{
    ensure, ensure_post, DiscountFactor, Error, Price, Rate, Real, Result, Time, Volatility,
};
use lattice_math::{Bisection, Interval};
use rayon::prelude::*;

use super::{Branching, BranchingScheme, LatticeTree, Node, TreeVariables};

/// Continuously compounded discount factor `exp(−r·t)`.
pub fn continuous_discount(rate: Rate, t: Time) -> DiscountFactor {
    (-rate * t).exp()
}

/// Exercise style applied during backward induction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exercise {
    /// Payoff at the final step only.
    #[default]
    European,
    /// Payoff available at every node.
    American,
}

/// Node payload used by the pricer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingState {
    underlying: Price,
    value: Option<Price>,
}

impl PricingState {
    /// Underlying price at the node.
    pub fn underlying(&self) -> Price {
        self.underlying
    }

    /// Option value at the node; `None` until the backward pass ran.
    pub fn value(&self) -> Option<Price> {
        self.value
    }
}

/// Result of a lattice valuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeValuation {
    /// Value at the root.
    pub value: Price,
    /// First derivative with respect to the spot, from the first level.
    pub delta: Option<Real>,
    /// Second derivative with respect to the spot, from the first level
    /// holding at least three nodes.
    pub gamma: Option<Real>,
    /// Number of steps of the lattice.
    pub steps: usize,
    /// Number of nodes of the lattice.
    pub nodes: usize,
}

/// One independent pricing request for [`LatticePricer::price_batch`].
#[derive(Debug, Clone)]
pub struct PricingRequest<P> {
    /// Spot price of the underlying.
    pub spot: Price,
    /// Market inputs.
    pub vars: TreeVariables,
    /// Payoff as a function of the underlying price.
    pub payoff: P,
}

/// Prices payoffs on a recombining lattice built from a branching scheme.
#[derive(Debug, Clone)]
pub struct LatticePricer<S> {
    scheme: S,
    steps: usize,
    exercise: Exercise,
    max_nodes: Option<usize>,
}

impl<S: BranchingScheme> LatticePricer<S> {
    /// European pricer with `steps` steps and the global node ceiling.
    pub fn new(scheme: S, steps: usize) -> Self {
        Self {
            scheme,
            steps,
            exercise: Exercise::European,
            max_nodes: None,
        }
    }

    /// Set the exercise style.
    pub fn with_exercise(mut self, exercise: Exercise) -> Self {
        self.exercise = exercise;
        self
    }

    /// Override the node ceiling for lattices built by this pricer.
    pub fn with_node_limit(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    /// The branching scheme.
    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    /// Number of steps.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Exercise style.
    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    /// Build the lattice and run the forward pass only.
    ///
    /// Every node holds its underlying price; values are unset.
    pub fn build(&self, spot: Price, vars: &TreeVariables) -> Result<LatticeTree<PricingState>> {
        let branching = self.checked_branching(spot, vars)?;
        self.forward(spot, &branching)
    }

    /// Value `payoff` with per-step discount factor `discount(r, Δt)`.
    ///
    /// # Errors
    /// `InvalidArgument` for a non-positive spot, a discount factor that is
    /// not finite and positive, or a payoff that returns a non-finite value;
    /// `Postcondition` if the scheme cannot produce valid probabilities for
    /// `vars`; `ResourceLimit` if the lattice is too large.
    pub fn price<P, D>(
        &self,
        spot: Price,
        vars: &TreeVariables,
        payoff: P,
        discount: D,
    ) -> Result<LatticeValuation>
    where
        P: Fn(Price) -> Price,
        D: Fn(Rate, Time) -> DiscountFactor,
    {
        let branching = self.checked_branching(spot, vars)?;
        let df = discount(vars.risk_free_rate(), vars.dt());
        ensure!(
            df.is_finite() && df > 0.0,
            "discount factor must be finite and positive, got {df}"
        );

        let mut tree = self.forward(spot, &branching)?;
        self.backward(&mut tree, &branching, df, &payoff)?;

        let valuation = LatticeValuation {
            value: node_value(tree.root())?,
            delta: delta(&tree)?,
            gamma: gamma(&tree)?,
            steps: tree.steps(),
            nodes: tree.len(),
        };
        tracing::debug!(
            scheme = self.scheme.name(),
            steps = self.steps,
            exercise = ?self.exercise,
            value = valuation.value,
            "lattice valuation"
        );
        Ok(valuation)
    }

    /// [`price`](Self::price) with continuous discounting at the risk-free
    /// rate.
    pub fn price_continuous<P>(
        &self,
        spot: Price,
        vars: &TreeVariables,
        payoff: P,
    ) -> Result<LatticeValuation>
    where
        P: Fn(Price) -> Price,
    {
        self.price(spot, vars, payoff, continuous_discount)
    }

    /// Volatility at which the lattice value equals `target`.
    ///
    /// Bisects over `domain` with all other inputs taken from `vars`.
    /// Returns `Ok(None)` when the target is not bracketed or the solver
    /// runs out of iterations; errors raised while pricing are returned.
    pub fn implied_volatility<P>(
        &self,
        target: Price,
        spot: Price,
        vars: &TreeVariables,
        payoff: P,
        domain: &Interval<Volatility>,
        tolerance: Real,
    ) -> Result<Option<Volatility>>
    where
        P: Fn(Price) -> Price,
    {
        ensure!(
            domain.lower() > 0.0,
            "volatility search domain must be strictly positive, got {domain}"
        );
        let failure: RefCell<Option<Error>> = RefCell::new(None);
        let objective = |sigma: Volatility| {
            let priced = vars
                .with_volatility(sigma)
                .and_then(|v| self.price_continuous(spot, &v, &payoff));
            match priced {
                Ok(valuation) => valuation.value,
                Err(e) => {
                    failure.borrow_mut().get_or_insert(e);
                    Real::NAN
                }
            }
        };
        let solved = Bisection::default().solve(objective, domain, target, tolerance)?;
        if let Some(e) = failure.into_inner() {
            return Err(e);
        }
        Ok(solved)
    }

    fn checked_branching(&self, spot: Price, vars: &TreeVariables) -> Result<Branching> {
        ensure!(
            spot.is_finite() && spot > 0.0,
            "spot must be finite and positive, got {spot}"
        );
        let branching = self.scheme.branching(vars)?;
        ensure_post!(
            branching.branches() == self.scheme.branches(),
            "{} produced {} branches, expected {}",
            self.scheme.name(),
            branching.branches(),
            self.scheme.branches()
        );
        Ok(branching)
    }

    fn new_tree(&self) -> Result<LatticeTree<PricingState>> {
        match self.max_nodes {
            Some(limit) => LatticeTree::with_node_limit(self.scheme.branches(), self.steps, limit),
            None => LatticeTree::new(self.scheme.branches(), self.steps),
        }
    }

    fn forward(&self, spot: Price, branching: &Branching) -> Result<LatticeTree<PricingState>> {
        let mut tree = self.new_tree()?;
        tree.traverse_down(
            |_| {},
            |node, parents| {
                let underlying = match parents.first() {
                    None => spot,
                    Some(parent) => {
                        parent.try_state()?.underlying * branching.shift(node.branch_from(parent))
                    }
                };
                Ok(PricingState {
                    underlying,
                    value: None,
                })
            },
            |_| {},
        )?;
        Ok(tree)
    }

    fn backward<P>(
        &self,
        tree: &mut LatticeTree<PricingState>,
        branching: &Branching,
        df: DiscountFactor,
        payoff: &P,
    ) -> Result<()>
    where
        P: Fn(Price) -> Price,
    {
        let exercise = self.exercise;
        let intrinsic = |node: &Node<PricingState>, s: Price| -> Result<Price> {
            let v = payoff(s);
            ensure!(
                v.is_finite(),
                "payoff at node {} (underlying {s}) is not finite: {v}",
                node.index()
            );
            Ok(v)
        };
        tree.traverse_up(
            |_| {},
            |node, children| {
                let underlying = node.try_state()?.underlying;
                let value = if children.is_empty() {
                    intrinsic(node, underlying)?
                } else {
                    let mut expected = 0.0;
                    for (k, child) in children.iter().enumerate() {
                        expected += branching.probability(k) * node_value(child)?;
                    }
                    let continuation = df * expected;
                    match exercise {
                        Exercise::European => continuation,
                        Exercise::American => continuation.max(intrinsic(node, underlying)?),
                    }
                };
                Ok(PricingState {
                    underlying,
                    value: Some(value),
                })
            },
        )
    }

    /// Price independent requests in parallel on the rayon thread pool.
    ///
    /// Each request builds its own lattice; results keep the input order.
    pub fn price_batch<P>(&self, requests: &[PricingRequest<P>]) -> Vec<Result<LatticeValuation>>
    where
        P: Fn(Price) -> Price + Sync,
    {
        requests
            .par_iter()
            .map(|r| self.price_continuous(r.spot, &r.vars, &r.payoff))
            .collect()
    }
}

fn node_value(node: &Node<PricingState>) -> Result<Price> {
    node.try_state()?.value.ok_or_else(|| {
        Error::Runtime(format!("node {} has not been valued", node.index()))
    })
}

fn spot_and_value(node: &Node<PricingState>) -> Result<(Price, Price)> {
    Ok((node.try_state()?.underlying, node_value(node)?))
}

fn delta(tree: &LatticeTree<PricingState>) -> Result<Option<Real>> {
    let level = tree.level(1)?;
    let (s_lo, v_lo) = spot_and_value(&level[0])?;
    let (s_hi, v_hi) = spot_and_value(&level[level.len() - 1])?;
    Ok(Some((v_hi - v_lo) / (s_hi - s_lo)))
}

fn gamma(tree: &LatticeTree<PricingState>) -> Result<Option<Real>> {
    let index = tree.index();
    let Some(depth) = (1..=tree.steps()).find(|d| index.level_size(*d) >= 3) else {
        return Ok(None);
    };
    let level = tree.level(depth)?;
    let (s0, v0) = spot_and_value(&level[0])?;
    let (s1, v1) = spot_and_value(&level[level.len() / 2])?;
    let (s2, v2) = spot_and_value(&level[level.len() - 1])?;
    let slope_hi = (v2 - v1) / (s2 - s1);
    let slope_lo = (v1 - v0) / (s1 - s0);
    Ok(Some(2.0 * (slope_hi - slope_lo) / (s2 - s0)))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
