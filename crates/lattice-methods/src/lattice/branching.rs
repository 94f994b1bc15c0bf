//! Branching models: per-step shifts and risk-neutral probabilities.
//!
//! A [`BranchingScheme`] turns the market inputs of one pricing request
//! ([`TreeVariables`]) into a [`Branching`]: one multiplicative shift and one
//! probability per branch. Branches are ordered from the lowest move to the
//! highest, so branch `0` is always the down move.
//!
//! | Scheme | Branches | Reference |
//! |---|---|---|
//! | [`CoxRossRubinstein`] | 2 | Cox, Ross & Rubinstein (1979) |
//! | [`CrrTrinomial`] | 3 | Boyle (1986), Hull ch. 21 |
//! | [`EqualProbability`] | 2 | Jarrow & Rudd (1983) |
//! | [`Trigeorgis`] | 2 | Trigeorgis (1991) |
//! | [`Tian`] | 2 | Tian (1993) |

use lattice_core::{ensure, ensure_post, Probability, Rate, Real, Result, Time, Volatility};
use lattice_math::comparison::sums_to_one;

// ─── TreeVariables ────────────────────────────────────────────────────────────

/// Market inputs for one lattice: volatility, step size, rates.
///
/// With the `serde` feature, deserialization goes through [`TreeVariables::new`]
/// so invalid inputs are rejected; σ² is derived, never read.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "serde_support::RawTreeVariables"))]
pub struct TreeVariables {
    volatility: Volatility,
    variance: Real,
    dt: Time,
    risk_free_rate: Rate,
    dividend_yield: Rate,
}

impl TreeVariables {
    /// Build from volatility σ, step size Δt, risk-free rate r and dividend
    /// yield q.
    ///
    /// # Errors
    /// `InvalidArgument` unless every input is finite, `σ > 0` and `Δt > 0`.
    pub fn new(
        volatility: Volatility,
        dt: Time,
        risk_free_rate: Rate,
        dividend_yield: Rate,
    ) -> Result<Self> {
        ensure!(
            volatility.is_finite() && volatility > 0.0,
            "volatility must be finite and positive, got {volatility}"
        );
        ensure!(
            dt.is_finite() && dt > 0.0,
            "time step must be finite and positive, got {dt}"
        );
        ensure!(
            risk_free_rate.is_finite(),
            "risk-free rate must be finite, got {risk_free_rate}"
        );
        ensure!(
            dividend_yield.is_finite(),
            "dividend yield must be finite, got {dividend_yield}"
        );
        Ok(Self {
            volatility,
            variance: volatility * volatility,
            dt,
            risk_free_rate,
            dividend_yield,
        })
    }

    /// Build from a maturity split into `steps` equal steps.
    pub fn from_maturity(
        volatility: Volatility,
        maturity: Time,
        steps: usize,
        risk_free_rate: Rate,
        dividend_yield: Rate,
    ) -> Result<Self> {
        ensure!(steps > 0, "number of steps must be positive");
        Self::new(
            volatility,
            maturity / steps as Real,
            risk_free_rate,
            dividend_yield,
        )
    }

    /// σ
    pub fn volatility(&self) -> Volatility {
        self.volatility
    }

    /// σ²
    pub fn variance(&self) -> Real {
        self.variance
    }

    /// Δt
    pub fn dt(&self) -> Time {
        self.dt
    }

    /// r
    pub fn risk_free_rate(&self) -> Rate {
        self.risk_free_rate
    }

    /// q
    pub fn dividend_yield(&self) -> Rate {
        self.dividend_yield
    }

    /// Same inputs with a different volatility.
    pub fn with_volatility(&self, volatility: Volatility) -> Result<Self> {
        Self::new(
            volatility,
            self.dt,
            self.risk_free_rate,
            self.dividend_yield,
        )
    }

    /// Risk-neutral log drift `r − q − σ²/2`.
    pub fn log_drift(&self) -> Real {
        self.risk_free_rate - self.dividend_yield - 0.5 * self.variance
    }

    /// Expected one-step growth factor `exp((r − q)Δt)`.
    pub fn growth(&self) -> Real {
        ((self.risk_free_rate - self.dividend_yield) * self.dt).exp()
    }
}

#[cfg(feature = "serde")]
mod serde_support {
    use super::TreeVariables;
    use lattice_core::{Error, Rate, Real, Time, Volatility};

    #[derive(serde::Deserialize)]
    pub(super) struct RawTreeVariables {
        volatility: Volatility,
        #[serde(default)]
        #[allow(dead_code)]
        variance: Option<Real>,
        dt: Time,
        risk_free_rate: Rate,
        dividend_yield: Rate,
    }

    impl TryFrom<RawTreeVariables> for TreeVariables {
        type Error = Error;

        fn try_from(raw: RawTreeVariables) -> Result<Self, Error> {
            TreeVariables::new(raw.volatility, raw.dt, raw.risk_free_rate, raw.dividend_yield)
        }
    }
}

// ─── Branching ────────────────────────────────────────────────────────────────

/// Validated shifts and probabilities for one lattice step.
#[derive(Debug, Clone, PartialEq)]
pub struct Branching {
    shifts: Vec<Real>,
    probabilities: Vec<Probability>,
}

impl Branching {
    /// Two-branch step; the down probability is `1 − p_up`.
    pub fn binomial(up: Real, down: Real, p_up: Probability) -> Result<Self> {
        Self::validated(vec![down, up], vec![1.0 - p_up, p_up])
    }

    /// Three-branch step.
    pub fn trinomial(
        up: Real,
        middle: Real,
        down: Real,
        p_up: Probability,
        p_middle: Probability,
        p_down: Probability,
    ) -> Result<Self> {
        Self::validated(vec![down, middle, up], vec![p_down, p_middle, p_up])
    }

    fn validated(shifts: Vec<Real>, probabilities: Vec<Probability>) -> Result<Self> {
        ensure_post!(
            shifts.iter().all(|s| s.is_finite() && *s > 0.0),
            "shifts must be finite and positive, got {shifts:?}"
        );
        ensure_post!(
            shifts.windows(2).all(|w| w[0] < w[1]),
            "shifts must be strictly increasing from down to up, got {shifts:?}"
        );
        ensure_post!(
            probabilities.iter().all(|p| (0.0..=1.0).contains(p)),
            "probabilities must lie in [0, 1], got {probabilities:?}"
        );
        ensure_post!(
            sums_to_one(&probabilities),
            "probabilities must sum to 1, got {probabilities:?}"
        );
        Ok(Self {
            shifts,
            probabilities,
        })
    }

    /// Number of branches (2 or 3).
    pub fn branches(&self) -> usize {
        self.shifts.len()
    }

    /// Shift applied along `branch` (0 = down).
    pub fn shift(&self, branch: usize) -> Real {
        self.shifts[branch]
    }

    /// Probability of `branch` (0 = down).
    pub fn probability(&self, branch: usize) -> Probability {
        self.probabilities[branch]
    }

    /// All shifts, down first.
    pub fn shifts(&self) -> &[Real] {
        &self.shifts
    }

    /// All probabilities, down first.
    pub fn probabilities(&self) -> &[Probability] {
        &self.probabilities
    }

    /// Up shift.
    pub fn up(&self) -> Real {
        self.shifts[self.shifts.len() - 1]
    }

    /// Down shift.
    pub fn down(&self) -> Real {
        self.shifts[0]
    }

    /// Middle shift, trinomial only.
    pub fn middle(&self) -> Option<Real> {
        (self.shifts.len() == 3).then(|| self.shifts[1])
    }

    /// Up probability.
    pub fn p_up(&self) -> Probability {
        self.probabilities[self.probabilities.len() - 1]
    }

    /// Down probability.
    pub fn p_down(&self) -> Probability {
        self.probabilities[0]
    }

    /// Middle probability, trinomial only.
    pub fn p_middle(&self) -> Option<Probability> {
        (self.probabilities.len() == 3).then(|| self.probabilities[1])
    }
}

// ─── BranchingScheme ──────────────────────────────────────────────────────────

/// A strategy computing the per-step branching from market inputs.
///
/// New models implement this trait; the tree and the pricer do not change.
/// Schemes are pure functions of their inputs and are shared freely across
/// threads.
pub trait BranchingScheme: Send + Sync {
    /// Number of branches per node.
    fn branches(&self) -> usize;

    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Shifts and probabilities for one step.
    ///
    /// # Errors
    /// `Postcondition` if the model produces invalid shifts or
    /// probabilities for these inputs (e.g. a negative probability because
    /// the step is too coarse for the drift).
    fn branching(&self, vars: &TreeVariables) -> Result<Branching>;
}

impl<S: BranchingScheme + ?Sized> BranchingScheme for Box<S> {
    fn branches(&self) -> usize {
        (**self).branches()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        (**self).branching(vars)
    }
}

impl<S: BranchingScheme + ?Sized> BranchingScheme for &S {
    fn branches(&self) -> usize {
        (**self).branches()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        (**self).branching(vars)
    }
}

/// Cox-Ross-Rubinstein binomial tree (equal jumps in log space).
///
/// `u = exp(σ√Δt)`, `d = 1/u`, `p_u = (e^{(r−q)Δt} − d)/(u − d)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoxRossRubinstein;

impl BranchingScheme for CoxRossRubinstein {
    fn branches(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "CRR binomial"
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        let up = (vars.volatility() * vars.dt().sqrt()).exp();
        let down = 1.0 / up;
        let p_up = (vars.growth() - down) / (up - down);
        with_context(self, Branching::binomial(up, down, p_up))
    }
}

/// Cox-Ross-Rubinstein style trinomial tree.
///
/// `u = exp(σ√(3Δt))`, `m = 1`, `d = 1/u`, with
/// `p_{u,d} = 1/6 ± √(Δt/(12σ²))·(r − q − σ²/2)` and `p_m = 2/3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrrTrinomial;

impl BranchingScheme for CrrTrinomial {
    fn branches(&self) -> usize {
        3
    }

    fn name(&self) -> &'static str {
        "CRR trinomial"
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        let up = (vars.volatility() * (3.0 * vars.dt()).sqrt()).exp();
        let down = 1.0 / up;
        let tilt = (vars.dt() / (12.0 * vars.variance())).sqrt() * vars.log_drift();
        let p_up = 1.0 / 6.0 + tilt;
        let p_down = 1.0 / 6.0 - tilt;
        with_context(
            self,
            Branching::trinomial(up, 1.0, down, p_up, 2.0 / 3.0, p_down),
        )
    }
}

/// Equal-probability binomial tree (Jarrow-Rudd).
///
/// The drift goes into the shifts: `u, d = exp((r − q − σ²/2)Δt ± σ√Δt)`,
/// with `p_u = p_d = ½`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EqualProbability;

impl BranchingScheme for EqualProbability {
    fn branches(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "equal-probability binomial"
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        let drift = vars.log_drift() * vars.dt();
        let step = vars.volatility() * vars.dt().sqrt();
        let up = (drift + step).exp();
        let down = (drift - step).exp();
        with_context(self, Branching::binomial(up, down, 0.5))
    }
}

/// Trigeorgis tree: equal log jumps sized to match the drifted variance.
///
/// `dx = √(σ²Δt + ν²Δt²)`, `p_u = ½ + ½·νΔt/dx`, with `ν = r − q − σ²/2`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trigeorgis;

impl BranchingScheme for Trigeorgis {
    fn branches(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "Trigeorgis binomial"
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        let drift = vars.log_drift() * vars.dt();
        let dx = (vars.variance() * vars.dt() + drift * drift).sqrt();
        let p_up = 0.5 + 0.5 * drift / dx;
        with_context(self, Branching::binomial(dx.exp(), (-dx).exp(), p_up))
    }
}

/// Tian tree: matches the first three moments of the log-normal step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tian;

impl BranchingScheme for Tian {
    fn branches(&self) -> usize {
        2
    }

    fn name(&self) -> &'static str {
        "Tian binomial"
    }

    fn branching(&self, vars: &TreeVariables) -> Result<Branching> {
        let v = (vars.variance() * vars.dt()).exp();
        let m = vars.growth();
        let root = (v * v + 2.0 * v - 3.0).sqrt();
        let up = 0.5 * m * v * (v + 1.0 + root);
        let down = 0.5 * m * v * (v + 1.0 - root);
        let p_up = (m - down) / (up - down);
        with_context(self, Branching::binomial(up, down, p_up))
    }
}

fn with_context<S: BranchingScheme + ?Sized>(
    scheme: &S,
    branching: Result<Branching>,
) -> Result<Branching> {
    branching.map_err(|e| match e {
        lattice_core::Error::Postcondition(msg) => {
            lattice_core::Error::Postcondition(format!("{}: {msg}", scheme.name()))
        }
        other => other,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────


#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::TreeVariables;
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    #[test]
    fn tree_variables_round_trip() {
        let vars = TreeVariables::new(0.25, 0.1, 0.04, 0.01).unwrap();
        let json = serde_json::to_string(&vars).unwrap();
        let back: TreeVariables = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vars);
    }

    #[test]
    fn invalid_payload_is_rejected() {
        let payload = json!({
            "volatility": -0.2,
            "dt": 0.1,
            "risk_free_rate": 0.05,
            "dividend_yield": 0.0
        });
        let err = serde_json::from_value::<TreeVariables>(payload).unwrap_err();
        assert!(err.to_string().contains("volatility"), "{err}");
    }

    #[test]
    fn serialized_variance_is_recomputed() {
        let payload = json!({
            "volatility": 0.3,
            "variance": 42.0,
            "dt": 0.25,
            "risk_free_rate": 0.05,
            "dividend_yield": 0.0
        });
        let vars: TreeVariables = serde_json::from_value(payload).unwrap();
        assert_abs_diff_eq!(vars.variance(), 0.09, epsilon = 1e-15);
    }

    #[test]
    fn variance_may_be_omitted() {
        let payload = json!({
            "volatility": 0.2,
            "dt": 0.5,
            "risk_free_rate": 0.05,
            "dividend_yield": 0.0
        });
        let vars: TreeVariables = serde_json::from_value(payload).unwrap();
        assert_eq!(vars, TreeVariables::new(0.2, 0.5, 0.05, 0.0).unwrap());
    }
}
