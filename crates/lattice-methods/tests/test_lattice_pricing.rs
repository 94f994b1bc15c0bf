//! End-to-end lattice scenarios: hand-checked two-step trees, custom
//! discounting, batch pricing and volatility inversion.

use approx::assert_abs_diff_eq;
use lattice_core::Error;
use lattice_math::Interval;
use lattice_methods::lattice::{
    continuous_discount, CoxRossRubinstein, CrrTrinomial, LatticePricer, LatticeTree,
    PricingRequest, TreeVariables,
};

fn call(strike: f64) -> impl Fn(f64) -> f64 + Copy {
    move |s| (s - strike).max(0.0)
}

// ───────────────────────── two-step reference ─────────────────────────

#[test]
fn test_two_step_crr_call_by_hand() {
    let vars = TreeVariables::from_maturity(0.2, 1.0, 2, 0.05, 0.0).unwrap();
    let pricer = LatticePricer::new(CoxRossRubinstein, 2);
    let v = pricer.price_continuous(100.0, &vars, call(100.0)).unwrap();

    let dt: f64 = 0.5;
    let u = (0.2 * dt.sqrt()).exp();
    let d = 1.0 / u;
    let p = ((0.05 * dt).exp() - d) / (u - d);
    let df = (-0.05 * dt).exp();
    let leaves = [
        (100.0 * d * d - 100.0_f64).max(0.0),
        (100.0 * u * d - 100.0_f64).max(0.0),
        (100.0 * u * u - 100.0_f64).max(0.0),
    ];
    let lo = df * ((1.0 - p) * leaves[0] + p * leaves[1]);
    let hi = df * ((1.0 - p) * leaves[1] + p * leaves[2]);
    let root = df * ((1.0 - p) * lo + p * hi);

    assert_abs_diff_eq!(v.value, root, epsilon = 1e-12);
    assert_abs_diff_eq!(v.value, 9.540501338582958, epsilon = 1e-9);
    assert_eq!(v.steps, 2);
    assert_eq!(v.nodes, 6);
}

#[test]
fn test_forward_pass_recombines() {
    let vars = TreeVariables::from_maturity(0.3, 1.0, 4, 0.03, 0.0).unwrap();
    let tree = LatticePricer::new(CoxRossRubinstein, 4)
        .build(100.0, &vars)
        .unwrap();
    // Up then down lands on the spot again.
    let middle = &tree.level(2).unwrap()[1];
    assert_abs_diff_eq!(
        middle.state().unwrap().underlying(),
        100.0,
        epsilon = 1e-10
    );
    for depth in 0..=4 {
        let prices: Vec<f64> = tree
            .level(depth)
            .unwrap()
            .iter()
            .map(|n| n.state().unwrap().underlying())
            .collect();
        assert!(prices.windows(2).all(|w| w[0] < w[1]));
        assert!(prices.iter().all(|p| p.is_finite() && *p > 0.0));
    }
}

#[test]
fn test_trinomial_level_layout() {
    let vars = TreeVariables::from_maturity(0.2, 1.0, 3, 0.05, 0.0).unwrap();
    let tree = LatticePricer::new(CrrTrinomial, 3).build(50.0, &vars).unwrap();
    assert_eq!(tree.len(), 1 + 3 + 5 + 7);
    let centre = &tree.level(3).unwrap()[3];
    assert_abs_diff_eq!(centre.state().unwrap().underlying(), 50.0, epsilon = 1e-10);
}

#[test]
fn test_zero_rate_discounting_matches_expectation() {
    let vars = TreeVariables::from_maturity(0.2, 1.0, 50, 0.0, 0.0).unwrap();
    let pricer = LatticePricer::new(CoxRossRubinstein, 50);
    // With no drift and no discounting, the expected underlying is the spot.
    let v = pricer
        .price(80.0, &vars, |s| s, |_, _| 1.0)
        .unwrap();
    assert_abs_diff_eq!(v.value, 80.0, epsilon = 1e-9);
    assert_abs_diff_eq!(v.delta.unwrap(), 1.0, epsilon = 1e-9);
    assert_abs_diff_eq!(v.gamma.unwrap(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_discount_function_receives_rate_and_step() {
    let vars = TreeVariables::from_maturity(0.2, 2.0, 4, 0.04, 0.0).unwrap();
    let pricer = LatticePricer::new(CoxRossRubinstein, 4);
    let simple = |r: f64, t: f64| {
        assert_abs_diff_eq!(r, 0.04);
        assert_abs_diff_eq!(t, 0.5);
        1.0 / (1.0 + r * t)
    };
    let a = pricer.price(100.0, &vars, call(100.0), simple).unwrap();
    let b = pricer
        .price(100.0, &vars, call(100.0), continuous_discount)
        .unwrap();
    // Simple compounding discounts less than continuous compounding.
    assert!(a.value > b.value);
}

// ───────────────────────── errors ─────────────────────────

#[test]
fn test_node_limit_rejects_before_allocation() {
    let vars = TreeVariables::from_maturity(0.2, 1.0, 1000, 0.05, 0.0).unwrap();
    let err = LatticePricer::new(CoxRossRubinstein, 1000)
        .with_node_limit(10_000)
        .price_continuous(100.0, &vars, call(100.0))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ResourceLimit {
            requested: 501_501,
            limit: 10_000
        }
    ));
}

#[test]
fn test_payoff_nan_is_rejected() {
    let vars = TreeVariables::from_maturity(0.2, 1.0, 3, 0.05, 0.0).unwrap();
    let err = LatticePricer::new(CoxRossRubinstein, 3)
        .price_continuous(100.0, &vars, |_| f64::NAN)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_tree_rejects_zero_branches() {
    let err = LatticeTree::<()>::new(0, 3).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

// ───────────────────────── batch and inversion ─────────────────────────

#[test]
fn test_batch_matches_sequential() {
    let pricer = LatticePricer::new(CoxRossRubinstein, 100);
    let requests: Vec<_> = [0.15, 0.2, 0.3, 0.45]
        .iter()
        .map(|&vol| PricingRequest {
            spot: 100.0,
            vars: TreeVariables::from_maturity(vol, 1.0, 100, 0.05, 0.0).unwrap(),
            payoff: call(100.0),
        })
        .collect();

    let batch = pricer.price_batch(&requests);
    assert_eq!(batch.len(), requests.len());
    for (request, result) in requests.iter().zip(&batch) {
        let expected = pricer
            .price_continuous(request.spot, &request.vars, request.payoff)
            .unwrap();
        assert_eq!(result.as_ref().unwrap(), &expected);
    }
    let values: Vec<f64> = batch.iter().map(|r| r.as_ref().unwrap().value).collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_implied_volatility_round_trip() {
    let steps = 150;
    let vars = TreeVariables::from_maturity(0.35, 0.5, steps, 0.02, 0.01).unwrap();
    let pricer = LatticePricer::new(CoxRossRubinstein, steps);
    let target = pricer
        .price_continuous(95.0, &vars, call(100.0))
        .unwrap()
        .value;

    let domain = Interval::closed(0.01, 2.0).unwrap();
    let implied = pricer
        .implied_volatility(target, 95.0, &vars, call(100.0), &domain, 1e-10)
        .unwrap()
        .unwrap();
    assert_abs_diff_eq!(implied, 0.35, epsilon = 1e-6);
}
