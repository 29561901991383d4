//! Clearing payment fixed point: the Standard default sweep and the Iterate scheme.

use log::{debug, trace, warn};
use nalgebra::DVector;

use crate::network::LiabilityNetwork;
use crate::solving::{ClearingMethod, SolveSummary, SolverOptions};

/// Solves for the clearing payment vector with the method selected in `options`.
pub fn solve_payments(
    network: &LiabilityNetwork,
    options: &SolverOptions,
) -> (DVector<f64>, SolveSummary) {
    let (payments, summary) = match options.method {
        ClearingMethod::Standard => standard_sweep(network),
        ClearingMethod::Iterate => {
            iterate_fixed_point(network, options.max_iterations, options.tolerance)
        }
    };

    if summary.converged {
        debug!(
            "{} clearing settled after {} iterations ({} defaults)",
            summary.method,
            summary.iterations,
            summary.default_cascade.last().copied().unwrap_or(0)
        );
    } else {
        warn!(
            "{} clearing did not converge after {} iterations (residual {:e})",
            summary.method, summary.iterations, summary.residual
        );
    }

    (payments, summary)
}

/// Default-detection sweep starting from full payment.
///
/// Defaulted nodes are clamped to `min(p̄ᵢ, eᵢ + rᵢ)` without a floor at
/// zero, so negative inputs can yield negative payments. The sweep ends once
/// two consecutive vectors are exactly equal; there is no iteration cap. It
/// stops early, unconverged, only if the payment vector becomes non-finite.
pub fn standard_sweep(network: &LiabilityNetwork) -> (DVector<f64>, SolveSummary) {
    let assets = network.external_assets();
    let totals = network.total_liabilities();
    let n = network.node_count();

    let mut payments = totals.clone();
    let mut previous = DVector::zeros(n);
    let mut default_cascade = Vec::new();
    let mut residual = 0.0;
    let mut iteration = 0usize;

    while payments != previous {
        // NaN never compares equal, so the equality exit alone would spin forever.
        if payments.iter().any(|p| !p.is_finite()) {
            return (
                payments,
                SolveSummary {
                    method: ClearingMethod::Standard,
                    iterations: iteration,
                    residual,
                    converged: false,
                    default_cascade,
                },
            );
        }

        previous = payments.clone();
        let received = network.payments_received(&payments);
        let mut defaults = 0usize;

        for i in 0..n {
            let available = assets[i] + received[i];
            if available < totals[i] {
                payments[i] = totals[i].min(available);
                defaults += 1;
            } else {
                payments[i] = totals[i];
            }
        }

        residual = (&payments - &previous).norm();
        iteration += 1;
        default_cascade.push(defaults);
        trace!("standard sweep {iteration}: {defaults} defaulted, residual {residual:e}");
    }

    (
        payments,
        SolveSummary {
            method: ClearingMethod::Standard,
            iterations: iteration,
            residual,
            converged: true,
            default_cascade,
        },
    )
}

/// Fixed-point iteration `p ← p̄` off default, `max(0, e + Πᵀp)` on default.
///
/// Stops when the Euclidean norm of the update is at most `tolerance`. When
/// `max_iterations` is exhausted first, the last vector is returned with
/// `converged = false`.
pub fn iterate_fixed_point(
    network: &LiabilityNetwork,
    max_iterations: usize,
    tolerance: f64,
) -> (DVector<f64>, SolveSummary) {
    let assets = network.external_assets();
    let totals = network.total_liabilities();
    let n = network.node_count();

    let mut payments = totals.clone();
    let mut default_cascade = Vec::new();
    let mut residual = f64::INFINITY;
    let mut iteration = 0usize;

    while iteration < max_iterations.max(1) {
        let received = network.payments_received(&payments);
        let mut updated = totals.clone();
        let mut defaults = 0usize;

        for i in 0..n {
            let available = assets[i] + received[i];
            if available < totals[i] {
                updated[i] = available.max(0.0);
                defaults += 1;
            }
        }

        residual = (&updated - &payments).norm();
        payments = updated;
        iteration += 1;
        default_cascade.push(defaults);
        trace!("iterate step {iteration}: {defaults} defaulted, residual {residual:e}");

        if residual <= tolerance {
            return (
                payments,
                SolveSummary {
                    method: ClearingMethod::Iterate,
                    iterations: iteration,
                    residual,
                    converged: true,
                    default_cascade,
                },
            );
        }
    }

    (
        payments,
        SolveSummary {
            method: ClearingMethod::Iterate,
            iterations: iteration,
            residual,
            converged: false,
            default_cascade,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn chain() -> LiabilityNetwork {
        // 0 owes 1, 1 owes 2; only node 0 is short of assets.
        LiabilityNetwork::from_rows(
            &[4.0, 2.0, 0.0],
            &[&[0.0, 10.0, 0.0], &[0.0, 0.0, 10.0], &[0.0, 0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn standard_sweep_spreads_one_hop_per_round() {
        let (payments, summary) = standard_sweep(&chain());
        assert!(summary.converged);
        assert_eq!(summary.default_cascade, vec![1, 2, 2]);
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.residual, 0.0);
        assert_relative_eq!(payments, DVector::from_vec(vec![4.0, 6.0, 0.0]));
    }

    #[test]
    fn iterate_matches_standard_on_chain() {
        let (payments, summary) = iterate_fixed_point(&chain(), 500, 1e-10);
        assert!(summary.converged);
        assert_relative_eq!(payments, DVector::from_vec(vec![4.0, 6.0, 0.0]));
    }

    #[test]
    fn network_without_liabilities_pays_nothing() {
        let network = LiabilityNetwork::from_rows(&[1.0, 1.0], &[&[0.0, 0.0], &[0.0, 0.0]]).unwrap();
        let (payments, summary) = standard_sweep(&network);
        assert!(summary.converged);
        assert_eq!(summary.iterations, 0);
        assert_eq!(payments, DVector::zeros(2));
    }

    #[test]
    fn iterate_reports_exhausted_budget() {
        // Geometric decay around a leaky cycle needs many steps to settle.
        let network = LiabilityNetwork::from_rows(
            &[0.0, 0.0, 0.0],
            &[&[0.0, 10.0, 0.0], &[10.0, 0.0, 10.0], &[0.0, 0.0, 0.0]],
        )
        .unwrap();
        let (payments, summary) = iterate_fixed_point(&network, 3, 1e-12);
        assert!(!summary.converged);
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.default_cascade.len(), 3);
        assert!(summary.residual > 1e-12);
        assert!(payments.iter().all(|p| *p >= 0.0));
    }

    #[test]
    fn standard_runs_past_iteration_cap_on_slow_leak() {
        // Mutual debt of 100 with a leak of 1 decays by ~1% every two sweeps.
        let network = LiabilityNetwork::from_rows(
            &[0.0, 0.0, 0.0],
            &[&[0.0, 100.0, 0.0], &[100.0, 0.0, 1.0], &[0.0, 0.0, 0.0]],
        )
        .unwrap();
        let (payments, summary) = standard_sweep(&network);
        assert!(summary.converged);
        assert!(summary.iterations > 500);
        assert_eq!(summary.residual, 0.0);
        assert!(payments.iter().all(|p| p.abs() < 1e-300));

        let options = SolverOptions::default().with_max_iterations(1);
        let (capped, _) = solve_payments(&network, &options);
        assert_eq!(capped, payments);
    }

    #[test]
    fn standard_stops_on_non_finite_payments() {
        let network =
            LiabilityNetwork::from_rows(&[0.0, 0.0], &[&[0.0, f64::INFINITY], &[0.0, 0.0]])
                .unwrap();
        let (_, summary) = standard_sweep(&network);
        assert!(!summary.converged);
        assert_eq!(summary.iterations, 0);
    }

    #[test]
    fn zero_iteration_cap_is_clamped_for_iterate() {
        let (payments, summary) = iterate_fixed_point(&chain(), 0, 1e-10);
        assert_eq!(summary.iterations, 1);
        assert_relative_eq!(payments, DVector::from_vec(vec![4.0, 10.0, 0.0]));
    }
}
