//! High-level clearing engine and the derived post-clearing quantities.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{ClearingError, Result};
use crate::network::LiabilityNetwork;
use crate::payments::solve_payments;
use crate::solving::{ClearingMethod, SolveSummary, SolverOptions};

/// Eisenberg–Noe clearing system for a single round.
///
/// Inputs are fixed at construction. Every query re-solves the payment
/// vector with the engine's [`SolverOptions`]; use [`ClearingEngine::clear`]
/// to obtain all derived quantities from one solve.
#[derive(Clone, Debug)]
pub struct ClearingEngine {
    network: LiabilityNetwork,
    options: SolverOptions,
}

impl ClearingEngine {
    /// Constructs an engine from external assets and the nominal liability matrix.
    pub fn new(external_assets: DVector<f64>, liabilities: DMatrix<f64>) -> Result<Self> {
        Ok(Self::from_network(LiabilityNetwork::new(
            external_assets,
            liabilities,
        )?))
    }

    /// Constructs an engine from plain slices, one slice per debtor row.
    pub fn from_rows(external_assets: &[f64], rows: &[&[f64]]) -> Result<Self> {
        Ok(Self::from_network(LiabilityNetwork::from_rows(
            external_assets,
            rows,
        )?))
    }

    /// Wraps an already validated network with default solver options.
    pub fn from_network(network: LiabilityNetwork) -> Self {
        Self {
            network,
            options: SolverOptions::default(),
        }
    }

    /// Overrides the solver options used by the derived queries.
    pub fn with_options(mut self, options: SolverOptions) -> Self {
        self.options = options;
        self
    }

    /// Accessor for the underlying network.
    pub fn network(&self) -> &LiabilityNetwork {
        &self.network
    }

    /// Solver options used by the derived queries.
    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.network.node_count()
    }

    /// Solves for the clearing payment vector.
    ///
    /// Non-convergence is not an error here: the last iterate is returned and
    /// [`SolveSummary::converged`] is `false`.
    pub fn solve(&self, options: &SolverOptions) -> ClearingSolution {
        let (payments, summary) = solve_payments(&self.network, options);
        ClearingSolution { payments, summary }
    }

    /// Solves using a method tag (`"Standard"` or `"Iterate"`).
    pub fn solve_by_name(
        &self,
        method: &str,
        max_iterations: usize,
        tolerance: f64,
    ) -> Result<ClearingSolution> {
        let method: ClearingMethod = method.parse()?;
        Ok(self.solve(&SolverOptions::new(method, max_iterations, tolerance)))
    }

    /// Payment vector under the engine's own options.
    pub fn payments(&self) -> DVector<f64> {
        self.solve(&self.options).payments
    }

    /// Nodes whose equity is negative assuming every node pays in full.
    pub fn defaulted_nodes_before_clearing(&self) -> Vec<bool> {
        negative_mask(&self.network.equity(self.network.total_liabilities()))
    }

    /// Nodes whose equity is negative once the clearing payments are applied.
    pub fn defaulted_nodes_after_clearing(&self) -> Vec<bool> {
        negative_mask(&self.network.equity(&self.payments()))
    }

    /// Realized bilateral payments: row `i` of the share matrix scaled by `pᵢ`.
    pub fn payment_matrix(&self) -> DMatrix<f64> {
        scale_rows(self.network.payment_shares(), &self.payments())
    }

    /// Liabilities as actually honored after clearing; equal to [`payment_matrix`](Self::payment_matrix).
    pub fn liability_matrix_after_clearing(&self) -> DMatrix<f64> {
        scale_rows(self.network.payment_shares(), &self.payments())
    }

    /// External assets left over after paying out and receiving: `e + Πᵀp − p`.
    pub fn final_external_assets(&self) -> DVector<f64> {
        let payments = self.payments();
        final_assets(&self.network, &payments)
    }

    /// Solves once and computes every derived quantity from the same payments.
    pub fn clear(&self) -> ClearingReport {
        let solution = self.solve(&self.options);
        let payments = solution.payments;
        ClearingReport {
            defaulted_before: self.defaulted_nodes_before_clearing(),
            defaulted_after: negative_mask(&self.network.equity(&payments)),
            payment_matrix: scale_rows(self.network.payment_shares(), &payments),
            final_external_assets: final_assets(&self.network, &payments),
            payments,
            summary: solution.summary,
        }
    }
}

/// Payment vector paired with solver diagnostics.
#[derive(Clone, Debug)]
pub struct ClearingSolution {
    /// Total payment made by each node.
    pub payments: DVector<f64>,
    /// Diagnostics from the fixed-point iteration.
    pub summary: SolveSummary,
}

impl ClearingSolution {
    /// Whether the solver met its stopping rule.
    pub fn is_converged(&self) -> bool {
        self.summary.converged
    }

    /// Turns a non-converged solve into [`ClearingError::NonConvergence`].
    pub fn require_converged(self) -> Result<Self> {
        if self.summary.converged {
            Ok(self)
        } else {
            Err(ClearingError::NonConvergence {
                method: self.summary.method,
                iterations: self.summary.iterations,
                residual: self.summary.residual,
            })
        }
    }

    /// Nodes that pay less than their nominal liabilities.
    pub fn defaulted_nodes(&self, network: &LiabilityNetwork) -> Vec<bool> {
        self.payments
            .iter()
            .zip(network.total_liabilities().iter())
            .map(|(paid, owed)| paid < owed)
            .collect()
    }

    /// Aggregate unpaid nominal liabilities `Σ (p̄ᵢ − pᵢ)`.
    pub fn total_shortfall(&self, network: &LiabilityNetwork) -> f64 {
        (network.total_liabilities() - &self.payments).sum()
    }
}

/// Every post-clearing quantity, computed from one payment vector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClearingReport {
    /// Clearing payment vector.
    pub payments: DVector<f64>,
    /// Default mask assuming full nominal payment.
    pub defaulted_before: Vec<bool>,
    /// Default mask under the clearing payments.
    pub defaulted_after: Vec<bool>,
    /// Realized bilateral payments (also the liability matrix after clearing).
    pub payment_matrix: DMatrix<f64>,
    /// External assets left after clearing.
    pub final_external_assets: DVector<f64>,
    /// Solver diagnostics.
    pub summary: SolveSummary,
}

impl ClearingReport {
    /// Number of nodes in default after clearing.
    pub fn default_count(&self) -> usize {
        self.defaulted_after.iter().filter(|d| **d).count()
    }
}

fn negative_mask(equity: &DVector<f64>) -> Vec<bool> {
    equity.iter().map(|value| *value < 0.0).collect()
}

fn scale_rows(shares: &DMatrix<f64>, payments: &DVector<f64>) -> DMatrix<f64> {
    let mut scaled = shares.clone();
    for (i, mut row) in scaled.row_iter_mut().enumerate() {
        row *= payments[i];
    }
    scaled
}

fn final_assets(network: &LiabilityNetwork, payments: &DVector<f64>) -> DVector<f64> {
    network.external_assets() + network.payments_received(payments) - payments
}
