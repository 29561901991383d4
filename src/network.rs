//! Liability network containers and the proportional repayment shares derived from them.

use nalgebra::{DMatrix, DVector};

use crate::error::{ClearingError, Result};

/// A snapshot of external assets and nominal interbank liabilities for one clearing round.
#[derive(Clone, Debug)]
pub struct LiabilityNetwork {
    external_assets: DVector<f64>,
    liabilities: DMatrix<f64>,
    total_liabilities: DVector<f64>,
    payment_shares: DMatrix<f64>,
}

impl LiabilityNetwork {
    /// Validates shapes and derives total liabilities and payment shares.
    ///
    /// `liabilities[(i, j)]` is the nominal amount node `i` owes node `j`.
    pub fn new(external_assets: DVector<f64>, liabilities: DMatrix<f64>) -> Result<Self> {
        let n = liabilities.nrows();
        if liabilities.ncols() != n {
            return Err(ClearingError::shape_mismatch(
                "liability matrix columns",
                n,
                liabilities.ncols(),
            ));
        }
        if external_assets.len() != n {
            return Err(ClearingError::shape_mismatch(
                "external assets length",
                n,
                external_assets.len(),
            ));
        }

        let total_liabilities =
            DVector::from_iterator(n, liabilities.row_iter().map(|row| row.sum()));

        let mut payment_shares = DMatrix::zeros(n, n);
        for (i, total) in total_liabilities.iter().enumerate() {
            // Nodes without obligations keep an all-zero row.
            if *total == 0.0 {
                continue;
            }
            for j in 0..n {
                payment_shares[(i, j)] = liabilities[(i, j)] / total;
            }
        }

        Ok(Self {
            external_assets,
            liabilities,
            total_liabilities,
            payment_shares,
        })
    }

    /// Builds a network from plain slices, one slice per debtor row.
    pub fn from_rows(external_assets: &[f64], rows: &[&[f64]]) -> Result<Self> {
        let n = rows.len();
        let mut values = Vec::with_capacity(n * n);
        for row in rows {
            if row.len() != n {
                return Err(ClearingError::shape_mismatch(
                    "liability row length",
                    n,
                    row.len(),
                ));
            }
            values.extend_from_slice(row);
        }
        let liabilities = DMatrix::from_row_slice(n, n, &values);
        Self::new(DVector::from_column_slice(external_assets), liabilities)
    }

    /// Number of nodes in the network.
    pub fn node_count(&self) -> usize {
        self.external_assets.len()
    }

    /// Assets each node holds outside the network.
    pub fn external_assets(&self) -> &DVector<f64> {
        &self.external_assets
    }

    /// Nominal liability matrix as supplied.
    pub fn liabilities(&self) -> &DMatrix<f64> {
        &self.liabilities
    }

    /// Row sums of the liability matrix (`p̄`).
    pub fn total_liabilities(&self) -> &DVector<f64> {
        &self.total_liabilities
    }

    /// Relative liability matrix (`Π`): each row divided by its total.
    pub fn payment_shares(&self) -> &DMatrix<f64> {
        &self.payment_shares
    }

    /// Inbound payments `Πᵀ p` under the outbound payment vector `payments`.
    pub fn payments_received(&self, payments: &DVector<f64>) -> DVector<f64> {
        self.payment_shares.tr_mul(payments)
    }

    /// Equity `e + Πᵀ p − p̄` of every node when the network pays `payments`.
    pub fn equity(&self, payments: &DVector<f64>) -> DVector<f64> {
        &self.external_assets + self.payments_received(payments) - &self.total_liabilities
    }
}
