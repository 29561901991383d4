//! Eisenberg–Noe clearing payments for interbank liability networks.
//!
//! Given each node's external assets and the matrix of nominal liabilities
//! between nodes, this crate computes the clearing payment vector: how much
//! every node actually pays once defaults propagate through the network. It
//! offers tools to
//!
//! - validate a one-round snapshot and derive proportional repayment shares (`network` module),
//! - configure the fixed-point solver (`solving` module),
//! - run the Standard default sweep or the Iterate scheme (`payments` module),
//! - query defaults, realized payments and residual assets (`engine` module), and
//! - clear many randomly shocked copies of a network in parallel (`stress` module).
//!
//! # Quick start
//!
//! ```no_run
//! use enclear::{ClearingEngine, ClearingMethod, SolverOptions};
//! use nalgebra::{DMatrix, DVector};
//!
//! // Node 0 owes node 1, node 1 owes node 2.
//! let assets = DVector::from_vec(vec![4.0, 2.0, 0.0]);
//! let liabilities = DMatrix::from_row_slice(
//!     3,
//!     3,
//!     &[0.0, 10.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0],
//! );
//!
//! let engine = ClearingEngine::new(assets, liabilities).expect("square network");
//! let options = SolverOptions::default().with_method(ClearingMethod::Iterate);
//! let solution = engine.solve(&options);
//! println!("Clearing payments: {:?}", solution.payments);
//! println!("Defaults after clearing: {:?}", engine.defaulted_nodes_after_clearing());
//! ```

pub mod engine;
pub mod error;
pub mod network;
pub mod payments;
pub mod solving;
pub mod stress;

pub use engine::{ClearingEngine, ClearingReport, ClearingSolution};
pub use error::{ClearingError, Result};
pub use network::LiabilityNetwork;
pub use solving::{ClearingMethod, SolveSummary, SolverOptions};
pub use stress::{run_stress, ShockConfig, StressSummary};
