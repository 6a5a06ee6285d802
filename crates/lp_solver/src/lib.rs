//! # lp_solver (P: Problem Layer)
//!
//! Solver collaborator seam and the adapter that turns heterogeneous solver
//! output into one uniform [`SolveResult`] per scenario.
//!
//! ## Modules
//!
//! - `backend`: [`LpSolver`] trait and the `microlp` simplex backend
//! - `options`: backend selection and verbosity
//! - `status`: four-way status normalisation
//! - `result`: result record, diagnostics and failure notes
//! - `adapter`: timing and normalisation around a solver call
//!
//! ## Example
//!
//! ```
//! use lp_core::{ConstraintTemplate, MasterInputs, MasterProblem, ScenarioId, ScenarioIndexer, SubproblemBuilder};
//! use lp_solver::{SolveStatus, SolverAdapter, SolverOptions};
//!
//! let inputs = MasterInputs::new(vec![1.0; 4], vec![0.0; 4], vec![1.0; 4], 0.0);
//! let master = MasterProblem::build(&inputs, ConstraintTemplate::MinReturn).unwrap();
//! let set = ScenarioIndexer::for_master(&master).compute(&[0, 2]).unwrap();
//! let sub = SubproblemBuilder::new(&master).build_for(&set).unwrap();
//!
//! let adapter = SolverAdapter::from_options(SolverOptions::default());
//! let result = adapter.solve(ScenarioId::new(0), &sub);
//! assert_eq!(result.status, SolveStatus::Optimal);
//! assert_eq!(result.solution.as_ref().map(Vec::len), Some(2));
//! ```

#![deny(missing_docs)]

pub mod adapter;
pub mod backend;
pub mod error;
pub mod options;
pub mod result;
pub mod status;

pub use adapter::SolverAdapter;
pub use backend::{LpSolver, RawSolution, SimplexSolver};
pub use error::SolverError;
pub use options::{SolverBackend, SolverOptions};
pub use result::{Failure, FailureKind, PortfolioMetrics, SolveResult, SolverDiagnostics};
pub use status::SolveStatus;
