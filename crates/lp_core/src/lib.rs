//! # lp_core (P: Problem Layer)
//!
//! Master portfolio-selection LP and the per-scenario slicing that turns it
//! into small, independently solvable sub-problems.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               lp_core (L1)              │
//! ├─────────────────────────────────────────┤
//! │  master/     - MasterInputs, template, │
//! │                RowLayout, MasterProblem │
//! │  scenario/   - ScenarioId, Scenario     │
//! │  indexer/    - ScenarioIndexer          │
//! │  subproblem/ - SubproblemBuilder        │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │      lp_solver (L2) / lp_batch (L3)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use lp_core::{ConstraintTemplate, MasterInputs, MasterProblem, ScenarioIndexer, SubproblemBuilder};
//!
//! let inputs = MasterInputs::new(
//!     vec![1.0, 1.0, 1.0, 1.0],
//!     vec![0.1, 0.2, 0.3, 0.4],
//!     vec![1.0, 1.0, 1.0, 1.0],
//!     0.05,
//! );
//! let master = MasterProblem::build(&inputs, ConstraintTemplate::MinReturn).unwrap();
//!
//! let index_set = ScenarioIndexer::for_master(&master).compute(&[0, 2]).unwrap();
//! assert_eq!(index_set.rows(), &[0, 1, 2, 3, 7, 5, 9]);
//!
//! let sub = SubproblemBuilder::new(&master).build_for(&index_set).unwrap();
//! assert_eq!(sub.n_rows(), 7);
//! assert_eq!(sub.n_cols(), 2);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod indexer;
pub mod master;
pub mod scenario;
pub mod subproblem;

pub use error::CoreError;
pub use indexer::{ConstraintIndexSet, ScenarioIndexer};
pub use master::{
    ConstraintTemplate, MasterInputs, MasterProblem, RowLayout, DEFAULT_ASSET_COUNT, DEFAULT_REQUIRED_RETURN,
};
pub use scenario::{Scenario, ScenarioId};
pub use subproblem::{SubProblem, SubproblemBuilder};
