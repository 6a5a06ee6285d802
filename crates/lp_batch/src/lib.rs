//! # lp_batch (P: Problem Layer)
//!
//! Batch orchestration over the scenario sub-problems: a bounded worker
//! pool, streamed results, contained per-scenario failures, result sinks,
//! and the infeasibility probe for scenarios that did not solve.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              lp_batch (L3)              │
//! ├─────────────────────────────────────────┤
//! │  orchestrator/ - worker pool, BatchRun │
//! │  summary/      - BatchSummary          │
//! │  sink/         - ResultSink, TSV files │
//! │  probe/        - InfeasibilityProbe    │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │        lp_solver (L2) / lp_core (L1)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lp_batch::{BatchOrchestrator, MemorySink, OrchestratorConfig};
//! use lp_core::{ConstraintTemplate, MasterInputs, MasterProblem, Scenario};
//! use lp_solver::{SolverAdapter, SolverOptions};
//!
//! let inputs = MasterInputs::new(vec![1.0; 4], vec![0.1; 4], vec![1.0; 4], 0.05);
//! let master = Arc::new(MasterProblem::build(&inputs, ConstraintTemplate::MinReturn).unwrap());
//! let scenarios = Scenario::from_lists(vec![vec![0, 2], vec![1, 3], vec![3]]);
//!
//! let orchestrator = BatchOrchestrator::new(
//!     OrchestratorConfig::default().with_worker_count(2),
//!     SolverAdapter::from_options(SolverOptions::default()),
//! );
//!
//! let mut sink = MemorySink::new();
//! let summary = orchestrator.run_into(master, scenarios, &mut sink).unwrap();
//! assert_eq!(summary.scenarios, 3);
//! assert_eq!(sink.len(), 3);
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod sink;
pub mod summary;

pub use error::{BatchError, ProbeError, SinkError};
pub use orchestrator::{solve_scenario, BatchOrchestrator, BatchRun, OrchestratorConfig};
pub use probe::{InfeasibilityCause, InfeasibilityProbe, ProbeOutcome};
pub use sink::{MemorySink, ProbeTsvWriter, ResultSink, StatusColumn, TsvResultSink};
pub use summary::BatchSummary;
