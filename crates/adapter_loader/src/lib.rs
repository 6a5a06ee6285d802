//! # adapter_loader (A: Adapter Layer)
//!
//! Reads the tab-separated data directory into [`MasterInputs`] and the
//! scenario list, and reads a previously written status log back for the
//! infeasibility probe.
//!
//! ## Expected layout
//!
//! ```text
//! data/
//! | - Ldata.txt            (optional, derived and cached)
//! | - matrix_cp_mean.txt
//! | - matrix_cp_return.txt
//! | - point_2x0.txt
//! | - vars.txt
//! ```
//!
//! [`MasterInputs`]: lp_core::MasterInputs

#![deny(missing_docs)]

pub mod error;
pub mod loader;
pub mod status_log;

pub use error::LoaderError;
pub use loader::{DataLoader, LoadedData};
pub use status_log::{read_status_log, read_unsolved_ids, StatusLogEntry};
