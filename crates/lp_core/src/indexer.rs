//! Row and column selection for a scenario.
//!
//! The aggregate rows always apply. Each active asset `j` then contributes
//! its two box rows, lower first:
//!
//! ```text
//! rows = [0 .. fixed_rows) ++ [lower_row(j), upper_row(j) for j in active_vars]
//! cols = active_vars
//! ```

use crate::error::CoreError;
use crate::master::{MasterProblem, RowLayout};

/// Row and column indices selecting one sub-problem from the master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintIndexSet {
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl ConstraintIndexSet {
    /// Selected master rows.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Selected master columns, in the caller's order.
    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Consumes the set and returns `(rows, cols)`.
    pub fn into_parts(self) -> (Vec<usize>, Vec<usize>) {
        (self.rows, self.cols)
    }
}

/// Computes [`ConstraintIndexSet`]s from active-variable lists.
///
/// Pure: the result depends only on the input list and the layout.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioIndexer {
    layout: RowLayout,
}

impl ScenarioIndexer {
    /// Creates an indexer for `layout`.
    pub fn new(layout: RowLayout) -> Self {
        Self { layout }
    }

    /// Creates an indexer matching `master`'s row layout.
    pub fn for_master(master: &MasterProblem) -> Self {
        Self::new(master.layout())
    }

    /// Layout the offsets are derived from.
    #[inline]
    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    /// Computes the index set for `active_vars`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DegenerateScenario`] if `active_vars` is empty
    /// - [`CoreError::ShapeMismatch`] if an index is not below `N`
    /// - [`CoreError::InvalidScenario`] if an index repeats
    pub fn compute(&self, active_vars: &[usize]) -> Result<ConstraintIndexSet, CoreError> {
        if active_vars.is_empty() {
            return Err(CoreError::DegenerateScenario);
        }

        let n = self.layout.n_assets();
        let mut seen = vec![false; n];
        let mut rows = Vec::with_capacity(self.layout.fixed_rows() + 2 * active_vars.len());
        rows.extend(0..self.layout.fixed_rows());

        for &j in active_vars {
            if j >= n {
                return Err(CoreError::shape_mismatch(format!(
                    "asset index {} out of range [0, {})",
                    j, n
                )));
            }
            if seen[j] {
                return Err(CoreError::InvalidScenario { index: j });
            }
            seen[j] = true;
            rows.push(self.layout.lower_row(j));
            rows.push(self.layout.upper_row(j));
        }

        Ok(ConstraintIndexSet {
            rows,
            cols: active_vars.to_vec(),
        })
    }
}
