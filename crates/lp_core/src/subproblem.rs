//! Sub-problem slicing.
//!
//! `cost = c[cols]`, `lhs = A[rows, cols]`, `rhs = b[rows]`. Every slice is
//! freshly allocated; nothing in a [`SubProblem`] aliases the master.

use sprs::{CsMat, TriMat};

use crate::error::CoreError;
use crate::indexer::ConstraintIndexSet;
use crate::master::MasterProblem;

/// Scenario-specific LP `min costᵀx s.t. lhs·x ≤ rhs`.
#[derive(Debug, Clone)]
pub struct SubProblem {
    cost: Vec<f64>,
    lhs: CsMat<f64>,
    rhs: Vec<f64>,
    columns: Vec<usize>,
}

impl SubProblem {
    /// Objective coefficients.
    pub fn cost(&self) -> &[f64] {
        &self.cost
    }

    /// Constraint matrix (CSR).
    pub fn lhs(&self) -> &CsMat<f64> {
        &self.lhs
    }

    /// Right-hand side.
    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// Master column of each sub-problem column.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Row count.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rhs.len()
    }

    /// Column count.
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.cost.len()
    }

    /// Computes `lhs·x - rhs` for every row.
    ///
    /// Positive entries are violated constraints.
    pub fn residuals(&self, x: &[f64]) -> Vec<f64> {
        self.lhs
            .outer_iterator()
            .zip(self.rhs.iter())
            .map(|(row, &b)| row.iter().map(|(c, &v)| v * x[c]).sum::<f64>() - b)
            .collect()
    }

    /// Objective value `costᵀx`.
    pub fn objective(&self, x: &[f64]) -> f64 {
        self.cost.iter().zip(x).map(|(c, v)| c * v).sum()
    }
}

/// Slices a [`MasterProblem`] into [`SubProblem`]s.
#[derive(Debug, Clone, Copy)]
pub struct SubproblemBuilder<'a> {
    master: &'a MasterProblem,
}

impl<'a> SubproblemBuilder<'a> {
    /// Creates a builder over `master`.
    pub fn new(master: &'a MasterProblem) -> Self {
        Self { master }
    }

    /// Builds the sub-problem selected by an index set.
    pub fn build_for(&self, index_set: &ConstraintIndexSet) -> Result<SubProblem, CoreError> {
        self.build(index_set.rows(), index_set.cols())
    }

    /// Builds the sub-problem for explicit row and column indices.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ShapeMismatch`] if a row is not below `M`, a
    /// column is not below `N`, or a column repeats.
    pub fn build(&self, rows: &[usize], cols: &[usize]) -> Result<SubProblem, CoreError> {
        let n = self.master.n_assets();
        let m = self.master.n_rows();

        // position[c] = sub-problem column of master column c
        let mut position: Vec<Option<usize>> = vec![None; n];
        for (k, &c) in cols.iter().enumerate() {
            if c >= n {
                return Err(CoreError::shape_mismatch(format!(
                    "column index {} out of range [0, {})",
                    c, n
                )));
            }
            if position[c].replace(k).is_some() {
                return Err(CoreError::shape_mismatch(format!(
                    "column index {} selected twice",
                    c
                )));
            }
        }
        if let Some(&r) = rows.iter().find(|&&r| r >= m) {
            return Err(CoreError::shape_mismatch(format!(
                "row index {} out of range [0, {})",
                r, m
            )));
        }

        let lhs = self.master.lhs();
        let mut tri = TriMat::new((rows.len(), cols.len()));
        for (out_row, &r) in rows.iter().enumerate() {
            if let Some(row) = lhs.outer_view(r) {
                for (c, &v) in row.iter() {
                    if let Some(k) = position[c] {
                        tri.add_triplet(out_row, k, v);
                    }
                }
            }
        }

        let cost = cols.iter().map(|&c| self.master.cost()[c]).collect();
        let rhs = rows.iter().map(|&r| self.master.rhs()[r]).collect();

        Ok(SubProblem {
            cost,
            lhs: tri.to_csr(),
            rhs,
            columns: cols.to_vec(),
        })
    }
}
