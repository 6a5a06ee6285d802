//! Master problem construction.
//!
//! The master LP has the form
//!
//! ```text
//! minimise    cᵀx
//! subject to  A x ≤ b
//! ```
//!
//! where `A` stacks a handful of aggregate rows on top of two per-asset box
//! blocks. The row layout is captured by [`RowLayout`] so every consumer
//! derives its offsets from the same place instead of hard-coding them.

use sprs::{CsMat, TriMat};

use crate::error::CoreError;

/// Asset count of the production data set.
pub const DEFAULT_ASSET_COUNT: usize = 3000;

/// Default minimum portfolio return of the main solve.
pub const DEFAULT_REQUIRED_RETURN: f64 = 0.0963007951203275;

/// Raw vectors the master problem is assembled from.
///
/// All three vectors are indexed by asset and must have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterInputs {
    /// Expected loss per asset (objective of the main solve).
    pub expected_loss: Vec<f64>,
    /// Expected return per asset.
    pub asset_returns: Vec<f64>,
    /// Upper bound on each asset weight.
    pub upper_bounds: Vec<f64>,
    /// Minimum portfolio return the main solve must reach.
    pub required_return: f64,
}

impl MasterInputs {
    /// Creates a new set of master inputs.
    pub fn new(
        expected_loss: Vec<f64>,
        asset_returns: Vec<f64>,
        upper_bounds: Vec<f64>,
        required_return: f64,
    ) -> Self {
        Self {
            expected_loss,
            asset_returns,
            upper_bounds,
            required_return,
        }
    }

    /// Number of assets described by the inputs.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.expected_loss.len()
    }

    /// Checks that the vectors agree in length and hold finite values.
    ///
    /// When `expected_assets` is given, the common length must equal it.
    pub fn validate(&self, expected_assets: Option<usize>) -> Result<(), CoreError> {
        let n = self.expected_loss.len();
        if n == 0 {
            return Err(CoreError::configuration("master inputs contain no assets"));
        }
        if self.asset_returns.len() != n || self.upper_bounds.len() != n {
            return Err(CoreError::configuration(format!(
                "data shape doesn't match: expected_loss={}, asset_returns={}, upper_bounds={}",
                n,
                self.asset_returns.len(),
                self.upper_bounds.len()
            )));
        }
        if let Some(expected) = expected_assets {
            if n != expected {
                return Err(CoreError::configuration(format!(
                    "data shape doesn't match: expected {} assets, got {}",
                    expected, n
                )));
            }
        }

        let named = [
            ("expected_loss", &self.expected_loss),
            ("asset_returns", &self.asset_returns),
            ("upper_bounds", &self.upper_bounds),
        ];
        for (name, values) in named {
            if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
                return Err(CoreError::configuration(format!(
                    "{}[{}] is not finite",
                    name, pos
                )));
            }
        }
        if !self.required_return.is_finite() {
            return Err(CoreError::configuration("required_return is not finite"));
        }

        Ok(())
    }
}

/// Which constraint template the master matrix follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintTemplate {
    /// Budget rows, minimum-return row and box rows; minimises expected loss.
    #[default]
    MinReturn,
    /// Budget rows and box rows only; maximises return.
    ReturnProbe,
}

impl ConstraintTemplate {
    /// Number of aggregate rows placed before the box blocks.
    #[inline]
    pub fn fixed_rows(&self) -> usize {
        match self {
            Self::MinReturn => 3,
            Self::ReturnProbe => 2,
        }
    }
}

/// Row layout of a master matrix.
///
/// ```text
/// [0, fixed_rows)                  aggregate rows
/// [fixed_rows, fixed_rows + N)     lower box rows  (-x_j ≤ 0)
/// [fixed_rows + N, fixed_rows + 2N) upper box rows (x_j ≤ u_j)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowLayout {
    fixed_rows: usize,
    n_assets: usize,
}

impl RowLayout {
    /// Creates a layout with `fixed_rows` aggregate rows over `n_assets` assets.
    pub fn new(fixed_rows: usize, n_assets: usize) -> Self {
        Self {
            fixed_rows,
            n_assets,
        }
    }

    /// Layout of `template` over `n_assets` assets.
    pub fn for_template(template: ConstraintTemplate, n_assets: usize) -> Self {
        Self::new(template.fixed_rows(), n_assets)
    }

    /// Number of aggregate rows.
    #[inline]
    pub fn fixed_rows(&self) -> usize {
        self.fixed_rows
    }

    /// Number of assets (columns).
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.n_assets
    }

    /// Offset of the lower box block.
    #[inline]
    pub fn lower_offset(&self) -> usize {
        self.fixed_rows
    }

    /// Offset of the upper box block.
    #[inline]
    pub fn upper_offset(&self) -> usize {
        self.fixed_rows + self.n_assets
    }

    /// Total row count `M`.
    #[inline]
    pub fn total_rows(&self) -> usize {
        self.fixed_rows + 2 * self.n_assets
    }

    /// Lower box row of asset `j`.
    #[inline]
    pub fn lower_row(&self, j: usize) -> usize {
        j + self.lower_offset()
    }

    /// Upper box row of asset `j`.
    #[inline]
    pub fn upper_row(&self, j: usize) -> usize {
        j + self.upper_offset()
    }
}

/// Frozen master problem.
///
/// Built once from [`MasterInputs`] and never mutated afterwards, so it can
/// be shared behind an `Arc` by any number of workers.
#[derive(Debug, Clone)]
pub struct MasterProblem {
    template: ConstraintTemplate,
    layout: RowLayout,
    cost: Vec<f64>,
    lhs: CsMat<f64>,
    rhs: Vec<f64>,
    expected_loss: Vec<f64>,
    asset_returns: Vec<f64>,
    required_return: f64,
}

impl MasterProblem {
    /// Assembles the master problem for `template`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Configuration`] if the inputs fail validation.
    pub fn build(inputs: &MasterInputs, template: ConstraintTemplate) -> Result<Self, CoreError> {
        inputs.validate(None)?;

        let n = inputs.n_assets();
        let layout = RowLayout::for_template(template, n);
        let m = layout.total_rows();

        // 5N nonzeros at most: two budget rows, one return row, two box rows.
        let mut tri = TriMat::with_capacity((m, n), 5 * n);
        let mut rhs = Vec::with_capacity(m);

        for j in 0..n {
            tri.add_triplet(0, j, 1.0);
            tri.add_triplet(1, j, -1.0);
        }
        rhs.push(1.0);
        rhs.push(-1.0);

        if template == ConstraintTemplate::MinReturn {
            for (j, &r) in inputs.asset_returns.iter().enumerate() {
                if r != 0.0 {
                    tri.add_triplet(2, j, -r);
                }
            }
            rhs.push(-inputs.required_return);
        }

        for j in 0..n {
            tri.add_triplet(layout.lower_row(j), j, -1.0);
        }
        rhs.extend(std::iter::repeat(0.0).take(n));

        for j in 0..n {
            tri.add_triplet(layout.upper_row(j), j, 1.0);
        }
        rhs.extend_from_slice(&inputs.upper_bounds);

        let cost = match template {
            ConstraintTemplate::MinReturn => inputs.expected_loss.clone(),
            ConstraintTemplate::ReturnProbe => inputs.asset_returns.iter().map(|r| -r).collect(),
        };

        let master = Self {
            template,
            layout,
            cost,
            lhs: tri.to_csr(),
            rhs,
            expected_loss: inputs.expected_loss.clone(),
            asset_returns: inputs.asset_returns.clone(),
            required_return: inputs.required_return,
        };
        master.check_shape()?;
        Ok(master)
    }

    fn check_shape(&self) -> Result<(), CoreError> {
        let n = self.layout.n_assets();
        if self.cost.len() != n
            || self.lhs.cols() != n
            || self.lhs.rows() != self.rhs.len()
            || self.rhs.len() != self.layout.total_rows()
        {
            return Err(CoreError::configuration(format!(
                "master shape is inconsistent: cost={}, lhs={}x{}, rhs={}",
                self.cost.len(),
                self.lhs.rows(),
                self.lhs.cols(),
                self.rhs.len()
            )));
        }
        Ok(())
    }

    /// Constraint template of this master.
    #[inline]
    pub fn template(&self) -> ConstraintTemplate {
        self.template
    }

    /// Row layout of the constraint matrix.
    #[inline]
    pub fn layout(&self) -> RowLayout {
        self.layout
    }

    /// Asset count `N`.
    #[inline]
    pub fn n_assets(&self) -> usize {
        self.layout.n_assets()
    }

    /// Constraint row count `M`.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.layout.total_rows()
    }

    /// Objective coefficients (length `N`).
    pub fn cost(&self) -> &[f64] {
        &self.cost
    }

    /// Constraint matrix (`M × N`, CSR).
    pub fn lhs(&self) -> &CsMat<f64> {
        &self.lhs
    }

    /// Right-hand side (length `M`).
    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// Expected loss per asset, independent of the template's objective.
    pub fn expected_loss(&self) -> &[f64] {
        &self.expected_loss
    }

    /// Expected return per asset.
    pub fn asset_returns(&self) -> &[f64] {
        &self.asset_returns
    }

    /// Minimum portfolio return.
    #[inline]
    pub fn required_return(&self) -> f64 {
        self.required_return
    }
}
