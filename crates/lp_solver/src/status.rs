//! Solve status normalisation.

use std::fmt;

/// Four-way outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Constraints cannot be satisfied.
    Infeasible,
    /// Objective is unbounded below.
    Unbounded,
    /// Anything else, including numerical trouble and per-scenario failures.
    Unknown,
}

impl SolveStatus {
    /// All statuses, in reporting order.
    pub const ALL: [SolveStatus; 4] = [
        SolveStatus::Optimal,
        SolveStatus::Infeasible,
        SolveStatus::Unbounded,
        SolveStatus::Unknown,
    ];

    /// Maps a solver-reported status string onto the four-way enum.
    ///
    /// Case, surrounding whitespace, `_` and `-` are ignored, so
    /// `"Primal_Infeasible"` and `"primal infeasible"` agree.
    ///
    /// # Examples
    ///
    /// ```
    /// use lp_solver::SolveStatus;
    ///
    /// assert_eq!(SolveStatus::normalize("optimal"), SolveStatus::Optimal);
    /// assert_eq!(SolveStatus::normalize("primal infeasible"), SolveStatus::Infeasible);
    /// assert_eq!(SolveStatus::normalize("dual infeasible"), SolveStatus::Unbounded);
    /// assert_eq!(SolveStatus::normalize("numerical trouble"), SolveStatus::Unknown);
    /// ```
    pub fn normalize(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();

        match key.split_whitespace().collect::<Vec<_>>().join(" ").as_str() {
            "optimal" => Self::Optimal,
            "infeasible" | "primal infeasible" => Self::Infeasible,
            "unbounded" | "dual infeasible" => Self::Unbounded,
            _ => Self::Unknown,
        }
    }

    /// Canonical lowercase name, as written to result files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::Unknown => "unknown",
        }
    }

    /// Whether this is [`SolveStatus::Optimal`].
    #[inline]
    pub fn is_optimal(&self) -> bool {
        matches!(self, Self::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants() {
        assert_eq!(SolveStatus::normalize("  OPTIMAL "), SolveStatus::Optimal);
        assert_eq!(SolveStatus::normalize("infeasible"), SolveStatus::Infeasible);
        assert_eq!(SolveStatus::normalize("Primal_Infeasible"), SolveStatus::Infeasible);
        assert_eq!(SolveStatus::normalize("primal-infeasible"), SolveStatus::Infeasible);
        assert_eq!(SolveStatus::normalize("unbounded"), SolveStatus::Unbounded);
        assert_eq!(SolveStatus::normalize("dual  infeasible"), SolveStatus::Unbounded);
        assert_eq!(SolveStatus::normalize("unknown"), SolveStatus::Unknown);
        assert_eq!(SolveStatus::normalize(""), SolveStatus::Unknown);
        assert_eq!(SolveStatus::normalize("optimal-ish"), SolveStatus::Unknown);
    }

    #[test]
    fn test_display_round_trips_through_normalize() {
        for status in SolveStatus::ALL {
            assert_eq!(SolveStatus::normalize(&status.to_string()), status);
        }
    }
}
