//! Scenario identifiers and definitions.

use std::fmt;

/// Dense identifier of a scenario in `[0, S)`.
///
/// # Examples
///
/// ```
/// use lp_core::ScenarioId;
///
/// let id = ScenarioId::new(7);
/// assert_eq!(id.index(), 7);
/// assert_eq!(id.to_string(), "7");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioId(usize);

impl ScenarioId {
    /// Creates a new scenario ID.
    #[inline]
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    /// Returns the ID as a position in the scenario list.
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for ScenarioId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

/// One restriction of the master problem to a subset of assets.
///
/// The order of `active_vars` is significant: it fixes the column order of
/// the sub-problem, and therefore the order of the returned solution vector.
/// Validation is deferred to [`ScenarioIndexer`](crate::ScenarioIndexer) so a
/// malformed scenario fails on its own instead of at load time.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario {
    id: ScenarioId,
    active_vars: Vec<usize>,
}

impl Scenario {
    /// Creates a scenario.
    pub fn new(id: impl Into<ScenarioId>, active_vars: Vec<usize>) -> Self {
        Self {
            id: id.into(),
            active_vars,
        }
    }

    /// Builds scenarios with ids taken from list positions.
    pub fn from_lists(lists: impl IntoIterator<Item = Vec<usize>>) -> Vec<Self> {
        lists
            .into_iter()
            .enumerate()
            .map(|(i, vars)| Self::new(i, vars))
            .collect()
    }

    /// Scenario ID.
    #[inline]
    pub fn id(&self) -> ScenarioId {
        self.id
    }

    /// Active asset indices, in column order.
    pub fn active_vars(&self) -> &[usize] {
        &self.active_vars
    }

    /// Number of active assets.
    #[inline]
    pub fn len(&self) -> usize {
        self.active_vars.len()
    }

    /// Whether the scenario has no active assets.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active_vars.is_empty()
    }
}
