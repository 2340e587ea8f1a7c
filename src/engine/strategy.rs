use super::control::SearchControl;
use super::search::Match;
use crate::domain::*;
use crate::error::Result;

/// Everything that describes what to look for, independent of how the
/// search is tuned.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    pub reference: &'a Window,
    pub exclusions: &'a [ExclusionRange],
    pub constraint: Option<&'a SearchConstraint>,
}

impl<'a> SearchRequest<'a> {
    pub fn new(reference: &'a Window) -> Self {
        Self {
            reference,
            exclusions: &[],
            constraint: None,
        }
    }

    pub fn with_exclusions(mut self, exclusions: &'a [ExclusionRange]) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_constraint(mut self, constraint: &'a SearchConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }
}

/// Boundary between "what analogue are we after" and "how candidates are
/// found".
pub trait PatternMatcher {
    /// Return matches ordered best first.
    fn find_matches(
        &self,
        series: &TimeSeries,
        request: &SearchRequest<'_>,
        control: &SearchControl<'_>,
    ) -> Result<Vec<Match>>;
}

/// Optional secondary refinement of a base similarity score, e.g. comparing
/// behaviour before and after both windows.
///
/// No concrete rule ships with the crate. When an engine has no scorer
/// installed the base correlation is used as is.
pub trait ContextScorer: Send + Sync {
    /// Return the adjusted score for a candidate whose base correlation with
    /// the reference is `base`.
    fn adjust(&self, reference: &[Observation], candidate: &[Observation], base: f64) -> f64;
}
