use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pattern search knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Minimum similarity for a match, in (0, 1].
    pub precision: f64,
    /// Observations between successive candidate start points.
    pub stride: usize,
    /// Candidates starting within this many days of the reference start are skipped.
    pub anti_overlap_days: i64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            precision: 0.80,
            stride: 5,
            anti_overlap_days: 30,
        }
    }
}

impl SearchParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.precision > 0.0 && self.precision <= 1.0) {
            return Err(AnalysisError::invalid(format!(
                "precision must be in (0, 1], got {}",
                self.precision
            )));
        }
        if self.stride == 0 {
            return Err(AnalysisError::invalid("stride must be >= 1"));
        }
        if self.anti_overlap_days < 1 {
            return Err(AnalysisError::invalid(format!(
                "anti_overlap_days must be >= 1, got {}",
                self.anti_overlap_days
            )));
        }
        Ok(())
    }
}

/// Price-level sentiment knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentParams {
    /// Half-width of the price band, in percent of the target.
    pub tolerance_pct: f64,
    /// Fewer occurrences than this is reported as insufficient data.
    pub min_occurrences: usize,
    /// Observations after an occurrence used to measure the reaction.
    pub reaction_horizon: usize,
}

impl Default for SentimentParams {
    fn default() -> Self {
        Self {
            tolerance_pct: 5.0,
            min_occurrences: 3,
            reaction_horizon: 5,
        }
    }
}

impl SentimentParams {
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_pct.is_finite() || !(0.0..100.0).contains(&self.tolerance_pct) {
            return Err(AnalysisError::invalid(format!(
                "tolerance_pct must be in [0, 100), got {}",
                self.tolerance_pct
            )));
        }
        if self.reaction_horizon == 0 {
            return Err(AnalysisError::invalid("reaction_horizon must be >= 1"));
        }
        Ok(())
    }
}

/// Everything a host can configure, loadable from JSON. Missing fields take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub search: SearchParams,
    pub sentiment: SentimentParams,
    /// Days added on both sides of an event to form its reference window.
    pub pattern_padding_days: i64,
    /// How many top results feed the summary statistics.
    pub summary_top_k: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            search: SearchParams::default(),
            sentiment: SentimentParams::default(),
            pattern_padding_days: 10,
            summary_top_k: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> std::result::Result<Self, crate::DataError> {
        let text = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.sentiment.validate()?;
        if self.pattern_padding_days < 0 {
            return Err(AnalysisError::invalid("pattern_padding_days must be >= 0"));
        }
        if self.summary_top_k == 0 {
            return Err(AnalysisError::invalid("summary_top_k must be >= 1"));
        }
        Ok(())
    }
}
