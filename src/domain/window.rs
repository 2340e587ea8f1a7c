use super::types::{Observation, TimeSeries};
use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contiguous, time-bounded slice of a series.
///
/// `start <= observations[0].timestamp` and
/// `observations[last].timestamp <= end` always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub observations: Vec<Observation>,
}

impl Window {
    /// Window bounded exactly by its first and last observation.
    pub(crate) fn from_slice(observations: &[Observation]) -> Option<Self> {
        let first = observations.first()?;
        let last = observations.last()?;
        Some(Self {
            start: first.timestamp,
            end: last.timestamp,
            observations: observations.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    /// Percent move from first to last close.
    pub fn price_change_pct(&self) -> Option<f64> {
        price_change_pct(&self.observations)
    }

    /// Rejects windows that cannot be shape-matched: fewer than two
    /// observations, or every close equal.
    pub fn ensure_shape(&self) -> Result<()> {
        if self.observations.len() < 2 || is_flat(&self.observations) {
            return Err(AnalysisError::FlatWindow);
        }
        Ok(())
    }
}

/// Extract every observation with `start <= timestamp <= end`.
/// `Ok(None)` when nothing falls in range; callers branch on that before
/// doing any analysis. Reversed bounds are an `InvalidParameter`.
pub fn extract(
    series: &TimeSeries,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Option<Window>> {
    if end < start {
        return Err(AnalysisError::invalid(format!(
            "window ends ({}) before it starts ({})",
            end, start
        )));
    }
    let range = series.index_range(start, end);
    if range.is_empty() {
        return Ok(None);
    }
    Ok(Some(Window {
        start,
        end,
        observations: series.observations()[range].to_vec(),
    }))
}

pub(crate) fn is_flat(observations: &[Observation]) -> bool {
    match observations.first() {
        Some(first) => observations.iter().all(|o| o.close == first.close),
        None => true,
    }
}

pub(crate) fn price_change_pct(observations: &[Observation]) -> Option<f64> {
    let first = observations.first()?.close;
    let last = observations.last()?.close;
    if first.abs() < 1e-15 {
        return None;
    }
    Some((last - first) / first * 100.0)
}
