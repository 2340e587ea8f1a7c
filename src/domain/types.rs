use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One OHLCV observation. Only `close` is required; the other fields are
/// `None` when the data source did not provide them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

impl Observation {
    /// Observation carrying only a close price.
    pub fn close_only(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
        }
    }
}

/// Immutable, strictly time-ordered series of observations for one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    symbol: String,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series, rejecting unordered or duplicate timestamps and
    /// non-finite closes.
    pub fn new(symbol: impl Into<String>, observations: Vec<Observation>) -> Result<Self> {
        for (i, obs) in observations.iter().enumerate() {
            if !obs.close.is_finite() {
                return Err(AnalysisError::invalid(format!(
                    "non-finite close at {}",
                    obs.timestamp
                )));
            }
            if i > 0 && obs.timestamp <= observations[i - 1].timestamp {
                return Err(AnalysisError::invalid(format!(
                    "timestamps must be strictly increasing (at {})",
                    obs.timestamp
                )));
            }
        }
        Ok(Self {
            symbol: symbol.into(),
            observations,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
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

    /// Index range of observations with `start <= timestamp <= end`.
    pub fn index_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Range<usize> {
        let lo = self.observations.partition_point(|o| o.timestamp < start);
        let hi = self.observations.partition_point(|o| o.timestamp <= end);
        lo..hi.max(lo)
    }

    /// Index of the last observation at or before `ts`.
    pub fn index_at_or_before(&self, ts: DateTime<Utc>) -> Option<usize> {
        let n = self.observations.partition_point(|o| o.timestamp <= ts);
        n.checked_sub(1)
    }

    /// Index of the observation closest in time to `ts`. Ties go to the
    /// earlier observation.
    pub fn nearest_index(&self, ts: DateTime<Utc>) -> Option<usize> {
        if self.observations.is_empty() {
            return None;
        }
        let after = self.observations.partition_point(|o| o.timestamp < ts);
        if after == 0 {
            return Some(0);
        }
        if after == self.observations.len() {
            return Some(after - 1);
        }
        let before_gap = ts - self.observations[after - 1].timestamp;
        let after_gap = self.observations[after].timestamp - ts;
        if after_gap < before_gap {
            Some(after)
        } else {
            Some(after - 1)
        }
    }
}

/// A user-labelled event used as an analysis anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Single {
        date: DateTime<Utc>,
        label: String,
    },
    Range {
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        label: String,
    },
}

impl Event {
    pub fn single(date: DateTime<Utc>, label: impl Into<String>) -> Self {
        Event::Single {
            date,
            label: label.into(),
        }
    }

    pub fn range(
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        label: impl Into<String>,
    ) -> Result<Self> {
        if end_date < start_date {
            return Err(AnalysisError::invalid(format!(
                "event range ends ({}) before it starts ({})",
                end_date, start_date
            )));
        }
        Ok(Event::Range {
            start_date,
            end_date,
            label: label.into(),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Event::Single { label, .. } | Event::Range { label, .. } => label,
        }
    }

    /// Instant the event's aftermath is measured from: the date itself, or
    /// the end of a range.
    pub fn anchor(&self) -> DateTime<Utc> {
        match self {
            Event::Single { date, .. } => *date,
            Event::Range { end_date, .. } => *end_date,
        }
    }

    /// `(start, end)` covered by the event.
    pub fn span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            Event::Single { date, .. } => (*date, *date),
            Event::Range {
                start_date,
                end_date,
                ..
            } => (*start_date, *end_date),
        }
    }
}

/// Interval that pattern search must never use as (part of) a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub reason: String,
}

impl ExclusionRange {
    pub fn new(
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<Self> {
        let range = Self {
            start_date,
            end_date,
            reason: reason.into(),
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_date < self.start_date {
            return Err(AnalysisError::invalid(format!(
                "exclusion range ends ({}) before it starts ({})",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start_date <= ts && ts <= self.end_date
    }

    /// True when `[start, end]` intersects this range.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start <= self.end_date && self.start_date <= end
    }
}

/// Optional bounds on the pattern search domain. Both bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchConstraint {
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
}

impl SearchConstraint {
    pub fn validate(&self) -> Result<()> {
        if let (Some(after), Some(before)) = (self.after, self.before) {
            if before < after {
                return Err(AnalysisError::invalid(format!(
                    "search constraint 'before' ({}) precedes 'after' ({})",
                    before, after
                )));
            }
        }
        Ok(())
    }

    pub fn admits(&self, ts: DateTime<Utc>) -> bool {
        self.after.map_or(true, |a| ts >= a) && self.before.map_or(true, |b| ts <= b)
    }
}

/// Sign of a price move after thresholding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

impl Direction {
    /// Positive above `threshold`, negative below `-threshold`, else neutral.
    pub fn classify(change_pct: f64, threshold: f64) -> Self {
        if change_pct > threshold {
            Direction::Positive
        } else if change_pct < -threshold {
            Direction::Negative
        } else {
            Direction::Neutral
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Positive => "Positive",
            Direction::Negative => "Negative",
            Direction::Neutral => "Neutral",
        };
        write!(f, "{}", s)
    }
}
