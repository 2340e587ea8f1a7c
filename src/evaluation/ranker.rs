use crate::analysis::sentiment::Reaction;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Summary statistics over the top-k ranked items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKSummary {
    /// Number of items actually summarized (`min(k, len)`).
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl TopKSummary {
    pub fn outlook(&self) -> PatternOutlook {
        PatternOutlook::from_mean_change(self.mean)
    }
}

/// Reading of the mean forward move across historical analogues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternOutlook {
    Bullish,
    Bearish,
    Neutral,
}

impl PatternOutlook {
    /// Bullish above +2%, bearish below -2%.
    pub fn from_mean_change(mean_pct: f64) -> Self {
        if mean_pct > 2.0 {
            PatternOutlook::Bullish
        } else if mean_pct < -2.0 {
            PatternOutlook::Bearish
        } else {
            PatternOutlook::Neutral
        }
    }
}

impl std::fmt::Display for PatternOutlook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PatternOutlook::Bullish => "historically bullish",
            PatternOutlook::Bearish => "historically bearish",
            PatternOutlook::Neutral => "historically neutral",
        };
        write!(f, "{}", s)
    }
}

/// Top `k` items by `key`, descending. Ties keep input order.
pub fn top_k<T>(items: &[T], k: usize, key: impl Fn(&T) -> f64) -> Vec<&T> {
    let mut ranked: Vec<&T> = items.iter().collect();
    ranked.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}

/// Mean, median and range of `key` over the top `k` items ranked by `key`.
pub fn top_k_summary<T>(items: &[T], k: usize, key: impl Fn(&T) -> f64) -> Result<TopKSummary> {
    top_k_summary_by(items, k, &key, &key)
}

/// Rank by `rank_key` (descending), then summarize `value` over the top `k`.
///
/// Pattern search uses this to describe the price change of its most
/// similar matches.
pub fn top_k_summary_by<T>(
    items: &[T],
    k: usize,
    rank_key: impl Fn(&T) -> f64,
    value: impl Fn(&T) -> f64,
) -> Result<TopKSummary> {
    if k == 0 {
        return Err(AnalysisError::invalid("k must be >= 1"));
    }
    if items.is_empty() {
        return Err(AnalysisError::InsufficientData {
            found: 0,
            required: 1,
        });
    }
    let vals: Vec<f64> = top_k(items, k, rank_key).into_iter().map(value).collect();
    let count = vals.len();
    Ok(TopKSummary {
        count,
        mean: vals.iter().sum::<f64>() / count as f64,
        median: median(&vals),
        min: vals.iter().copied().fold(f64::INFINITY, f64::min),
        max: vals.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

/// How a presentation layer wants reactions ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOrder {
    /// Most recent occurrence first.
    Recency,
    /// Largest absolute reaction first.
    Magnitude,
}

pub fn rank_reactions(reactions: &[Reaction], order: ReactionOrder) -> Vec<&Reaction> {
    match order {
        ReactionOrder::Recency => top_k(reactions, reactions.len(), |r| {
            r.timestamp.timestamp_millis() as f64
        }),
        ReactionOrder::Magnitude => top_k(reactions, reactions.len(), |r| r.reaction_pct.abs()),
    }
}

pub(crate) fn median(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return 0.0;
    }
    let mut sorted = vals.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
