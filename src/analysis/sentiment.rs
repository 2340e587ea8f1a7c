use crate::domain::*;
use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Moves within +/-1% count as neutral reactions.
const REACTION_NEUTRAL_BAND_PCT: f64 = 1.0;
/// One side must outnumber the other by this factor to call a bias.
const SENTIMENT_DOMINANCE: f64 = 1.5;

/// Short-horizon outcome after price visited the target band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub reaction_pct: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Mixed,
}

impl Sentiment {
    pub fn from_counts(positive: usize, negative: usize) -> Self {
        let (p, n) = (positive as f64, negative as f64);
        if p > n * SENTIMENT_DOMINANCE {
            Sentiment::Bullish
        } else if n > p * SENTIMENT_DOMINANCE {
            Sentiment::Bearish
        } else {
            Sentiment::Mixed
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sentiment::Bullish => "BULLISH",
            Sentiment::Bearish => "BEARISH",
            Sentiment::Mixed => "MIXED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub target_price: f64,
    pub tolerance_pct: f64,
    pub band_low: f64,
    pub band_high: f64,
    /// Observations whose close fell inside the band.
    pub occurrences: usize,
    /// One per occurrence that had at least one later observation.
    pub reactions: Vec<Reaction>,
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub mean_reaction_pct: f64,
    pub sentiment: Sentiment,
}

impl SentimentReport {
    pub fn share(&self, count: usize) -> f64 {
        if self.reactions.is_empty() {
            0.0
        } else {
            count as f64 / self.reactions.len() as f64 * 100.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n--- Price Sentiment ---");
        println!(
            "  Target: {:.2}  band {:.2} - {:.2} (+/-{:.1}%)",
            self.target_price, self.band_low, self.band_high, self.tolerance_pct
        );
        println!("  Occurrences:      {:>8}", self.occurrences);
        println!("  Reactions:        {:>8}", self.reactions.len());
        println!("  Mean reaction:    {:>+7.2}%", self.mean_reaction_pct);
        println!(
            "  Positive: {} ({:.1}%)  Negative: {} ({:.1}%)  Neutral: {} ({:.1}%)",
            self.positive,
            self.share(self.positive),
            self.negative,
            self.share(self.negative),
            self.neutral,
            self.share(self.neutral)
        );
        println!("  Sentiment:        {:>8}", self.sentiment.to_string());
        let shown = self.reactions.len().min(20);
        for r in &self.reactions[self.reactions.len() - shown..] {
            println!(
                "    {}: {:.2} -> {:+.1}% ({})",
                r.timestamp.format("%Y-%m-%d"),
                r.price,
                r.reaction_pct,
                r.direction
            );
        }
        if self.reactions.len() > shown {
            println!("    ... and {} more", self.reactions.len() - shown);
        }
    }
}

/// Aggregate how the market reacted every time the close revisited
/// `target_price` within `tolerance_pct`.
///
/// Fewer than `min_occurrences` band hits is reported as
/// `InsufficientData` rather than as a thin report.
pub fn analyze_sentiment(
    series: &TimeSeries,
    target_price: f64,
    params: &SentimentParams,
) -> Result<SentimentReport> {
    params.validate()?;
    if !target_price.is_finite() || target_price <= 0.0 {
        return Err(AnalysisError::invalid(format!(
            "target price must be positive, got {}",
            target_price
        )));
    }

    let band_low = target_price * (1.0 - params.tolerance_pct / 100.0);
    let band_high = target_price * (1.0 + params.tolerance_pct / 100.0);
    let observations = series.observations();

    let hits: Vec<usize> = observations
        .iter()
        .enumerate()
        .filter(|(_, o)| o.close >= band_low && o.close <= band_high)
        .map(|(i, _)| i)
        .collect();
    debug!(
        symbol = series.symbol(),
        target_price,
        band_low,
        band_high,
        occurrences = hits.len(),
        "price level occurrences"
    );
    if hits.len() < params.min_occurrences {
        return Err(AnalysisError::InsufficientData {
            found: hits.len(),
            required: params.min_occurrences,
        });
    }

    let reactions: Vec<Reaction> = hits
        .iter()
        .filter_map(|&i| {
            let occurrence = &observations[i];
            let future_end = i
                .saturating_add(1)
                .saturating_add(params.reaction_horizon)
                .min(observations.len());
            let last_future = observations[i + 1..future_end].last()?;
            let reaction_pct = (last_future.close - occurrence.close) / occurrence.close * 100.0;
            Some(Reaction {
                timestamp: occurrence.timestamp,
                price: occurrence.close,
                reaction_pct,
                direction: Direction::classify(reaction_pct, REACTION_NEUTRAL_BAND_PCT),
            })
        })
        .collect();

    if reactions.is_empty() {
        return Err(AnalysisError::no_data(
            "no occurrence is followed by a later observation",
        ));
    }

    let count = |d: Direction| reactions.iter().filter(|r| r.direction == d).count();
    let positive = count(Direction::Positive);
    let negative = count(Direction::Negative);
    let neutral = count(Direction::Neutral);
    let mean_reaction_pct =
        reactions.iter().map(|r| r.reaction_pct).sum::<f64>() / reactions.len() as f64;

    Ok(SentimentReport {
        target_price,
        tolerance_pct: params.tolerance_pct,
        band_low,
        band_high,
        occurrences: hits.len(),
        reactions,
        positive,
        negative,
        neutral,
        mean_reaction_pct,
        sentiment: Sentiment::from_counts(positive, negative),
    })
}
