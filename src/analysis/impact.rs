use crate::domain::*;
use crate::error::{AnalysisError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::str::FromStr;

/// Calendar-day horizon over which an event's impact is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "3d")]
    ThreeDays,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "2w")]
    TwoWeeks,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "6m")]
    SixMonths,
}

impl Horizon {
    pub const ALL: [Horizon; 7] = [
        Horizon::OneDay,
        Horizon::ThreeDays,
        Horizon::OneWeek,
        Horizon::TwoWeeks,
        Horizon::OneMonth,
        Horizon::ThreeMonths,
        Horizon::SixMonths,
    ];

    /// Calendar days, not trading days.
    pub fn days(&self) -> i64 {
        match self {
            Horizon::OneDay => 1,
            Horizon::ThreeDays => 3,
            Horizon::OneWeek => 7,
            Horizon::TwoWeeks => 14,
            Horizon::OneMonth => 30,
            Horizon::ThreeMonths => 90,
            Horizon::SixMonths => 180,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Horizon::OneDay => "1d",
            Horizon::ThreeDays => "3d",
            Horizon::OneWeek => "1w",
            Horizon::TwoWeeks => "2w",
            Horizon::OneMonth => "1m",
            Horizon::ThreeMonths => "3m",
            Horizon::SixMonths => "6m",
        }
    }
}

impl FromStr for Horizon {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        Horizon::ALL
            .into_iter()
            .find(|h| h.code() == s)
            .ok_or_else(|| {
                AnalysisError::invalid(format!(
                    "unknown horizon '{}', expected one of 1d, 3d, 1w, 2w, 1m, 3m, 6m",
                    s
                ))
            })
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Three-tier bucket used for both impact magnitude and volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// High above 10%, Medium above 5% (absolute move).
    pub fn for_impact(percent_change: f64) -> Self {
        let magnitude = percent_change.abs();
        if magnitude > 10.0 {
            Level::High
        } else if magnitude > 5.0 {
            Level::Medium
        } else {
            Level::Low
        }
    }

    /// High above 3%, Medium above 1.5% daily volatility.
    pub fn for_volatility(volatility_pct: f64) -> Self {
        if volatility_pct > 3.0 {
            Level::High
        } else if volatility_pct > 1.5 {
            Level::Medium
        } else {
            Level::Low
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
        };
        write!(f, "{}", s)
    }
}

/// Price behaviour over `[anchor, anchor + horizon]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub anchor: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub horizon: Horizon,
    pub observations: usize,
    pub start_price: f64,
    pub end_price: f64,
    pub percent_change: f64,
    /// Standard deviation of daily returns inside the window, in percent.
    pub volatility: f64,
    pub max_price: f64,
    pub min_price: f64,
    pub max_gain_pct: f64,
    pub max_loss_pct: f64,
    pub impact: Level,
    pub volatility_level: Level,
    pub direction: Direction,
}

impl ImpactReport {
    pub fn print_summary(&self) {
        println!(
            "\n--- Event Impact ({}: {} to {}) ---",
            self.horizon,
            self.anchor.format("%Y-%m-%d"),
            self.window_end.format("%Y-%m-%d")
        );
        println!("  Starting price:   {:>12.2}", self.start_price);
        println!("  Ending price:     {:>12.2}", self.end_price);
        println!("  Total change:     {:>+11.2}%", self.percent_change);
        println!("  Daily volatility: {:>11.2}%", self.volatility);
        println!(
            "  Max gain:         {:>+11.2}% ({:.2})",
            self.max_gain_pct, self.max_price
        );
        println!(
            "  Max loss:         {:>+11.2}% ({:.2})",
            self.max_loss_pct, self.min_price
        );
        println!("  Impact:           {:>12}", self.impact.to_string());
        println!("  Volatility:       {:>12}", self.volatility_level.to_string());
        println!("  Direction:        {:>12}", self.direction.to_string());
    }
}

/// Measure the move following `anchor` over `horizon`.
///
/// The start price is the last close at or before the anchor, falling back
/// to the first close inside the window when the anchor precedes the series.
pub fn analyze_impact(
    series: &TimeSeries,
    anchor: DateTime<Utc>,
    horizon: Horizon,
) -> Result<ImpactReport> {
    let window_end = anchor
        .checked_add_signed(Duration::days(horizon.days()))
        .ok_or_else(|| AnalysisError::invalid(format!("anchor {} is out of range", anchor)))?;
    let range = series.index_range(anchor, window_end);
    if range.is_empty() {
        return Err(AnalysisError::no_data(format!(
            "no observations between {} and {}",
            anchor.format("%Y-%m-%d"),
            window_end.format("%Y-%m-%d")
        )));
    }
    let window = &series.observations()[range];
    let closes: Vec<f64> = window.iter().map(|o| o.close).collect();

    let start_price = series
        .index_at_or_before(anchor)
        .map(|i| series.observations()[i].close)
        .unwrap_or(closes[0]);
    if start_price.abs() < 1e-15 {
        return Err(AnalysisError::invalid("start price is zero"));
    }
    let end_price = closes[closes.len() - 1];
    let percent_change = (end_price - start_price) / start_price * 100.0;

    let returns = pct_returns(&closes);
    let volatility = if returns.len() >= 2 {
        returns.iter().std_dev() * 100.0
    } else {
        0.0
    };

    let max_price = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_price = closes.iter().copied().fold(f64::INFINITY, f64::min);

    Ok(ImpactReport {
        anchor,
        window_end,
        horizon,
        observations: window.len(),
        start_price,
        end_price,
        percent_change,
        volatility,
        max_price,
        min_price,
        max_gain_pct: (max_price - start_price) / start_price * 100.0,
        max_loss_pct: (min_price - start_price) / start_price * 100.0,
        impact: Level::for_impact(percent_change),
        volatility_level: Level::for_volatility(volatility),
        direction: Direction::classify(percent_change, 0.0),
    })
}
