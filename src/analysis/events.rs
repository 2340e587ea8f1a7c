use super::impact::{analyze_impact, Horizon, ImpactReport};
use crate::domain::*;
use crate::error::{AnalysisError, Result};
use chrono::Duration;

/// Reference window for pattern search: the event's span widened by
/// `padding_days` on each side.
pub fn reference_window_for_event(
    series: &TimeSeries,
    event: &Event,
    padding_days: i64,
) -> Result<Window> {
    if padding_days < 0 {
        return Err(AnalysisError::invalid("padding_days must be >= 0"));
    }
    let (start, end) = event.span();
    let padded = Duration::try_days(padding_days).and_then(|pad| {
        Some((start.checked_sub_signed(pad)?, end.checked_add_signed(pad)?))
    });
    let Some((start, end)) = padded else {
        return Err(AnalysisError::invalid(format!(
            "padding of {} days around '{}' is out of range",
            padding_days,
            event.label()
        )));
    };
    extract(series, start, end)?.ok_or_else(|| {
        AnalysisError::no_data(format!(
            "no observations around event '{}' ({} to {})",
            event.label(),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ))
    })
}

/// Price level an event happened at: the close on the event date (or the
/// nearest observation), or the mean close across a range event.
pub fn event_price(series: &TimeSeries, event: &Event) -> Result<f64> {
    match event {
        Event::Single { date, .. } => series
            .nearest_index(*date)
            .map(|i| series.observations()[i].close)
            .ok_or_else(|| AnalysisError::no_data("series is empty")),
        Event::Range {
            start_date,
            end_date,
            label,
        } => {
            let window = extract(series, *start_date, *end_date)?.ok_or_else(|| {
                AnalysisError::no_data(format!("no observations inside event range '{}'", label))
            })?;
            let closes = window.closes();
            Ok(closes.iter().sum::<f64>() / closes.len() as f64)
        }
    }
}

/// Impact measured from the event's anchor (its date, or the end of a range).
pub fn analyze_event_impact(
    series: &TimeSeries,
    event: &Event,
    horizon: Horizon,
) -> Result<ImpactReport> {
    analyze_impact(series, event.anchor(), horizon)
}

/// One row of a multi-event comparison.
#[derive(Debug, Clone)]
pub struct EventComparison {
    pub event: Event,
    pub impact: Result<ImpactReport>,
}

/// Measure every event at the same horizon. A failure for one event is kept
/// in its row and does not stop the others.
pub fn compare_events(
    series: &TimeSeries,
    events: &[Event],
    horizon: Horizon,
) -> Vec<EventComparison> {
    events
        .iter()
        .map(|event| EventComparison {
            event: event.clone(),
            impact: analyze_event_impact(series, event, horizon),
        })
        .collect()
}

pub fn print_comparison(symbol: &str, horizon: Horizon, rows: &[EventComparison]) {
    println!("\n--- Event Comparison for {} ({} impact) ---", symbol, horizon);
    for (i, row) in rows.iter().enumerate() {
        let (start, end) = row.event.span();
        let when = if start == end {
            start.format("%Y-%m-%d").to_string()
        } else {
            format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        };
        match &row.impact {
            Ok(report) => println!(
                "  {:>2}. {:<30} {:<24} {:>+8.2}%  {} impact",
                i + 1,
                row.event.label(),
                when,
                report.percent_change,
                report.impact
            ),
            Err(e) => println!("  {:>2}. {:<30} {:<24} {}", i + 1, row.event.label(), when, e),
        }
    }
}
