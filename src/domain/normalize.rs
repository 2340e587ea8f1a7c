use crate::error::{AnalysisError, Result};

/// Min-max scale a close-price sequence into `[0, 1]`.
///
/// The output always contains at least one 0.0 and one 1.0. A sequence whose
/// min equals its max (including empty and single-point input) has no shape
/// to compare and fails with `FlatWindow`.
pub fn normalize(closes: &[f64]) -> Result<Vec<f64>> {
    let (lo, hi) = closes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
            (lo.min(c), hi.max(c))
        });
    if closes.is_empty() || hi <= lo {
        return Err(AnalysisError::FlatWindow);
    }
    let range = hi - lo;
    Ok(closes.iter().map(|&c| (c - lo) / range).collect())
}

/// Simple percentage returns between consecutive closes, skipping pairs
/// whose base is zero.
pub fn pct_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0].abs() > 1e-15)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}
