use super::cache::parse_timestamp;
use crate::domain::{Observation, TimeSeries};
use crate::error::DataError;
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// Stored asset document: a symbol plus a `historical_data` array whose
/// entries may carry `null` for any price field. Other metadata keys are
/// ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDocument {
    pub symbol: String,
    pub historical_data: Vec<AssetRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetRow {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl AssetDocument {
    /// Convert to a series, dropping rows without a close.
    pub fn into_series(self) -> Result<TimeSeries, DataError> {
        let mut observations = Vec::with_capacity(self.historical_data.len());
        for (i, row) in self.historical_data.into_iter().enumerate() {
            let timestamp = parse_timestamp(&row.date).ok_or_else(|| DataError::Parse {
                line: i + 1,
                message: format!("bad date '{}'", row.date),
            })?;
            let Some(close) = row.close else {
                warn!(symbol = %self.symbol, %timestamp, "skipping row without close");
                continue;
            };
            observations.push(Observation {
                timestamp,
                open: row.open,
                high: row.high,
                low: row.low,
                close,
                volume: row.volume,
            });
        }
        Ok(TimeSeries::new(self.symbol, observations)?)
    }
}

pub fn parse_asset_json(text: &str) -> Result<TimeSeries, DataError> {
    let doc: AssetDocument = serde_json::from_str(text)?;
    doc.into_series()
}

pub fn load_asset_json(path: impl AsRef<Path>) -> Result<TimeSeries, DataError> {
    let text = std::fs::read_to_string(path)?;
    parse_asset_json(&text)
}
