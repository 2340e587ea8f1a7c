pub mod asset;
pub mod cache;

pub use asset::*;
pub use cache::*;

use crate::domain::TimeSeries;
use crate::error::DataError;
use std::path::Path;

/// Load a series from a `.json` asset document or a CSV file. CSV input
/// takes its symbol from the file stem.
pub fn load_series(path: impl AsRef<Path>) -> Result<TimeSeries, DataError> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return load_asset_json(path);
    }
    let symbol = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_default();
    load_series_csv(&symbol, path)
}
