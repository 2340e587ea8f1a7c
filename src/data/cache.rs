use crate::domain::{Observation, TimeSeries};
use crate::error::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::path::Path;
use tracing::warn;

const HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// Parse RFC 3339 (`2024-01-15T00:00:00-05:00`), `YYYY-MM-DD HH:MM:SS`, or a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Save a series as CSV. Unknown fields are written as empty cells.
pub fn save_series_csv(series: &TimeSeries, path: impl AsRef<Path>) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADER)?;

    let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
    for o in series.observations() {
        writer.write_record(&[
            o.timestamp.to_rfc3339(),
            opt(o.open),
            opt(o.high),
            opt(o.low),
            o.close.to_string(),
            opt(o.volume),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Load a series from CSV. Columns are located by header name
/// (`timestamp` or `date`, `open`, `high`, `low`, `close`, `volume`); only the
/// timestamp and close columns are required. Rows with an empty close are
/// skipped.
pub fn load_series_csv(symbol: &str, path: impl AsRef<Path>) -> Result<TimeSeries, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let col = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));

    let ts_col = col(&["timestamp", "date", "datetime"]).ok_or_else(|| DataError::Parse {
        line: 1,
        message: "missing timestamp/date column".into(),
    })?;
    let close_col = col(&["close"]).ok_or_else(|| DataError::Parse {
        line: 1,
        message: "missing close column".into(),
    })?;
    let open_col = col(&["open"]);
    let high_col = col(&["high"]);
    let low_col = col(&["low"]);
    let volume_col = col(&["volume"]);

    let mut observations = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let line = i + 2;
        let field = |c: Option<usize>| -> Result<Option<f64>, DataError> {
            match c.and_then(|c| record.get(c)).map(str::trim) {
                None | Some("") => Ok(None),
                Some(v) => v.parse::<f64>().map(Some).map_err(|e| DataError::Parse {
                    line,
                    message: format!("bad number '{}': {}", v, e),
                }),
            }
        };

        let raw_ts = record.get(ts_col).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::Parse {
            line,
            message: format!("bad timestamp '{}'", raw_ts),
        })?;
        let Some(close) = field(Some(close_col))? else {
            warn!(line, %timestamp, "skipping row without close");
            continue;
        };

        observations.push(Observation {
            timestamp,
            open: field(open_col)?,
            high: field(high_col)?,
            low: field(low_col)?,
            close,
            volume: field(volume_col)?,
        });
    }

    Ok(TimeSeries::new(symbol, observations)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::fixtures::{daily_series, day};
    use crate::error::AnalysisError;

    #[test]
    fn test_csv_round_trip() {
        let mut obs = daily_series(&[100.0, 101.5]).observations().to_vec();
        obs[0].open = Some(99.0);
        obs[0].volume = Some(12345.0);
        let series = TimeSeries::new("AAPL", obs).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aapl.csv");
        save_series_csv(&series, &path).unwrap();
        let loaded = load_series_csv("AAPL", &path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.symbol(), "AAPL");
        assert_eq!(loaded.observations()[0].timestamp, day(0));
        assert_eq!(loaded.observations()[0].open, Some(99.0));
        assert_eq!(loaded.observations()[0].high, None);
        assert_eq!(loaded.observations()[0].volume, Some(12345.0));
        assert!((loaded.observations()[1].close - 101.5).abs() < 1e-10);
    }

    #[test]
    fn test_load_date_only_and_skip_missing_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btc.csv");
        std::fs::write(
            &path,
            "Date,Close\n2020-01-01,10\n2020-01-02,\n2020-01-03,12.5\n",
        )
        .unwrap();
        let loaded = load_series_csv("BTC", &path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.observations()[1].timestamp, day(2));
        assert_eq!(loaded.observations()[1].open, None);
    }

    #[test]
    fn test_load_rejects_unordered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "date,close\n2020-01-02,10\n2020-01-01,11\n").unwrap();
        assert!(matches!(
            load_series_csv("X", &path),
            Err(DataError::Invalid(AnalysisError::InvalidParameter(_)))
        ));
    }

    #[test]
    fn test_load_reports_bad_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "date,close\n2020-01-01,abc\n").unwrap();
        assert!(matches!(
            load_series_csv("X", &path),
            Err(DataError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_load_missing_close_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noclose.csv");
        std::fs::write(&path, "date,open\n2020-01-01,1\n").unwrap();
        assert!(matches!(
            load_series_csv("X", &path),
            Err(DataError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        assert!(load_series_csv("X", "/tmp/does_not_exist_eventscope.csv").is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(parse_timestamp("2020-01-03"), Some(day(2)));
        assert_eq!(parse_timestamp("2020-01-03T00:00:00Z"), Some(day(2)));
        assert_eq!(parse_timestamp("2020-01-03 00:00:00"), Some(day(2)));
        assert_eq!(
            parse_timestamp("2020-01-02T19:00:00-05:00"),
            Some(day(2))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
