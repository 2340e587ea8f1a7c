use thiserror::Error;

/// Failures reported by the analysis core. All of them are recoverable:
/// the caller gets a tagged result and decides what to show.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("window has no close-price variance")]
    FlatWindow,

    #[error("reference window is flat, nothing to search for")]
    FlatReference,

    #[error("no data: {context}")]
    NoData { context: String },

    #[error("insufficient data: found {found}, required {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("search cancelled")]
    Cancelled,
}

impl AnalysisError {
    pub fn no_data(context: impl Into<String>) -> Self {
        AnalysisError::NoData {
            context: context.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AnalysisError::InvalidParameter(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors from loading or writing series files.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parse error at record {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Invalid(#[from] AnalysisError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AnalysisError::InsufficientData { found: 2, required: 3 }.to_string(),
            "insufficient data: found 2, required 3"
        );
        assert_eq!(
            AnalysisError::no_data("2020-01-01 to 2020-01-05").to_string(),
            "no data: 2020-01-01 to 2020-01-05"
        );
        assert_eq!(
            AnalysisError::invalid("stride must be >= 1").to_string(),
            "invalid parameter: stride must be >= 1"
        );
    }

    #[test]
    fn test_flat_reference_distinct_from_flat_window() {
        assert_ne!(AnalysisError::FlatReference, AnalysisError::FlatWindow);
    }

    #[test]
    fn test_data_error_wraps_analysis_error() {
        let err: DataError = AnalysisError::FlatWindow.into();
        assert!(matches!(err, DataError::Invalid(AnalysisError::FlatWindow)));
        assert_eq!(err.to_string(), "window has no close-price variance");
    }
}
