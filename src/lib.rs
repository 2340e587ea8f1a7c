//! Event impact analysis and historical pattern search over price series.
//!
//! The core is synchronous and I/O free: callers hand in a [`TimeSeries`]
//! and plain parameters and get back plain reports. Loading series from
//! disk lives in [`data`] and is only used by hosts such as the CLI.

pub mod analysis;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluation;

pub use analysis::{
    analyze_event_impact, analyze_impact, analyze_sentiment, compare_events, event_price,
    reference_window_for_event, Horizon, ImpactReport, Level, Reaction, Sentiment,
    SentimentReport,
};
pub use domain::{
    extract, normalize, AnalysisConfig, Direction, Event, ExclusionRange, Observation,
    SearchConstraint, SearchParams, SentimentParams, TimeSeries, Window,
};
pub use engine::{
    search, search_with_control, summarize_matches, CancelToken, ContextScorer, Match,
    PatternMatcher, PatternSearchEngine, SearchControl, SearchProgress, SearchRequest,
};
pub use error::{AnalysisError, DataError, Result};
pub use evaluation::{similarity, top_k_summary, top_k_summary_by, PatternOutlook, TopKSummary};
