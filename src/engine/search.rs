use super::control::SearchControl;
use super::strategy::{ContextScorer, PatternMatcher, SearchRequest};
use crate::domain::*;
use crate::error::{AnalysisError, Result};
use crate::evaluation::{similarity, top_k_summary_by, TopKSummary};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

/// A historical window whose shape resembles the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub window: Window,
    pub similarity_score: f64,
    /// First-to-last move of the un-normalized closes, in percent.
    pub price_change_pct: f64,
}

/// Sliding-window correlation search.
///
/// Candidate windows have the reference's length and start every `stride`
/// observations across the candidate domain (the series, restricted by the
/// optional constraint, minus every exclusion range). A candidate becomes a
/// match when its normalized trajectory correlates with the reference's at
/// or above `precision`.
pub struct PatternSearchEngine {
    params: SearchParams,
    context: Option<Box<dyn ContextScorer>>,
}

impl PatternSearchEngine {
    pub fn new(params: SearchParams) -> Self {
        Self {
            params,
            context: None,
        }
    }

    /// Install a secondary scorer applied to every defined base score.
    pub fn with_context_scorer(mut self, scorer: Box<dyn ContextScorer>) -> Self {
        self.context = Some(scorer);
        self
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn run(
        &self,
        series: &TimeSeries,
        request: &SearchRequest<'_>,
        control: &SearchControl<'_>,
    ) -> Result<Vec<Match>> {
        self.params.validate()?;
        for exclusion in request.exclusions {
            exclusion.validate()?;
        }
        if let Some(constraint) = request.constraint {
            constraint.validate()?;
        }

        let reference = request.reference;
        if reference.is_empty() {
            return Err(AnalysisError::no_data(format!(
                "reference window {} to {} has no observations",
                reference.start, reference.end
            )));
        }
        let reference_shape =
            normalize(&reference.closes()).map_err(|_| AnalysisError::FlatReference)?;
        let len = reference_shape.len();

        let domain = candidate_domain(series, request.exclusions, request.constraint);
        if domain.is_empty() {
            return Err(AnalysisError::no_data(
                "no observations left after applying search constraint and exclusions",
            ));
        }
        if domain.len() < len {
            debug!(
                domain = domain.len(),
                window = len,
                "candidate domain shorter than reference window"
            );
            return Ok(Vec::new());
        }

        let last_start = domain.len() - len;
        let total = last_start / self.params.stride + 1;
        debug!(
            symbol = series.symbol(),
            domain = domain.len(),
            window = len,
            stride = self.params.stride,
            candidates = total,
            "scanning candidate windows"
        );

        let observations = series.observations();
        let reference_first = reference.observations[0].timestamp;
        let reference_last = reference.observations[len - 1].timestamp;
        let mut matches = Vec::new();

        for (visited, start) in (0..=last_start).step_by(self.params.stride).enumerate() {
            if control.cancel.is_cancelled() {
                info!(visited, total, "pattern search cancelled");
                return Err(AnalysisError::Cancelled);
            }
            control.report(visited + 1, total);

            let first_idx = domain[start];
            let last_idx = domain[start + len - 1];
            let candidate = &observations[first_idx..=last_idx];
            let cand_start = candidate[0].timestamp;
            let cand_end = candidate[candidate.len() - 1].timestamp;

            if candidate.len() != len {
                // Spans observations removed from the domain.
                continue;
            }
            if request
                .exclusions
                .iter()
                .any(|e| e.overlaps(cand_start, cand_end))
            {
                continue;
            }
            if cand_start == reference_first && cand_end == reference_last {
                continue;
            }
            if (cand_start - reference.start).num_days().abs() < self.params.anti_overlap_days {
                continue;
            }
            if is_flat(candidate) {
                continue;
            }

            let closes: Vec<f64> = candidate.iter().map(|o| o.close).collect();
            let shape = match normalize(&closes) {
                Ok(shape) => shape,
                Err(_) => continue,
            };
            let base = match similarity(&reference_shape, &shape) {
                Some(score) => score,
                None => continue,
            };
            let score = match &self.context {
                Some(scorer) => scorer.adjust(&reference.observations, candidate, base),
                None => base,
            };
            if score.is_nan() || score < self.params.precision {
                continue;
            }
            let (Some(price_change_pct), Some(window)) =
                (price_change_pct(candidate), Window::from_slice(candidate))
            else {
                continue;
            };
            matches.push(Match {
                window,
                similarity_score: score,
                price_change_pct,
            });
        }

        sort_matches(&mut matches);
        info!(
            symbol = series.symbol(),
            matches = matches.len(),
            precision = self.params.precision,
            "pattern search complete"
        );
        Ok(matches)
    }
}

impl PatternMatcher for PatternSearchEngine {
    fn find_matches(
        &self,
        series: &TimeSeries,
        request: &SearchRequest<'_>,
        control: &SearchControl<'_>,
    ) -> Result<Vec<Match>> {
        self.run(series, request, control)
    }
}

/// Search `series` for windows shaped like `reference`.
///
/// Returns matches best first; equal scores are ordered by earliest start.
pub fn search(
    series: &TimeSeries,
    reference: &Window,
    params: &SearchParams,
    exclusions: &[ExclusionRange],
    constraint: Option<&SearchConstraint>,
) -> Result<Vec<Match>> {
    search_with_control(
        series,
        reference,
        params,
        exclusions,
        constraint,
        &SearchControl::default(),
    )
}

/// Same as [`search`], with cancellation and progress hooks.
pub fn search_with_control(
    series: &TimeSeries,
    reference: &Window,
    params: &SearchParams,
    exclusions: &[ExclusionRange],
    constraint: Option<&SearchConstraint>,
    control: &SearchControl<'_>,
) -> Result<Vec<Match>> {
    let mut request = SearchRequest::new(reference).with_exclusions(exclusions);
    if let Some(c) = constraint {
        request = request.with_constraint(c);
    }
    PatternSearchEngine::new(params.clone()).run(series, &request, control)
}

/// Price-change statistics over the `k` most similar matches.
pub fn summarize_matches(matches: &[Match], k: usize) -> Result<TopKSummary> {
    top_k_summary_by(matches, k, |m| m.similarity_score, |m| m.price_change_pct)
}

/// Series indices admitted by the constraint and outside every exclusion.
fn candidate_domain(
    series: &TimeSeries,
    exclusions: &[ExclusionRange],
    constraint: Option<&SearchConstraint>,
) -> Vec<usize> {
    series
        .observations()
        .iter()
        .enumerate()
        .filter(|(_, o)| constraint.map_or(true, |c| c.admits(o.timestamp)))
        .filter(|(_, o)| !exclusions.iter().any(|e| e.contains(o.timestamp)))
        .map(|(i, _)| i)
        .collect()
}

fn sort_matches(matches: &mut [Match]) {
    matches.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.window.start.cmp(&b.window.start))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::fixtures::{daily_series, day};
    use crate::engine::control::{CancelToken, SearchProgress};
    use rand::{Rng, SeedableRng};
    use std::sync::Mutex;

    fn linear_series() -> TimeSeries {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64 * 100.0 / 99.0).collect();
        daily_series(&closes)
    }

    fn random_walk(n: usize, seed: u64) -> TimeSeries {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut price = 100.0;
        let closes: Vec<f64> = (0..n)
            .map(|_| {
                price *= 1.0 + rng.gen_range(-0.03..0.03);
                price
            })
            .collect();
        daily_series(&closes)
    }

    fn params(precision: f64, stride: usize) -> SearchParams {
        SearchParams {
            precision,
            stride,
            anti_overlap_days: 30,
        }
    }

    #[test]
    fn test_linear_series_matches_its_tail() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let matches = search(&series, &reference, &params(0.99, 1), &[], None).unwrap();

        // Starts 30..=90 survive the anti-overlap rule.
        assert_eq!(matches.len(), 61);
        for m in &matches {
            assert!(m.similarity_score > 0.999);
            assert!(m.window.start >= day(30));
            assert_eq!(m.window.len(), 10);
            assert!(m.price_change_pct > 0.0);
        }
        assert!(matches.iter().any(|m| m.window.start == day(90)));
    }

    #[test]
    fn test_flat_reference_rejected_before_scanning() {
        let series = daily_series(&[50.0; 60]);
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let calls = Mutex::new(0usize);
        let cb = |_: SearchProgress| *calls.lock().unwrap() += 1;
        let mut control = SearchControl::default().with_progress(&cb);
        control.progress_every = 1;

        let result =
            search_with_control(&series, &reference, &params(0.8, 5), &[], None, &control);
        assert_eq!(result, Err(AnalysisError::FlatReference));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_invalid_parameters() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        for p in [params(0.0, 5), params(1.5, 5), params(0.8, 0)] {
            assert!(matches!(
                search(&series, &reference, &p, &[], None),
                Err(AnalysisError::InvalidParameter(_))
            ));
        }
        let reversed = ExclusionRange {
            start_date: day(20),
            end_date: day(10),
            reason: "typo".into(),
        };
        assert!(matches!(
            search(&series, &reference, &params(0.8, 5), &[reversed], None),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_domain_is_no_data() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let constraint = SearchConstraint {
            after: Some(day(500)),
            before: None,
        };
        assert!(matches!(
            search(&series, &reference, &params(0.8, 5), &[], Some(&constraint)),
            Err(AnalysisError::NoData { .. })
        ));
    }

    #[test]
    fn test_empty_reference_is_no_data() {
        let series = linear_series();
        let reference = Window {
            start: day(0),
            end: day(9),
            observations: Vec::new(),
        };
        assert!(matches!(
            search(&series, &reference, &params(0.8, 5), &[], None),
            Err(AnalysisError::NoData { .. })
        ));
    }

    #[test]
    fn test_domain_shorter_than_reference_matches_nothing() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(49)).unwrap().unwrap();
        let constraint = SearchConstraint {
            after: Some(day(80)),
            before: None,
        };
        let matches = search(&series, &reference, &params(0.8, 1), &[], Some(&constraint)).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn test_exclusions_respected() {
        let series = random_walk(600, 7);
        let reference = extract(&series, day(100), day(119)).unwrap().unwrap();
        let exclusions = vec![
            ExclusionRange::new(day(200), day(260), "crash").unwrap(),
            ExclusionRange::new(day(400), day(401), "halt").unwrap(),
        ];
        let matches = search(&series, &reference, &params(0.3, 1), &exclusions, None).unwrap();
        assert!(!matches.is_empty());
        for m in &matches {
            for ex in &exclusions {
                assert!(
                    !ex.overlaps(m.window.start, m.window.end),
                    "match {}..{} overlaps exclusion {}",
                    m.window.start,
                    m.window.end,
                    ex.reason
                );
            }
        }
    }

    #[test]
    fn test_anti_overlap_respected() {
        let series = random_walk(400, 11);
        let reference = extract(&series, day(150), day(164)).unwrap().unwrap();
        let p = SearchParams {
            precision: 0.2,
            stride: 1,
            anti_overlap_days: 45,
        };
        let matches = search(&series, &reference, &p, &[], None).unwrap();
        assert!(!matches.is_empty());
        for m in &matches {
            assert!((m.window.start - reference.start).num_days().abs() >= 45);
        }
    }

    #[test]
    fn test_constraint_bounds_matches() {
        let series = random_walk(500, 3);
        let reference = extract(&series, day(10), day(29)).unwrap().unwrap();
        let constraint = SearchConstraint {
            after: Some(day(200)),
            before: Some(day(350)),
        };
        let matches =
            search(&series, &reference, &params(0.2, 1), &[], Some(&constraint)).unwrap();
        assert!(!matches.is_empty());
        for m in &matches {
            assert!(m.window.start >= day(200));
            assert!(m.window.end <= day(350));
        }
    }

    #[test]
    fn test_threshold_monotonicity() {
        let series = random_walk(800, 42);
        let reference = extract(&series, day(300), day(319)).unwrap().unwrap();
        let mut last = usize::MAX;
        for p in [0.1, 0.3, 0.5, 0.7, 0.9, 0.99] {
            let n = search(&series, &reference, &params(p, 2), &[], None)
                .unwrap()
                .len();
            assert!(n <= last, "precision {} returned {} > {}", p, n, last);
            last = n;
        }
    }

    #[test]
    fn test_idempotent_and_sorted() {
        let series = random_walk(500, 99);
        let reference = extract(&series, day(40), day(59)).unwrap().unwrap();
        let p = params(0.4, 3);
        let first = search(&series, &reference, &p, &[], None).unwrap();
        let second = search(&series, &reference, &p, &[], None).unwrap();
        assert_eq!(first, second);
        for pair in first.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
            if pair[0].similarity_score == pair[1].similarity_score {
                assert!(pair[0].window.start < pair[1].window.start);
            }
        }
    }

    #[test]
    fn test_equal_scores_ordered_by_start() {
        // Period-5 sawtooth: every candidate aligned with the reference has
        // exactly the same closes, hence exactly the same score.
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + (i % 5) as f64).collect();
        let series = daily_series(&closes);
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let matches = search(&series, &reference, &params(0.99, 1), &[], None).unwrap();

        let starts: Vec<i64> = matches
            .iter()
            .map(|m| (m.window.start - day(0)).num_days())
            .collect();
        assert_eq!(starts, (30..=90).step_by(5).collect::<Vec<i64>>());
        let first = matches[0].similarity_score;
        assert!(matches.iter().all(|m| m.similarity_score == first));
    }

    #[test]
    fn test_sort_matches_breaks_ties_by_start() {
        let series = linear_series();
        let at = |start: i64, score: f64| Match {
            window: extract(&series, day(start), day(start + 4)).unwrap().unwrap(),
            similarity_score: score,
            price_change_pct: 1.0,
        };
        let mut matches = vec![at(60, 0.9), at(40, 0.95), at(50, 0.9), at(10, 0.9), at(20, 0.95)];
        sort_matches(&mut matches);
        let order: Vec<(i64, f64)> = matches
            .iter()
            .map(|m| ((m.window.start - day(0)).num_days(), m.similarity_score))
            .collect();
        assert_eq!(
            order,
            vec![(20, 0.95), (40, 0.95), (10, 0.9), (50, 0.9), (60, 0.9)]
        );
    }

    #[test]
    fn test_stride_limits_candidates() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let matches = search(&series, &reference, &params(0.99, 5), &[], None).unwrap();
        // Starts 0,5,..,90; those at 30..=90 pass the anti-overlap rule.
        assert_eq!(matches.len(), 13);
        assert!(matches
            .iter()
            .all(|m| (m.window.start - day(0)).num_days() % 5 == 0));
    }

    #[test]
    fn test_cancel_before_start() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let token = CancelToken::new();
        token.cancel();
        let control = SearchControl::with_cancel(token);
        let result =
            search_with_control(&series, &reference, &params(0.8, 1), &[], None, &control);
        assert_eq!(result, Err(AnalysisError::Cancelled));
    }

    #[test]
    fn test_cancel_mid_scan() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let token = CancelToken::new();
        let trigger = token.clone();
        let seen = Mutex::new(Vec::new());
        let cb = move |p: SearchProgress| {
            seen.lock().unwrap().push(p.processed);
            if p.processed == 3 {
                trigger.cancel();
            }
        };
        let mut control = SearchControl::with_cancel(token).with_progress(&cb);
        control.progress_every = 1;
        let result =
            search_with_control(&series, &reference, &params(0.8, 1), &[], None, &control);
        assert_eq!(result, Err(AnalysisError::Cancelled));
    }

    #[test]
    fn test_progress_reports_total() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let last = Mutex::new(None);
        let cb = |p: SearchProgress| *last.lock().unwrap() = Some(p);
        let control = SearchControl::default().with_progress(&cb);
        search_with_control(&series, &reference, &params(0.8, 5), &[], None, &control).unwrap();
        assert_eq!(
            *last.lock().unwrap(),
            Some(SearchProgress {
                processed: 19,
                total: 19
            })
        );
    }

    struct Halve;

    impl ContextScorer for Halve {
        fn adjust(&self, _: &[Observation], _: &[Observation], base: f64) -> f64 {
            base * 0.5
        }
    }

    #[test]
    fn test_context_scorer_applies_before_threshold() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let request = SearchRequest::new(&reference);
        let engine = PatternSearchEngine::new(params(0.9, 1)).with_context_scorer(Box::new(Halve));
        let matches = engine
            .find_matches(&series, &request, &SearchControl::default())
            .unwrap();
        assert!(matches.is_empty());

        let engine = PatternSearchEngine::new(params(0.4, 1)).with_context_scorer(Box::new(Halve));
        let matches = engine
            .find_matches(&series, &request, &SearchControl::default())
            .unwrap();
        assert_eq!(matches.len(), 61);
        assert!(matches.iter().all(|m| (m.similarity_score - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_summarize_matches() {
        let series = linear_series();
        let reference = extract(&series, day(0), day(9)).unwrap().unwrap();
        let matches = search(&series, &reference, &params(0.99, 1), &[], None).unwrap();
        let summary = summarize_matches(&matches, 10).unwrap();
        assert_eq!(summary.count, 10);
        assert!(summary.min > 0.0);
        assert!(summary.max >= summary.median);
        assert!(summarize_matches(&[], 10).is_err());
    }
}
