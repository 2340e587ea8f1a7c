use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the caller and a running
/// search. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The search stops at its next candidate.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can drive another run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Relaxed);
    }
}

/// Progress update emitted while scanning candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchProgress {
    /// Candidate windows visited so far.
    pub processed: usize,
    /// Candidate windows the scan will visit in total.
    pub total: usize,
}

/// Cancellation and progress hooks for one search call.
pub struct SearchControl<'a> {
    pub cancel: CancelToken,
    pub on_progress: Option<&'a (dyn Fn(SearchProgress) + Sync)>,
    /// Report progress every this many candidates.
    pub progress_every: usize,
}

impl Default for SearchControl<'_> {
    fn default() -> Self {
        Self {
            cancel: CancelToken::new(),
            on_progress: None,
            progress_every: 50,
        }
    }
}

impl<'a> SearchControl<'a> {
    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, callback: &'a (dyn Fn(SearchProgress) + Sync)) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub(crate) fn report(&self, processed: usize, total: usize) {
        if let Some(cb) = self.on_progress {
            let every = self.progress_every.max(1);
            if processed % every == 0 || processed == total {
                cb(SearchProgress { processed, total });
            }
        }
    }
}
