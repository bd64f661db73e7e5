//! Best-effort progress reporting
//!
//! Progress callbacks are infallible from the pipeline's point of view: a
//! panicking sink is caught and the panic discarded, so reporting can never
//! abort a transcription.
//!
//! A retry of the whole job (the fallback engine) reports through
//! [`ProgressReporter::remaining`], which maps its `[0, 1]` onto whatever is
//! left of the parent range.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type Sink = Arc<dyn Fn(f64) + Send + Sync>;

/// Reports a fraction in `[0, 1]` that never decreases
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Option<Sink>,
    last: Arc<AtomicU64>,
    base: f64,
    span: f64,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self {
            sink: None,
            last: Arc::new(AtomicU64::new(0f64.to_bits())),
            base: 0.0,
            span: 1.0,
        }
    }
}

impl ProgressReporter {
    /// Forward progress to `sink`
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        Self {
            sink: Some(Arc::new(sink)),
            ..Self::default()
        }
    }

    /// Discard all progress
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Highest fraction reported so far
    #[must_use]
    pub fn current(&self) -> f64 {
        f64::from_bits(self.last.load(Ordering::Relaxed))
    }

    /// Reporter for a follow-up run covering what is left above the
    /// current value
    ///
    /// Both share the sink and the high-water mark; the follow-up's `0.5` is
    /// halfway between the current value and `1.0`.
    #[must_use]
    pub fn remaining(&self) -> Self {
        let base = self.current();
        Self {
            sink: self.sink.clone(),
            last: Arc::clone(&self.last),
            base,
            span: 1.0 - base,
        }
    }

    /// Report `fraction`; lower values than already reported are raised
    pub fn report(&self, fraction: f64) {
        // Bit-wise max is only numeric for non-negative floats, so no -0.0 or NaN
        let fraction = if fraction.is_nan() || fraction <= 0.0 {
            0.0
        } else {
            (self.base + fraction.min(1.0) * self.span).min(1.0)
        };
        let previous = f64::from_bits(
            self.last
                .fetch_max(fraction.to_bits(), Ordering::Relaxed),
        );
        let value = previous.max(fraction);

        let Some(sink) = &self.sink else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| sink(value))).is_err() {
            tracing::debug!(progress = value, "Progress callback panicked; ignoring");
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_sink", &self.sink.is_some())
            .field("current", &self.current())
            .finish()
    }
}
