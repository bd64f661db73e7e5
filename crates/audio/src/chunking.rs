//! Overlapping time windows over an audio timeline
//!
//! Windows start at `i * (window - overlap)` and the last one is clamped to
//! the total duration, so consecutive windows share exactly `overlap`
//! seconds except where the final window was shortened.

use crate::{Error, Result};

/// Relative slack, in steps, absorbed when counting windows
const WINDOW_EPSILON: f64 = 1e-9;

/// A time window in seconds with `end > start`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chunk {
    /// Window start in seconds
    pub start: f64,
    /// Window end in seconds
    pub end: f64,
}

impl Chunk {
    /// Window length in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Split `[0, total_duration]` into windows of `window_seconds` overlapping by `overlap_seconds`
///
/// # Errors
///
/// Returns [`Error::InvalidChunking`] for non-finite or non-positive
/// durations, a negative overlap, or an overlap not smaller than the window.
pub fn compute_chunks(
    total_duration: f64,
    window_seconds: f64,
    overlap_seconds: f64,
) -> Result<Vec<Chunk>> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(Error::invalid_chunking(format!(
            "total duration must be positive, got {total_duration}"
        )));
    }
    if !window_seconds.is_finite() || window_seconds <= 0.0 {
        return Err(Error::invalid_chunking(format!(
            "window must be positive, got {window_seconds}"
        )));
    }
    if !overlap_seconds.is_finite() || overlap_seconds < 0.0 {
        return Err(Error::invalid_chunking(format!(
            "overlap must be non-negative, got {overlap_seconds}"
        )));
    }
    if overlap_seconds >= window_seconds {
        return Err(Error::invalid_chunking(format!(
            "overlap {overlap_seconds} must be smaller than window {window_seconds}"
        )));
    }

    if total_duration <= window_seconds {
        return Ok(vec![Chunk {
            start: 0.0,
            end: total_duration,
        }]);
    }

    let step = window_seconds - overlap_seconds;
    // Counted up front: the last window starts before `total - overlap`
    let count = ((total_duration - window_seconds) / step - WINDOW_EPSILON).ceil() as usize + 1;
    let chunks: Vec<Chunk> = (0..count)
        .map(|index| {
            let start = index as f64 * step;
            let end = if index + 1 == count {
                total_duration
            } else {
                (start + window_seconds).min(total_duration)
            };
            Chunk { start, end }
        })
        .collect();

    tracing::trace!(
        total_duration,
        window_seconds,
        overlap_seconds,
        chunks = chunks.len(),
        "Computed chunk windows"
    );
    Ok(chunks)
}
