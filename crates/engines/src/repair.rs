//! Segment repair shared by adapters and the chunk merger
//!
//! Providers occasionally return segments that overlap their predecessor,
//! start before zero or have zero length. [`SegmentRepairer`] turns such raw
//! output into a sequence satisfying the transcript invariants:
//!
//! - blank text is dropped, other text is trimmed
//! - `start` is clamped to 0 and pushed forward to the previous `end`
//! - `end <= start` is extended to `start + SEGMENT_EPSILON`
//! - ids are assigned densely in emission order

use ytx_core::TranscriptSegment;

/// Minimal positive length given to degenerate segments, in seconds
pub const SEGMENT_EPSILON: f64 = 0.001;

/// Unvalidated segment as produced by a provider
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    /// Start in seconds
    pub start: f64,
    /// End in seconds
    pub end: f64,
    /// Text as returned
    pub text: String,
    /// Provider confidence, if any
    pub confidence: Option<f64>,
}

impl RawSegment {
    /// Create a raw segment without confidence
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
            confidence: None,
        }
    }

    /// Shift an already repaired segment by `offset` seconds
    #[must_use]
    pub fn offset_from(segment: &TranscriptSegment, offset: f64) -> Self {
        Self {
            start: segment.start + offset,
            end: segment.end + offset,
            text: segment.text.clone(),
            confidence: segment.confidence,
        }
    }
}

/// Incremental repairer keeping the last emitted end and the next id
#[derive(Debug, Clone, Default)]
pub struct SegmentRepairer {
    next_id: u32,
    last_end: f64,
}

impl SegmentRepairer {
    /// Start an empty timeline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// End of the last emitted segment (0 before the first)
    #[must_use]
    pub const fn last_end(&self) -> f64 {
        self.last_end
    }

    /// Repair one raw segment; `None` when it carries no text
    pub fn push(&mut self, raw: RawSegment) -> Option<TranscriptSegment> {
        let text = raw.text.trim();
        if text.is_empty() {
            return None;
        }

        let start = if raw.start.is_finite() {
            raw.start.max(0.0).max(self.last_end)
        } else {
            self.last_end
        };
        let end = if raw.end.is_finite() && raw.end > start {
            raw.end
        } else {
            start + SEGMENT_EPSILON
        };
        let confidence = raw
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));

        let segment = TranscriptSegment {
            id: self.next_id,
            start,
            end,
            text: text.to_string(),
            confidence,
        };
        self.next_id += 1;
        self.last_end = end;
        Some(segment)
    }
}

/// Repair a complete provider response
pub fn repair_segments<I>(raw: I) -> Vec<TranscriptSegment>
where
    I: IntoIterator<Item = RawSegment>,
{
    let mut repairer = SegmentRepairer::new();
    raw.into_iter().filter_map(|r| repairer.push(r)).collect()
}
