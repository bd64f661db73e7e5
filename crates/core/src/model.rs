//! Transcript data model
//!
//! Segments, transcript documents with optional chapters and summary, and the
//! source metadata handed over by the media source. Every type here is plain data with validation helpers; the
//! invariants are checked when a document is read back from the cache.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Slack allowed when comparing adjacent segment boundaries.
pub const ORDER_TOLERANCE: f64 = 1e-6;

/// A single timed piece of transcript text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptSegment {
    /// Position of the segment in its document (dense, starting at 0)
    pub id: u32,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds, strictly greater than `start`
    pub end: f64,
    /// Transcribed text, never blank
    pub text: String,
    /// Provider confidence in `[0, 1]`, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TranscriptSegment {
    /// Create a validated segment. Surrounding whitespace is trimmed from `text`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the timing or text invariants do not hold.
    pub fn new(id: u32, start: f64, end: f64, text: impl Into<String>) -> Result<Self> {
        let segment = Self {
            id,
            start,
            end,
            text: text.into().trim().to_string(),
            confidence: None,
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Attach a confidence score
    #[must_use]
    pub fn with_confidence(mut self, confidence: Option<f64>) -> Self {
        self.confidence = confidence;
        self
    }

    /// Length of the segment in seconds
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Check the per-segment invariants
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(Error::validation(format!(
                "segment {} has non-finite bounds",
                self.id
            )));
        }
        if self.start < 0.0 {
            return Err(Error::validation(format!(
                "segment {} starts before 0 ({})",
                self.id, self.start
            )));
        }
        if self.end <= self.start {
            return Err(Error::validation(format!(
                "segment {} ends at {} which is not after its start {}",
                self.id, self.end, self.start
            )));
        }
        if self.text.trim().is_empty() {
            return Err(Error::validation(format!(
                "segment {} has empty text",
                self.id
            )));
        }
        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(Error::validation(format!(
                    "segment {} confidence {c} outside [0, 1]",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Check that a segment sequence is ordered and non-overlapping
///
/// # Errors
///
/// Returns a validation error for the first invalid segment or boundary.
pub fn validate_timeline(segments: &[TranscriptSegment]) -> Result<()> {
    for (idx, seg) in segments.iter().enumerate() {
        seg.validate()?;
        if idx == 0 {
            continue;
        }
        let prev = &segments[idx - 1];
        if seg.id <= prev.id {
            return Err(Error::validation(format!(
                "segment ids out of order: {} follows {}",
                seg.id, prev.id
            )));
        }
        if seg.start + ORDER_TOLERANCE < prev.end {
            return Err(Error::validation(format!(
                "segment {} starts at {} before previous end {}",
                seg.id, seg.start, prev.end
            )));
        }
    }
    Ok(())
}

/// A titled section of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chapter {
    /// Chapter title, if the source named it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds, strictly greater than `start`
    pub end: f64,
}

impl Chapter {
    /// Check that the chapter spans a positive, non-negative range
    ///
    /// # Errors
    ///
    /// Returns a validation error for non-finite, negative or empty ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 {
            return Err(Error::validation(format!(
                "chapter has invalid start {}",
                self.start
            )));
        }
        if self.end <= self.start {
            return Err(Error::validation(format!(
                "chapter ends at {} which is not after its start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }
}

/// Short summary of a transcript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Summary {
    /// One-paragraph summary
    pub tldr: String,
    /// Key points
    #[serde(default)]
    pub bullets: Vec<String>,
}

/// Source information about a video, as reported by the media source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Stable video identifier (e.g. the YouTube id)
    pub id: String,
    /// Human readable title
    pub title: String,
    /// Duration in seconds, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Canonical URL of the video
    pub url: String,
    /// Channel or uploader name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
    /// Chapters published with the video
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chapters: Vec<Chapter>,
}

/// A complete transcript as persisted in `transcript.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscriptDoc {
    /// Video identifier
    pub video_id: String,
    /// URL the audio was taken from
    pub source_url: String,
    /// Video title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Audio duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Spoken language code, if known or detected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Engine that produced the segments
    pub engine: String,
    /// Model that produced the segments
    pub model: String,
    /// Ordered transcript segments
    pub segments: Vec<TranscriptSegment>,
    /// Chapters of the video, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
    /// Summary of the transcript, when one was produced
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

impl TranscriptDoc {
    /// Structural validation used when reading a document back from disk
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.video_id.trim().is_empty() {
            return Err(Error::validation("transcript has an empty video_id"));
        }
        if self.engine.trim().is_empty() || self.model.trim().is_empty() {
            return Err(Error::validation("transcript has an empty engine or model"));
        }
        if let Some(d) = self.duration {
            if !d.is_finite() || d < 0.0 {
                return Err(Error::validation(format!("invalid duration {d}")));
            }
        }
        for chapter in self.chapters.iter().flatten() {
            chapter.validate()?;
        }
        validate_timeline(&self.segments)
    }

    /// Concatenated text of all segments
    #[must_use]
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
