//! SubRip captions rendering
//!
//! ```text
//! 1
//! 00:00:00,000 --> 00:00:01,500
//! Hello there
//!
//! ```

use std::fmt::Write;
use ytx_core::TranscriptSegment;

/// Format seconds as `HH:MM:SS,mmm`
///
/// Negative and non-finite inputs are clamped to zero.
#[must_use]
pub fn format_srt_timestamp(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Render segments as an SRT document with 1-based counters
#[must_use]
pub fn render_srt(segments: &[TranscriptSegment]) -> String {
    let mut out = String::new();
    for (idx, segment) in segments.iter().enumerate() {
        // Writing into a String cannot fail
        let _ = writeln!(
            out,
            "{}\n{} --> {}\n{}\n",
            idx + 1,
            format_srt_timestamp(segment.start),
            format_srt_timestamp(segment.end),
            segment.text.trim()
        );
    }
    out
}
