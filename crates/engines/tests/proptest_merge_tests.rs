//! Property-based tests for merging chunk transcripts.
//!
//! - Ordering: merged starts never decrease and never precede the previous end
//! - Length: every merged segment has `end > start`, zero-length input included
//! - Text: no non-blank segment is lost, ids are dense

use proptest::prelude::*;
use ytx_core::{TranscriptSegment, validate_timeline};
use ytx_engines::{RawSegment, merge, repair_segments};

// =============================================================================
// Strategies
// =============================================================================

fn segment_strategy() -> impl Strategy<Value = TranscriptSegment> {
    (0.0f64..600.0, 0.0f64..30.0, "[a-z]{1,8}").prop_map(|(start, len, text)| TranscriptSegment {
        id: 0,
        start,
        // A third of the time the provider returns a zero-length segment
        end: if len < 10.0 { start } else { start + len },
        text,
        confidence: None,
    })
}

fn chunk_strategy() -> impl Strategy<Value = Vec<(f64, Vec<TranscriptSegment>)>> {
    prop::collection::vec(prop::collection::vec(segment_strategy(), 0..8), 1..6).prop_map(
        |chunks| {
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, segments)| (i as f64 * 598.0, segments))
                .collect()
        },
    )
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Contract: merged output always satisfies the transcript timeline invariant
    #[test]
    fn merged_timeline_is_valid(chunks in chunk_strategy()) {
        let merged = merge(chunks);
        prop_assert!(validate_timeline(&merged).is_ok());
        for pair in merged.windows(2) {
            prop_assert!(pair[1].start >= pair[0].start);
            prop_assert!(pair[1].start >= pair[0].end);
        }
    }

    /// Contract: every segment with text survives, renumbered densely
    #[test]
    fn merged_keeps_all_text(chunks in chunk_strategy()) {
        let expected: Vec<String> = chunks
            .iter()
            .flat_map(|(_, segs)| segs.iter().map(|s| s.text.clone()))
            .collect();
        let merged = merge(chunks);
        let texts: Vec<String> = merged.iter().map(|s| s.text.clone()).collect();
        prop_assert_eq!(texts, expected);
        for (i, seg) in merged.iter().enumerate() {
            prop_assert_eq!(seg.id as usize, i);
            prop_assert!(seg.end > seg.start);
        }
    }

    /// Contract: arbitrary provider timings, including negative and reversed, are repaired
    #[test]
    fn repair_handles_arbitrary_bounds(
        raw in prop::collection::vec((-50.0f64..500.0, -50.0f64..500.0, "[a-z ]{0,6}"), 0..20)
    ) {
        let segments = repair_segments(
            raw.into_iter().map(|(start, end, text)| RawSegment::new(start, end, text)),
        );
        prop_assert!(validate_timeline(&segments).is_ok());
    }
}
