//! Speaker assignment and contiguous-span merging.
//!
//! Each transcribed segment goes to the diarized span with the greatest
//! temporal overlap; adjacent same-speaker segments then collapse into
//! single transcript lines.

use tablescribe_types::{SpeakerSpan, TimedSegment};

/// Overlap between a transcribed segment and a speaker span, in milliseconds.
pub fn overlap_ms(segment: &TimedSegment, span: &SpeakerSpan) -> u64 {
    let span_start = (span.start_secs * 1000.0).round() as u64;
    let span_end = (span.end_secs * 1000.0).round() as u64;
    segment
        .end_ms
        .min(span_end)
        .saturating_sub(segment.start_ms.max(span_start))
}

/// Assign each segment to the span with the greatest overlap.
///
/// Segments overlapping no span keep `speaker: None`; the assembler renders
/// those as Unknown.
pub fn assign_speakers(segments: &mut [TimedSegment], spans: &[SpeakerSpan]) {
    for segment in segments.iter_mut() {
        let mut best: Option<(&SpeakerSpan, u64)> = None;
        for span in spans {
            let overlap = overlap_ms(segment, span);
            if overlap > 0 && best.map(|(_, b)| overlap > b).unwrap_or(true) {
                best = Some((span, overlap));
            }
        }
        segment.speaker = best.map(|(span, _)| span.speaker.clone());
    }
}

/// Collapse adjacent segments with the same speaker into one segment.
///
/// Input must already be ordered by `start_ms`.
pub fn merge_contiguous(segments: Vec<TimedSegment>) -> Vec<TimedSegment> {
    let mut merged: Vec<TimedSegment> = Vec::with_capacity(segments.len());

    for segment in segments {
        match merged.last_mut() {
            Some(prev) if prev.speaker == segment.speaker => {
                prev.end_ms = prev.end_ms.max(segment.end_ms);
                if !segment.text.is_empty() {
                    if !prev.text.is_empty() {
                        prev.text.push(' ');
                    }
                    prev.text.push_str(segment.text.trim());
                }
                prev.words.extend(segment.words);
            }
            _ => merged.push(segment),
        }
    }

    merged
}

/// Combined alignment step used by the word-level pipeline.
pub struct SpeakerAligner;

impl SpeakerAligner {
    /// Assign speakers by greatest overlap, then merge contiguous
    /// same-speaker runs. `segments` must be ordered by `start_ms`.
    pub fn align(mut segments: Vec<TimedSegment>, spans: &[SpeakerSpan]) -> Vec<TimedSegment> {
        assign_speakers(&mut segments, spans);
        merge_contiguous(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_segment(start_ms: u64, end_ms: u64, text: &str) -> TimedSegment {
        TimedSegment {
            start_ms,
            end_ms,
            text: text.to_string(),
            speaker: None,
            words: Vec::new(),
        }
    }

    fn make_span(speaker: &str, start_secs: f64, end_secs: f64) -> SpeakerSpan {
        SpeakerSpan {
            speaker: speaker.to_string(),
            start_secs,
            end_secs,
        }
    }

    #[test]
    fn overlap_is_clamped_to_the_intersection() {
        let segment = make_segment(1000, 3000, "x");
        assert_eq!(overlap_ms(&segment, &make_span("A", 0.0, 2.0)), 1000);
        assert_eq!(overlap_ms(&segment, &make_span("A", 1.5, 10.0)), 1500);
        assert_eq!(overlap_ms(&segment, &make_span("A", 5.0, 6.0)), 0);
    }

    #[test]
    fn greatest_overlap_wins() {
        // Segment 1.0-3.0s: 0.5s inside A, 1.5s inside B
        let mut segments = vec![make_segment(1000, 3000, "hello")];
        let spans = vec![make_span("A", 0.0, 1.5), make_span("B", 1.5, 4.0)];

        assign_speakers(&mut segments, &spans);
        assert_eq!(segments[0].speaker.as_deref(), Some("B"));
    }

    #[test]
    fn no_overlap_leaves_speaker_unset() {
        let mut segments = vec![make_segment(10_000, 11_000, "late")];
        let spans = vec![make_span("A", 0.0, 5.0)];

        assign_speakers(&mut segments, &spans);
        assert_eq!(segments[0].speaker, None);
    }

    #[test]
    fn contiguous_same_speaker_segments_merge() {
        let mut segments = vec![
            make_segment(0, 1000, "we head"),
            make_segment(1000, 2000, "into the crypt"),
            make_segment(2000, 3000, "roll initiative"),
            make_segment(3000, 4000, "I draw my sword"),
        ];
        let spans = vec![
            make_span("Alice", 0.0, 2.0),
            make_span("GM", 2.0, 3.0),
            make_span("Alice", 3.0, 4.0),
        ];

        assign_speakers(&mut segments, &spans);
        let merged = merge_contiguous(segments);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].text, "we head into the crypt");
        assert_eq!(merged[0].speaker.as_deref(), Some("Alice"));
        assert_eq!(merged[0].end_ms, 2000);
        assert_eq!(merged[1].speaker.as_deref(), Some("GM"));
        assert_eq!(merged[2].speaker.as_deref(), Some("Alice"));
    }

    #[test]
    fn merge_keeps_word_timestamps() {
        let mut first = make_segment(0, 500, "a");
        first.speaker = Some("A".into());
        first.words = vec![tablescribe_types::WordSpan {
            start_ms: 0,
            end_ms: 500,
            text: "a".into(),
        }];
        let mut second = make_segment(500, 1000, "b");
        second.speaker = Some("A".into());
        second.words = vec![tablescribe_types::WordSpan {
            start_ms: 500,
            end_ms: 1000,
            text: "b".into(),
        }];

        let merged = merge_contiguous(vec![first, second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].words.len(), 2);
    }

    #[test]
    fn align_is_assignment_then_merge() {
        let segments = vec![make_segment(0, 1000, "one"), make_segment(1000, 2000, "two")];
        let spans = vec![make_span("A", 0.0, 2.0)];

        let lines = SpeakerAligner::align(segments, &spans);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "one two");
    }
}
