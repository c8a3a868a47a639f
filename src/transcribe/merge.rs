//! Stitching per-chunk transcription results into one timeline.
//!
//! Providers return segment times relative to the audio slice they were
//! handed. Each slice after the first starts a little before its chunk's
//! true boundary (the overlap pad), so re-based segments from consecutive
//! chunks can describe the same spoken words twice. The merge re-bases,
//! deduplicates across boundaries, and fuses split boundary segments.

use crate::audio::chunk::ChunkPlan;
use crate::providers::Segment;

/// Tunables for boundary deduplication.
#[derive(Debug, Clone, Copy)]
pub struct MergeParams {
    /// Segments closer than this are considered contiguous and may fuse.
    pub fusion_gap_s: f64,
    /// Token-overlap similarity at which two boundary texts count as
    /// duplicates. The heuristic is inherently approximate.
    pub similarity_threshold: f64,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            fusion_gap_s: 0.25,
            similarity_threshold: 0.8,
        }
    }
}

/// The segments one chunk produced, still in chunk-local time.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub plan: ChunkPlan,
    pub segments: Vec<Segment>,
}

/// Shift chunk-local segment times onto the original timeline.
///
/// The offset is the *padded* slice start, because that is where the audio
/// the provider saw actually begins. Whitespace-only segments are dropped.
pub fn rebase(plan: &ChunkPlan, segments: Vec<Segment>) -> Vec<Segment> {
    let offset = plan.padded.start;
    segments
        .into_iter()
        .filter(|segment| !segment.text.trim().is_empty())
        .map(|segment| Segment {
            start_s: segment.start_s + offset,
            end_s: segment.end_s + offset,
            text: segment.text.trim().to_string(),
        })
        .collect()
}

/// Merge re-based chunk outcomes into a single ordered segment list.
///
/// Guarantees the result's `start_s` values are non-decreasing. A segment
/// from a later chunk that starts strictly before that chunk's true
/// boundary is dropped when its text near-duplicates the tail of the
/// earlier chunk, and otherwise fused with the previous segment when they
/// are contiguous within `fusion_gap_s`.
pub fn merge_chunks(outcomes: Vec<ChunkOutcome>, params: &MergeParams) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::new();

    for outcome in outcomes {
        let boundary = outcome.plan.window.start;
        let first_chunk = outcome.plan.index == 0;
        let rebased = rebase(&outcome.plan, outcome.segments);

        for segment in rebased {
            let in_overlap = !first_chunk && segment.start_s < boundary;

            if in_overlap {
                if is_boundary_duplicate(&merged, &segment, params) {
                    tracing::debug!(
                        "dropping duplicated overlap segment at {:.2}s: {:?}",
                        segment.start_s,
                        segment.text
                    );
                    continue;
                }
                if let Some(last) = merged.last_mut() {
                    if segment.start_s - last.end_s < params.fusion_gap_s {
                        // Split mid-sentence by the cut point: fuse into one cue.
                        last.text.push(' ');
                        last.text.push_str(&segment.text);
                        last.end_s = last.end_s.max(segment.end_s);
                        continue;
                    }
                }
            }

            merged.push(segment);
        }
    }

    merged.sort_by(|a, b| a.start_s.total_cmp(&b.start_s));
    merged
}

/// Join segment texts into the full transcript, single-spaced.
pub fn full_text(segments: &[Segment]) -> String {
    let joined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    collapse_spaces(&joined)
}

/// Does `candidate` repeat what the earlier chunk already said near the
/// boundary? Checks normalized containment first, then token overlap.
fn is_boundary_duplicate(merged: &[Segment], candidate: &Segment, params: &MergeParams) -> bool {
    // Only the last few segments can plausibly cover the overlap region.
    let tail: String = merged
        .iter()
        .rev()
        .take(3)
        .rev()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let tail_norm = normalize(&tail);
    let cand_norm = normalize(&candidate.text);
    if cand_norm.is_empty() || tail_norm.is_empty() {
        return false;
    }

    if tail_norm.contains(&cand_norm) {
        return true;
    }

    // A boundary segment may re-render the tail with slightly different
    // punctuation or word choice; fall back to token-overlap similarity
    // against the closest tail segment.
    merged
        .iter()
        .rev()
        .take(3)
        .any(|prev| token_similarity(&normalize(&prev.text), &cand_norm) >= params.similarity_threshold)
}

fn normalize(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_spaces(&lowered)
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dice coefficient over word tokens.
fn token_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let set_a: std::collections::HashSet<&str> = tokens_a.iter().copied().collect();
    let common = tokens_b.iter().filter(|t| set_a.contains(**t)).count();
    (2.0 * common as f64) / (tokens_a.len() + tokens_b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TimeRange;

    fn plan(index: usize, window: (f64, f64), padded: (f64, f64)) -> ChunkPlan {
        ChunkPlan {
            index,
            window: TimeRange::new(window.0, window.1).unwrap(),
            padded: TimeRange::new(padded.0, padded.1).unwrap(),
        }
    }

    #[test]
    fn rebase_adds_padded_offset_and_drops_blank_segments() {
        let plan = plan(1, (855.0, 1200.0), (853.0, 1200.0));
        let rebased = rebase(
            &plan,
            vec![
                Segment::new(0.0, 4.0, " carried over words "),
                Segment::new(4.0, 5.0, "   "),
                Segment::new(5.0, 9.0, "new material"),
            ],
        );

        assert_eq!(rebased.len(), 2);
        assert_eq!(rebased[0].start_s, 853.0);
        assert_eq!(rebased[0].end_s, 857.0);
        assert_eq!(rebased[0].text, "carried over words");
        assert_eq!(rebased[1].start_s, 858.0);
    }

    #[test]
    fn single_chunk_passes_through_untouched() {
        let outcome = ChunkOutcome {
            plan: plan(0, (0.0, 100.0), (0.0, 100.0)),
            segments: vec![
                Segment::new(0.0, 5.0, "hello there"),
                Segment::new(5.0, 9.0, "general remarks"),
            ],
        };
        let merged = merge_chunks(vec![outcome], &MergeParams::default());
        assert_eq!(merged.len(), 2);
        assert_eq!(full_text(&merged), "hello there general remarks");
    }

    #[test]
    fn true_duplicate_in_overlap_is_dropped() {
        let first = ChunkOutcome {
            plan: plan(0, (0.0, 855.0), (0.0, 855.0)),
            segments: vec![
                Segment::new(848.0, 852.0, "and that concludes the introduction"),
                Segment::new(852.0, 855.0, "let us move on"),
            ],
        };
        // The second slice starts at 853, so its first segment re-hears
        // "let us move on" before the true boundary at 855.
        let second = ChunkOutcome {
            plan: plan(1, (855.0, 1200.0), (853.0, 1200.0)),
            segments: vec![
                Segment::new(0.0, 1.8, "let us move on."),
                Segment::new(2.0, 6.0, "the next topic is chunking"),
            ],
        };

        let merged = merge_chunks(vec![first, second], &MergeParams::default());
        let text = full_text(&merged);
        assert_eq!(
            text,
            "and that concludes the introduction let us move on the next topic is chunking"
        );
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn legitimately_repeated_phrase_survives() {
        // Speaker genuinely says "thank you" twice around the cut point,
        // with unrelated tail text, so nothing should be dropped.
        let first = ChunkOutcome {
            plan: plan(0, (0.0, 855.0), (0.0, 855.0)),
            segments: vec![Segment::new(
                846.0,
                853.0,
                "the committee approved every motion on the agenda",
            )],
        };
        let second = ChunkOutcome {
            plan: plan(1, (855.0, 1200.0), (853.0, 1200.0)),
            segments: vec![
                Segment::new(0.5, 1.9, "thank you"),
                Segment::new(2.5, 3.6, "thank you"),
                Segment::new(4.0, 9.0, "we now begin the question period"),
            ],
        };

        let merged = merge_chunks(vec![first, second], &MergeParams::default());
        let text = full_text(&merged);
        assert!(text.contains("thank you thank you"));
    }

    #[test]
    fn contiguous_boundary_segments_fuse_into_one() {
        let first = ChunkOutcome {
            plan: plan(0, (0.0, 855.0), (0.0, 855.0)),
            segments: vec![Segment::new(850.0, 854.9, "the sentence was cut in")],
        };
        let second = ChunkOutcome {
            plan: plan(1, (855.0, 1200.0), (853.0, 1200.0)),
            // Re-based start: 853 + 1.9 = 854.9, just inside the overlap
            // and within the 0.25s gap of the previous end, not a
            // duplicate of the tail.
            segments: vec![Segment::new(1.9, 4.0, "half by the chunker")],
        };

        let merged = merge_chunks(vec![first, second], &MergeParams::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "the sentence was cut in half by the chunker");
        assert_eq!(merged[0].start_s, 850.0);
        assert!((merged[0].end_s - 857.0).abs() < 1e-9);
    }

    #[test]
    fn merged_starts_are_non_decreasing() {
        let first = ChunkOutcome {
            plan: plan(0, (0.0, 855.0), (0.0, 855.0)),
            segments: vec![
                Segment::new(0.0, 10.0, "alpha"),
                Segment::new(840.0, 854.0, "omega of chunk one"),
            ],
        };
        let second = ChunkOutcome {
            plan: plan(1, (855.0, 1200.0), (853.0, 1200.0)),
            segments: vec![
                Segment::new(1.0, 6.0, "start of chunk two"),
                Segment::new(6.0, 12.0, "more of chunk two"),
            ],
        };

        let merged = merge_chunks(vec![first, second], &MergeParams::default());
        for pair in merged.windows(2) {
            assert!(pair[0].start_s <= pair[1].start_s);
        }
    }

    #[test]
    fn full_text_collapses_double_spacing() {
        let segments = vec![
            Segment::new(0.0, 1.0, "one  two"),
            Segment::new(1.0, 2.0, " three"),
        ];
        assert_eq!(full_text(&segments), "one two three");
    }

    #[test]
    fn token_similarity_detects_light_rewording() {
        let a = normalize("Let us move on.");
        let b = normalize("let us move on");
        assert!(token_similarity(&a, &b) >= 0.99);

        let c = normalize("completely different words here");
        assert!(token_similarity(&a, &c) < 0.2);
    }
}
