use super::{AudioSource, TimeRange};
use crate::providers::ProviderEnvelope;
use crate::TranscribeError;

/// Tuning knobs for the chunk planner.
#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    /// Seconds of audio repeated at the front of every chunk after the
    /// first, so words spoken across a cut point survive in context.
    pub overlap_s: f64,
    /// Fraction shaved off the computed window length to tolerate encoding
    /// overhead when a size limit is the binding constraint.
    pub safety_margin: f64,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            overlap_s: 2.0,
            safety_margin: 0.05,
        }
    }
}

/// One planned chunk of a source.
///
/// `window` is the true, non-overlapped interval in the source's timeline;
/// merged segments are attributed against it. `padded` is the interval
/// actually sliced and fed to the provider (window extended backward by the
/// overlap for every chunk after the first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPlan {
    pub index: usize,
    pub window: TimeRange,
    pub padded: TimeRange,
}

/// Partition a source into provider-compliant chunks.
///
/// Returns a single whole-source chunk when the source already fits the
/// envelope, so the common case pays no chunking overhead.
pub fn plan_chunks(
    source: &AudioSource,
    envelope: &ProviderEnvelope,
    params: &ChunkParams,
) -> Result<Vec<ChunkPlan>, TranscribeError> {
    let duration = source.duration_s;

    let fits_duration = envelope
        .max_duration_s
        .map_or(true, |max| duration <= max);
    let fits_size = envelope
        .max_size_bytes
        .map_or(true, |max| source.size_bytes <= max);

    let whole = TimeRange::new(0.0, duration)?;
    if fits_duration && fits_size {
        return Ok(vec![ChunkPlan {
            index: 0,
            window: whole,
            padded: whole,
        }]);
    }

    let effective_max_s = effective_max_seconds(source, envelope, params)?;
    if params.overlap_s >= effective_max_s {
        return Err(TranscribeError::Configuration(format!(
            "overlap ({}s) must be shorter than the chunk window ({:.1}s)",
            params.overlap_s, effective_max_s
        )));
    }

    let mut chunks = Vec::new();
    let mut start = 0.0;
    while start < duration {
        let end = (start + effective_max_s).min(duration);
        let window = TimeRange::new(start, end)?;
        let padded = if chunks.is_empty() {
            window
        } else {
            TimeRange::new((start - params.overlap_s).max(0.0), end)?
        };
        chunks.push(ChunkPlan {
            index: chunks.len(),
            window,
            padded,
        });
        start = end;
    }

    tracing::debug!(
        "planned {} chunks of <= {:.1}s for {:.1}s of audio",
        chunks.len(),
        effective_max_s,
        duration
    );

    Ok(chunks)
}

/// Window length that respects whichever envelope limit binds first, reduced
/// by the safety margin.
fn effective_max_seconds(
    source: &AudioSource,
    envelope: &ProviderEnvelope,
    params: &ChunkParams,
) -> Result<f64, TranscribeError> {
    let from_duration = envelope.max_duration_s;
    let from_size = envelope
        .max_size_bytes
        .map(|max| max as f64 / source.bytes_per_second());

    let binding = match (from_duration, from_size) {
        (Some(d), Some(s)) => d.min(s),
        (Some(d), None) => d,
        (None, Some(s)) => s,
        // Unbounded envelopes never reach the planner's chunked path.
        (None, None) => {
            return Err(TranscribeError::Configuration(
                "cannot chunk against an unbounded envelope".to_string(),
            ))
        }
    };

    let effective = binding * (1.0 - params.safety_margin);
    if effective <= 0.0 {
        return Err(TranscribeError::Configuration(format!(
            "envelope leaves no usable window ({effective:.2}s)"
        )));
    }
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(duration_s: f64, size_bytes: u64) -> AudioSource {
        AudioSource::new(PathBuf::from("test.mp3"), duration_s, size_bytes, Some(16000))
    }

    fn envelope(max_duration_s: Option<f64>, max_size_bytes: Option<u64>) -> ProviderEnvelope {
        ProviderEnvelope {
            max_duration_s,
            max_size_bytes,
            supports_timestamps: true,
        }
    }

    #[test]
    fn fitting_source_yields_single_whole_chunk() {
        let chunks = plan_chunks(
            &source(600.0, 10_000_000),
            &envelope(Some(900.0), Some(25_000_000)),
            &ChunkParams::default(),
        )
        .unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].window, TimeRange::new(0.0, 600.0).unwrap());
        assert_eq!(chunks[0].padded, chunks[0].window);
    }

    #[test]
    fn unbounded_envelope_never_chunks() {
        let chunks = plan_chunks(
            &source(20_000.0, 500_000_000),
            &envelope(None, None),
            &ChunkParams::default(),
        )
        .unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn twenty_minute_source_with_900s_limit_makes_two_chunks() {
        // 900 * 0.95 = 855s windows over 1200s of audio.
        let chunks = plan_chunks(
            &source(1200.0, 10_000_000),
            &envelope(Some(900.0), None),
            &ChunkParams::default(),
        )
        .unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].window, TimeRange::new(0.0, 855.0).unwrap());
        assert_eq!(chunks[1].window, TimeRange::new(855.0, 1200.0).unwrap());
        // Second chunk's slice reaches back by the 2s overlap.
        assert_eq!(chunks[1].padded, TimeRange::new(853.0, 1200.0).unwrap());
        // True boundaries are strictly increasing and contiguous.
        assert_eq!(chunks[0].window.end, chunks[1].window.start);
    }

    #[test]
    fn size_limit_binds_when_tighter_than_duration() {
        // 1000s at 50_000 B/s = 50MB total; 10MB cap -> 200s raw, 190s with margin.
        let chunks = plan_chunks(
            &source(1000.0, 50_000_000),
            &envelope(Some(900.0), Some(10_000_000)),
            &ChunkParams::default(),
        )
        .unwrap();

        assert_eq!(chunks.len(), 6);
        assert!((chunks[0].window.end - 190.0).abs() < 1e-9);
        // Every padded slice stays within the derived size budget.
        for chunk in &chunks {
            assert!(chunk.padded.duration() <= 200.0);
        }
    }

    #[test]
    fn overlap_wider_than_window_is_a_configuration_error() {
        let params = ChunkParams {
            overlap_s: 900.0,
            safety_margin: 0.05,
        };
        let err = plan_chunks(
            &source(1200.0, 10_000_000),
            &envelope(Some(900.0), None),
            &params,
        )
        .unwrap_err();
        assert!(matches!(err, TranscribeError::Configuration(_)));
    }

    #[test]
    fn first_chunk_is_never_padded_below_zero() {
        let params = ChunkParams {
            overlap_s: 3.0,
            safety_margin: 0.05,
        };
        let chunks = plan_chunks(
            &source(1200.0, 10_000_000),
            &envelope(Some(900.0), None),
            &params,
        )
        .unwrap();
        assert_eq!(chunks[0].padded.start, 0.0);
        assert!(chunks[1].padded.start >= 0.0);
    }

    #[test]
    fn windows_cover_the_whole_source() {
        let chunks = plan_chunks(
            &source(3000.0, 80_000_000),
            &envelope(Some(900.0), Some(25_000_000)),
            &ChunkParams::default(),
        )
        .unwrap();

        assert_eq!(chunks.first().unwrap().window.start, 0.0);
        assert_eq!(chunks.last().unwrap().window.end, 3000.0);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].window.end, pair[1].window.start);
            assert!(pair[0].window.start < pair[1].window.start);
        }
    }
}
