//! Rendering a transcript into the supported text formats.
//!
//! Rendering is deterministic: the same result always produces the same
//! bytes, so re-running the formatter is safe.

use crate::providers::Segment;
use crate::transcribe::TranscriptResult;
use crate::TranscribeError;

/// Plain text: the full transcript. Paragraph breaks come from the cleaning
/// step, never from the formatter.
pub fn format_as_text(result: &TranscriptResult) -> String {
    let mut text = result.text.clone();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// JSON dump of the whole result, segments and metadata included.
pub fn format_as_json(result: &TranscriptResult) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// SRT: one cue per segment, 1-based indices, comma millisecond separator.
pub fn format_as_srt(result: &TranscriptResult) -> Result<String, TranscribeError> {
    validate_segments(&result.segments)?;

    let mut out = String::new();
    for (i, segment) in result.segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(segment.start_s, ','),
            format_timestamp(segment.end_s, ',')
        ));
        out.push_str(segment.text.trim());
        out.push_str("\n\n");
    }
    Ok(out)
}

/// WebVTT: header plus one cue per segment, dot millisecond separator.
pub fn format_as_vtt(result: &TranscriptResult) -> Result<String, TranscribeError> {
    validate_segments(&result.segments)?;

    let mut out = String::from("WEBVTT\n\n");
    for segment in &result.segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(segment.start_s, '.'),
            format_timestamp(segment.end_s, '.')
        ));
        out.push_str(segment.text.trim());
        out.push_str("\n\n");
    }
    Ok(out)
}

fn validate_segments(segments: &[Segment]) -> Result<(), TranscribeError> {
    for segment in segments {
        if segment.end_s < segment.start_s {
            return Err(TranscribeError::Format(format!(
                "segment at {:.3}s ends before it starts ({:.3}s)",
                segment.start_s, segment.end_s
            )));
        }
    }
    Ok(())
}

/// `HH:MM:SS<sep>mmm`, milliseconds truncated rather than rounded so a cue
/// never starts ahead of its audio.
fn format_timestamp(seconds: f64, millis_sep: char) -> String {
    let total_ms = (seconds * 1000.0).floor() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{secs:02}{millis_sep}{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TimeRange;

    fn result(segments: Vec<Segment>) -> TranscriptResult {
        let text = segments
            .iter()
            .map(|s| s.text.clone())
            .collect::<Vec<_>>()
            .join(" ");
        TranscriptResult::new(segments, text, Some("en".into()), Vec::new(), 1)
    }

    fn sample() -> TranscriptResult {
        result(vec![
            Segment::new(0.0, 2.5, "hello there"),
            Segment::new(2.5, 61.2345, "general remarks"),
        ])
    }

    #[test]
    fn srt_uses_comma_and_sequential_indices() {
        let srt = format_as_srt(&sample()).unwrap();
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,500\nhello there\n"));
        assert!(srt.contains("\n2\n00:00:02,500 --> 00:01:01,234\ngeneral remarks\n"));
    }

    #[test]
    fn vtt_has_header_and_dot_separator() {
        let vtt = format_as_vtt(&sample()).unwrap();
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:02.500 --> 00:01:01.234"));
    }

    #[test]
    fn milliseconds_are_truncated_not_rounded() {
        // 61.2345s -> 61234ms, never 61235.
        assert_eq!(format_timestamp(61.2345, ','), "00:01:01,234");
        assert_eq!(format_timestamp(0.9999, '.'), "00:00:00.999");
    }

    #[test]
    fn hour_rollover_is_correct() {
        assert_eq!(format_timestamp(3723.5, ','), "01:02:03,500");
    }

    #[test]
    fn rendering_is_idempotent() {
        let result = sample();
        assert_eq!(
            format_as_srt(&result).unwrap(),
            format_as_srt(&result).unwrap()
        );
        assert_eq!(
            format_as_vtt(&result).unwrap(),
            format_as_vtt(&result).unwrap()
        );
        assert_eq!(format_as_text(&result), format_as_text(&result));
    }

    #[test]
    fn reversed_segment_fails_with_format_error() {
        let bad = result(vec![Segment::new(5.0, 3.0, "time ran backwards")]);
        assert!(matches!(
            format_as_srt(&bad).unwrap_err(),
            TranscribeError::Format(_)
        ));
        assert!(matches!(
            format_as_vtt(&bad).unwrap_err(),
            TranscribeError::Format(_)
        ));
    }

    #[test]
    fn srt_round_trip_recovers_timestamps_within_1ms() {
        let original = sample();
        let srt = format_as_srt(&original).unwrap();

        let parsed: Vec<(f64, f64)> = srt
            .lines()
            .filter(|line| line.contains("-->"))
            .map(|line| {
                let (start, end) = line.split_once(" --> ").unwrap();
                (parse_srt_timestamp(start), parse_srt_timestamp(end))
            })
            .collect();

        assert_eq!(parsed.len(), original.segments.len());
        for (segment, (start, end)) in original.segments.iter().zip(parsed) {
            assert!((segment.start_s - start).abs() < 0.001);
            assert!((segment.end_s - end).abs() < 0.001);
        }
    }

    fn parse_srt_timestamp(stamp: &str) -> f64 {
        let (hms, millis) = stamp.split_once(',').unwrap();
        let parts: Vec<u64> = hms.split(':').map(|p| p.parse().unwrap()).collect();
        let millis: u64 = millis.parse().unwrap();
        (parts[0] * 3600 + parts[1] * 60 + parts[2]) as f64 + millis as f64 / 1000.0
    }

    #[test]
    fn text_output_ends_with_newline() {
        let out = format_as_text(&sample());
        assert!(out.ends_with('\n'));
        assert_eq!(out.trim_end(), "hello there general remarks");
    }

    #[test]
    fn failed_ranges_do_not_break_rendering() {
        let mut res = sample();
        res.failed_ranges.push(TimeRange::new(61.3, 120.0).unwrap());
        assert!(format_as_srt(&res).is_ok());
    }
}
