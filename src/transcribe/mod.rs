use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::audio::{FfmpegSlicer, TimeRange};
use crate::clean::{CleaningStyle, TranscriptCleaner};
use crate::config::Config;
use crate::providers::{self, ProviderKind, Segment, TranscribeOptions};
use crate::TranscribeError;

pub mod merge;
pub mod orchestrator;

pub use orchestrator::ChunkOrchestrator;

/// Transcription result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    /// Segments on the (possibly trimmed) original timeline, ordered by
    /// start time
    pub segments: Vec<Segment>,

    /// Detected or declared language
    pub language: String,

    /// Full transcript text, segments joined by single spaces
    pub text: String,

    /// Windows whose chunks failed permanently; empty on a complete run
    pub failed_ranges: Vec<TimeRange>,

    /// How many chunks the source was split into
    pub total_chunks: usize,

    /// Transcription metadata
    pub metadata: TranscriptionMetadata,
}

/// Metadata about the transcription process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriptionMetadata {
    /// Provider that produced the result
    pub provider: String,

    /// Wall-clock processing time in seconds
    pub processing_duration: Option<f64>,

    /// Duration of the transcribed audio in seconds
    pub audio_duration: Option<f64>,

    /// Timestamp when transcription completed
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TranscriptResult {
    pub fn new(
        segments: Vec<Segment>,
        text: String,
        language: Option<String>,
        failed_ranges: Vec<TimeRange>,
        total_chunks: usize,
    ) -> Self {
        Self {
            segments,
            language: language.unwrap_or_else(|| "auto".to_string()),
            text,
            failed_ranges,
            total_chunks,
            metadata: TranscriptionMetadata::default(),
        }
    }

    /// Whether any chunk failed permanently.
    pub fn is_partial(&self) -> bool {
        !self.failed_ranges.is_empty()
    }

    /// Escalate a transcript with gaps into an error. A transcript with
    /// gaps is preferable to no transcript, so the orchestrator never
    /// aborts on its own; callers decide here.
    pub fn ensure_complete(&self) -> Result<(), TranscribeError> {
        if self.is_partial() {
            Err(TranscribeError::PartialTranscription {
                failed: self.failed_ranges.len(),
                total: self.total_chunks,
            })
        } else {
            Ok(())
        }
    }
}

/// End-to-end pipeline: resolve media, route to a provider, clean, output.
pub struct TranscriptionPipeline {
    config: Config,
    temp_dir: TempDir,
}

impl TranscriptionPipeline {
    pub fn new(config: Config) -> Result<Self> {
        let temp_dir = TempDir::new().context("Failed to create temporary directory")?;
        Ok(Self { config, temp_dir })
    }

    /// Transcribe a URL or local file through the chosen provider.
    pub async fn transcribe(
        &self,
        input: &str,
        kind: ProviderKind,
        model_override: Option<&str>,
        options: &TranscribeOptions,
        requested_range: Option<TimeRange>,
        cleaning: Option<CleaningStyle>,
    ) -> Result<TranscriptResult> {
        let started = std::time::Instant::now();

        let source = crate::media::resolve(input, self.temp_dir.path()).await?;
        tracing::info!(
            "resolved input to {} ({:.1}s, {})",
            source.path.display(),
            source.duration_s,
            crate::utils::format_file_size(source.size_bytes)
        );

        let credential = self.config.remote_credential();
        let provider = providers::create_provider(kind, &self.config, model_override, credential)?;

        let slicer = FfmpegSlicer;
        let orchestrator = ChunkOrchestrator::new(provider.as_ref(), &slicer).with_params(
            self.config.chunking.params(),
            self.config.chunking.merge_params(),
        );

        let mut result = orchestrator
            .run(&source, options, requested_range, self.temp_dir.path())
            .await?;

        if result.is_partial() {
            tracing::warn!(
                "{} of {} chunks failed; transcript has gaps at {:?}",
                result.failed_ranges.len(),
                result.total_chunks,
                result.failed_ranges.iter().map(|r| r.to_string()).collect::<Vec<_>>()
            );
        }

        if let Some(style) = cleaning {
            let cleaner = self.config.cleaning.build_cleaner()?;
            result = clean_result(result, cleaner.as_ref(), style).await?;
        }

        result.metadata = TranscriptionMetadata {
            provider: provider.name().to_string(),
            processing_duration: Some(started.elapsed().as_secs_f64()),
            audio_duration: Some(source.duration_s),
            completed_at: Some(chrono::Utc::now()),
        };

        Ok(result)
    }
}

/// Apply cleaning at both granularities: per segment (so SRT/VTT cues keep
/// their timing) and across the whole document (for TXT output, where the
/// cleaner may reflow freely).
pub async fn clean_result(
    mut result: TranscriptResult,
    cleaner: &dyn TranscriptCleaner,
    style: CleaningStyle,
) -> Result<TranscriptResult> {
    let cleaned_texts = cleaner.clean_segments(&result.segments, style).await?;
    if cleaned_texts.len() != result.segments.len() {
        anyhow::bail!(
            "cleaner returned {} texts for {} segments",
            cleaned_texts.len(),
            result.segments.len()
        );
    }
    for (segment, cleaned) in result.segments.iter_mut().zip(cleaned_texts) {
        segment.text = cleaned;
    }

    result.text = cleaner.clean_text(&result.text, style).await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::NoopCleaner;

    fn sample_result() -> TranscriptResult {
        TranscriptResult::new(
            vec![
                Segment::new(0.0, 2.0, "hello"),
                Segment::new(2.0, 4.0, "world"),
            ],
            "hello world".to_string(),
            Some("en".to_string()),
            Vec::new(),
            1,
        )
    }

    #[test]
    fn complete_result_passes_ensure_complete() {
        assert!(sample_result().ensure_complete().is_ok());
    }

    #[test]
    fn partial_result_surfaces_as_metadata_not_abort() {
        let mut result = sample_result();
        result.failed_ranges.push(TimeRange::new(4.0, 8.0).unwrap());
        result.total_chunks = 3;

        assert!(result.is_partial());
        let err = result.ensure_complete().unwrap_err();
        assert!(matches!(
            err,
            TranscribeError::PartialTranscription { failed: 1, total: 3 }
        ));
    }

    #[tokio::test]
    async fn noop_cleaning_preserves_segment_count_and_timing() {
        let result = sample_result();
        let cleaned = clean_result(result.clone(), &NoopCleaner, CleaningStyle::Lecture)
            .await
            .unwrap();

        assert_eq!(cleaned.segments.len(), result.segments.len());
        assert_eq!(cleaned.segments[0].start_s, 0.0);
        assert_eq!(cleaned.text, "hello world");
    }
}
