use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

use super::{AudioSource, TimeRange};
use crate::TranscribeError;

/// Seam for cutting a time window out of an audio file.
///
/// The orchestrator slices chunks through this trait so the merge logic can
/// be tested without ffmpeg on the machine.
#[async_trait]
pub trait AudioSlicer: Send + Sync {
    /// Write the `range` window of `source` as a new audio artifact inside
    /// `work_dir`, returning a source describing it.
    async fn slice(
        &self,
        source: &AudioSource,
        range: TimeRange,
        work_dir: &Path,
    ) -> Result<AudioSource>;
}

/// Real slicer: shells out to ffmpeg and re-encodes to mono 16 kHz mp3, the
/// normalized form every provider accepts.
pub struct FfmpegSlicer;

#[async_trait]
impl AudioSlicer for FfmpegSlicer {
    async fn slice(
        &self,
        source: &AudioSource,
        range: TimeRange,
        work_dir: &Path,
    ) -> Result<AudioSource> {
        let out_path = work_dir.join(format!(
            "clip_{}.mp3",
            &uuid::Uuid::new_v4().to_string()[..8]
        ));

        let duration = range.duration();
        let output = tokio::process::Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-ss",
                &format!("{:.3}", range.start),
                "-t",
                &format!("{:.3}", duration),
                "-i",
            ])
            .arg(&source.path)
            .args(["-vn", "-ac", "1", "-ar", "16000", "-b:a", "64k", "-y"])
            .arg(&out_path)
            .output()
            .await
            .context("failed to run ffmpeg (is it installed?)")?;

        if !output.status.success() {
            anyhow::bail!(
                "ffmpeg failed to slice {}: {}",
                source.path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let size_bytes = fs_err::metadata(&out_path)?.len();
        tracing::debug!(
            "sliced {} -> {} ({:.1}s, {} bytes)",
            source.path.display(),
            out_path.display(),
            duration,
            size_bytes
        );

        Ok(AudioSource::new(out_path, duration, size_bytes, Some(16000)))
    }
}

/// Clips an [`AudioSource`] to a requested window.
pub struct Trimmer;

impl Trimmer {
    /// Validate a requested trim window against a source.
    ///
    /// `end = None` defaults to the source duration; an explicit end is
    /// clamped to it. Fails when the start lies at or past the end of the
    /// audio, or the clamped window is empty.
    pub fn resolve_range(
        source: &AudioSource,
        start: f64,
        end: Option<f64>,
    ) -> Result<TimeRange, TranscribeError> {
        if start < 0.0 {
            return Err(TranscribeError::InvalidRange(format!(
                "start must be non-negative, got {start}"
            )));
        }
        if start >= source.duration_s {
            return Err(TranscribeError::InvalidRange(format!(
                "start {start}s is at or past the end of the audio ({}s)",
                source.duration_s
            )));
        }

        let end = end.unwrap_or(source.duration_s).min(source.duration_s);
        TimeRange::new(start, end)
    }

    /// Produce a new trimmed source. Segments transcribed from the result
    /// are expressed relative to the trimmed timeline starting at 0.
    pub async fn trim(
        slicer: &dyn AudioSlicer,
        source: &AudioSource,
        range: TimeRange,
        work_dir: &Path,
    ) -> Result<AudioSource> {
        tracing::info!("trimming audio to {}", range);
        slicer.slice(source, range, work_dir).await
    }
}
