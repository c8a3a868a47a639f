use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::TranscribeError;

pub mod chunk;
pub mod trim;

pub use trim::{AudioSlicer, FfmpegSlicer, Trimmer};

/// Half-open time interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self, TranscribeError> {
        if start < 0.0 {
            return Err(TranscribeError::InvalidRange(format!(
                "start must be non-negative, got {start}"
            )));
        }
        if end <= start {
            return Err(TranscribeError::InvalidRange(format!(
                "end ({end}) must be greater than start ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Shift both bounds by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.2}s, {:.2}s)", self.start, self.end)
    }
}

/// A normalized audio stream on disk, plus the metadata the chunker needs.
///
/// Sources are created by the media resolver or by the trimmer/slicer. Temp
/// artifacts live inside the pipeline's `TempDir`, so they are released on
/// success, failure, or cancellation alike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSource {
    pub path: PathBuf,
    pub duration_s: f64,
    pub size_bytes: u64,
    pub sample_rate: Option<u32>,
}

impl AudioSource {
    pub fn new(path: PathBuf, duration_s: f64, size_bytes: u64, sample_rate: Option<u32>) -> Self {
        Self {
            path,
            duration_s,
            size_bytes,
            sample_rate,
        }
    }

    /// Average encoded byte rate, used to translate a size limit into a
    /// duration limit when planning chunks.
    pub fn bytes_per_second(&self) -> f64 {
        self.size_bytes as f64 / self.duration_s
    }

    /// Probe an audio file with ffprobe to build an [`AudioSource`].
    pub async fn probe(path: &Path) -> Result<Self> {
        crate::utils::check_file_accessible(path)?;

        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration,size:stream=sample_rate",
                "-of",
                "json",
                path.to_str()
                    .context("audio path is not valid UTF-8")?,
            ])
            .output()
            .await
            .context("failed to run ffprobe (is it installed?)")?;

        if !output.status.success() {
            anyhow::bail!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .context("failed to parse ffprobe output")?;

        let duration_s: f64 = probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse().ok())
            .context("ffprobe reported no duration")?;

        let size_bytes: u64 = probe
            .format
            .size
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| {
                std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
            });

        if duration_s <= 0.0 || size_bytes == 0 {
            anyhow::bail!(
                "{} does not look like a playable audio file",
                path.display()
            );
        }

        let sample_rate = probe
            .streams
            .iter()
            .find_map(|s| s.sample_rate.as_deref())
            .and_then(|r| r.parse().ok());

        Ok(Self::new(path.to_path_buf(), duration_s, size_bytes, sample_rate))
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    sample_rate: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_rejects_negative_start() {
        assert!(TimeRange::new(-1.0, 5.0).is_err());
    }

    #[test]
    fn time_range_rejects_empty_interval() {
        assert!(TimeRange::new(5.0, 5.0).is_err());
        assert!(TimeRange::new(5.0, 4.0).is_err());
    }

    #[test]
    fn time_range_duration_and_shift() {
        let range = TimeRange::new(90.0, 150.0).unwrap();
        assert_eq!(range.duration(), 60.0);

        let shifted = range.shifted(10.0);
        assert_eq!(shifted.start, 100.0);
        assert_eq!(shifted.end, 160.0);
    }

    #[test]
    fn bytes_per_second_from_size_and_duration() {
        let source = AudioSource::new(PathBuf::from("a.mp3"), 100.0, 1_600_000, Some(16000));
        assert_eq!(source.bytes_per_second(), 16_000.0);
    }
}
