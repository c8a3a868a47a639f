//! Chunk orchestration: decide whether chunking is needed, dispatch each
//! chunk to the provider, and stitch the results.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use super::merge::{self, ChunkOutcome, MergeParams};
use super::TranscriptResult;
use crate::audio::chunk::{plan_chunks, ChunkParams};
use crate::audio::{AudioSlicer, AudioSource, TimeRange, Trimmer};
use crate::providers::{TranscribeOptions, TranscriptionProvider};

pub struct ChunkOrchestrator<'a> {
    provider: &'a dyn TranscriptionProvider,
    slicer: &'a dyn AudioSlicer,
    chunk_params: ChunkParams,
    merge_params: MergeParams,
}

impl<'a> ChunkOrchestrator<'a> {
    pub fn new(provider: &'a dyn TranscriptionProvider, slicer: &'a dyn AudioSlicer) -> Self {
        Self {
            provider,
            slicer,
            chunk_params: ChunkParams::default(),
            merge_params: MergeParams::default(),
        }
    }

    pub fn with_params(mut self, chunk: ChunkParams, merge: MergeParams) -> Self {
        self.chunk_params = chunk;
        self.merge_params = merge;
        self
    }

    /// Transcribe `source` (optionally pre-trimmed to `requested_range`),
    /// chunking as the provider's envelope demands.
    ///
    /// Chunks are processed sequentially in index order; local models
    /// cannot share device memory across concurrent calls, and ordered
    /// processing keeps the merge deterministic. A chunk that fails after
    /// the provider's own retries is recorded as a failed range and the
    /// remaining chunks still run.
    pub async fn run(
        &self,
        source: &AudioSource,
        options: &TranscribeOptions,
        requested_range: Option<TimeRange>,
        work_dir: &Path,
    ) -> Result<TranscriptResult> {
        let working = match requested_range {
            Some(range) => {
                let range = Trimmer::resolve_range(source, range.start, Some(range.end))?;
                Trimmer::trim(self.slicer, source, range, work_dir).await?
            }
            None => source.clone(),
        };

        let envelope = self.provider.envelope();
        let plans = plan_chunks(&working, &envelope, &self.chunk_params)?;
        tracing::info!(
            "transcribing {:.1}s of audio via {} in {} chunk(s)",
            working.duration_s,
            self.provider.name(),
            plans.len()
        );

        let progress = ProgressBar::new(plans.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] chunk {pos}/{len} {msg}")
                .unwrap(),
        );

        let mut outcomes = Vec::new();
        let mut failed_ranges: Vec<TimeRange> = Vec::new();
        let total_chunks = plans.len();

        for plan in plans {
            // The single whole-source chunk needs no slicing pass.
            let whole_source = total_chunks == 1
                && plan.padded.start == 0.0
                && plan.padded.end >= working.duration_s;

            let chunk_audio = if whole_source {
                working.clone()
            } else {
                self.slicer.slice(&working, plan.padded, work_dir).await?
            };

            match self.provider.transcribe(&chunk_audio, options).await {
                Ok(segments) => {
                    tracing::debug!(
                        "chunk {} ({}) produced {} segments",
                        plan.index,
                        plan.window,
                        segments.len()
                    );
                    outcomes.push(ChunkOutcome { plan, segments });
                }
                Err(e) => {
                    tracing::warn!(
                        "chunk {} ({}) failed permanently: {e}; continuing with remaining chunks",
                        plan.index,
                        plan.window
                    );
                    failed_ranges.push(plan.window);
                }
            }

            // Chunk slices are consumed the moment the call returns.
            if !whole_source {
                let _ = fs_err::remove_file(&chunk_audio.path);
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        let segments = merge::merge_chunks(outcomes, &self.merge_params);
        let text = merge::full_text(&segments);

        Ok(TranscriptResult::new(
            segments,
            text,
            options.language.clone(),
            failed_ranges,
            total_chunks,
        ))
    }
}
