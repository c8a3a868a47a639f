//! Clean Scribe - transcribe media from YouTube or local files into cleaned,
//! time-aligned subtitles.
//!
//! The library routes audio through one of several transcription providers
//! (local whisper.cpp, an OpenAI-compatible remote API, or a locally hosted
//! large model), chunking oversized audio to fit each provider's limits and
//! stitching the per-chunk results back into a single timeline.

pub mod audio;
pub mod clean;
pub mod cli;
pub mod config;
pub mod media;
pub mod output;
pub mod providers;
pub mod transcribe;
pub mod utils;

pub use audio::{AudioSource, TimeRange};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use providers::{ProviderEnvelope, Segment, TranscribeOptions, TranscriptionProvider};
pub use transcribe::{TranscriptResult, TranscriptionPipeline};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error taxonomy for the transcription core.
///
/// Per-chunk transient errors are retried inside the provider; irrecoverable
/// per-chunk errors are recorded on the result and processing continues.
/// Whole-run errors (bad trim range, impossible chunk parameters) abort
/// immediately.
#[derive(thiserror::Error, Debug)]
pub enum TranscribeError {
    #[error("invalid trim range: {0}")]
    InvalidRange(String),

    #[error("invalid chunking configuration: {0}")]
    Configuration(String),

    #[error("provider rejected credentials: {0}")]
    ProviderAuth(String),

    #[error("transient provider failure: {0}")]
    ProviderTransient(String),

    #[error("provider rejected payload: {0}")]
    ProviderPayload(String),

    #[error("cannot render malformed segment data: {0}")]
    Format(String),

    #[error("{failed} of {total} chunks failed to transcribe")]
    PartialTranscription { failed: usize, total: usize },
}

impl TranscribeError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TranscribeError::ProviderTransient(_))
    }
}
