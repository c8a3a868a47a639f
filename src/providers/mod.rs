use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::AudioSource;
use crate::config::Config;
use crate::TranscribeError;

pub mod large_local;
pub mod local;
pub mod remote;
pub mod retry;

pub use large_local::LocalLargeModelProvider;
pub use local::LocalModelProvider;
pub use remote::RemoteApiProvider;

/// Constraints a transcription backend imposes on a single call.
///
/// `None` means unbounded for that limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderEnvelope {
    pub max_duration_s: Option<f64>,
    pub max_size_bytes: Option<u64>,
    pub supports_timestamps: bool,
}

impl ProviderEnvelope {
    pub const UNBOUNDED: Self = Self {
        max_duration_s: None,
        max_size_bytes: None,
        supports_timestamps: true,
    };
}

/// How fine-grained the returned timestamps should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampGranularity {
    None,
    #[default]
    Segment,
}

/// Options common to every provider call.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// ISO language code; autodetect when absent.
    pub language: Option<String>,
    /// Free-text prompt to bias the model (vocabulary, previous context).
    pub prompt: Option<String>,
    pub granularity: TimestampGranularity,
}

/// One timestamped span of transcribed text.
///
/// Providers return times relative to the chunk they were handed (0-based);
/// the orchestrator re-bases them onto the original timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_s: f64,
    pub end_s: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start_s: f64, end_s: f64, text: impl Into<String>) -> Self {
        Self {
            start_s,
            end_s,
            text: text.into(),
        }
    }
}

/// A transcription backend.
///
/// Dispatched once at orchestration start; the orchestrator consults the
/// envelope to decide whether chunking is needed and then feeds each chunk
/// through `transcribe`.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Short identifier used in logs and result metadata.
    fn name(&self) -> &'static str;

    /// Static capability envelope for this backend.
    fn envelope(&self) -> ProviderEnvelope;

    /// Transcribe one chunk of audio. Returned segment times are relative
    /// to `chunk` itself.
    async fn transcribe(
        &self,
        chunk: &AudioSource,
        options: &TranscribeOptions,
    ) -> Result<Vec<Segment>, TranscribeError>;
}

/// Which backend to route a run through.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Local whisper.cpp model
    Local,
    /// OpenAI-compatible transcription API
    Remote,
    /// Locally hosted large model (downloaded on first use)
    LargeLocal,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Remote => write!(f, "remote"),
            ProviderKind::LargeLocal => write!(f, "large-local"),
        }
    }
}

/// Build the chosen provider from configuration.
///
/// `credential` is the opaque API key resolved by the config loader; the
/// providers themselves never read the environment.
pub fn create_provider(
    kind: ProviderKind,
    config: &Config,
    model_override: Option<&str>,
    credential: Option<String>,
) -> crate::Result<Box<dyn TranscriptionProvider>> {
    match kind {
        ProviderKind::Local => {
            let mut provider = LocalModelProvider::from_config(&config.local);
            if let Some(model) = model_override {
                provider.set_model(model);
            }
            Ok(Box::new(provider))
        }
        ProviderKind::Remote => {
            let credential = credential.ok_or_else(|| {
                anyhow::anyhow!(
                    "remote provider requires an API key (set it in the config file or {} env var)",
                    config.remote.api_key_env
                )
            })?;
            let mut provider = RemoteApiProvider::from_config(&config.remote, credential);
            if let Some(model) = model_override {
                provider.set_model(model);
            }
            Ok(Box::new(provider))
        }
        ProviderKind::LargeLocal => {
            if model_override.is_some() {
                tracing::warn!(
                    "--model is ignored for the large-local provider; set large_local in the config file"
                );
            }
            Ok(Box::new(LocalLargeModelProvider::from_config(
                &config.large_local,
            )))
        }
    }
}
