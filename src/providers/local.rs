//! Local whisper.cpp sidecar backend.
//!
//! Runs entirely offline with no duration or size limits; latency scales
//! with chunk length and the selected model size.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use super::{ProviderEnvelope, Segment, TranscribeOptions, TranscriptionProvider};
use crate::audio::AudioSource;
use crate::config::LocalConfig;
use crate::TranscribeError;

pub struct LocalModelProvider {
    binary: String,
    model_path: PathBuf,
}

impl LocalModelProvider {
    pub fn from_config(config: &LocalConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            model_path: config.model_path.clone(),
        }
    }

    pub fn new(binary: String, model_path: PathBuf) -> Self {
        Self { binary, model_path }
    }

    pub fn set_model(&mut self, model_path: &str) {
        self.model_path = PathBuf::from(model_path);
    }

    fn parse_output(json: &str) -> Result<Vec<Segment>, TranscribeError> {
        let parsed: WhisperCliOutput = serde_json::from_str(json).map_err(|e| {
            TranscribeError::ProviderPayload(format!("unparseable whisper.cpp output: {e}"))
        })?;

        Ok(parsed
            .transcription
            .into_iter()
            .filter(|entry| !entry.text.trim().is_empty())
            .map(|entry| {
                Segment::new(
                    entry.offsets.from as f64 / 1000.0,
                    entry.offsets.to as f64 / 1000.0,
                    entry.text.trim(),
                )
            })
            .collect())
    }
}

#[async_trait]
impl TranscriptionProvider for LocalModelProvider {
    fn name(&self) -> &'static str {
        "local-whisper"
    }

    fn envelope(&self) -> ProviderEnvelope {
        ProviderEnvelope::UNBOUNDED
    }

    async fn transcribe(
        &self,
        chunk: &AudioSource,
        options: &TranscribeOptions,
    ) -> Result<Vec<Segment>, TranscribeError> {
        if !self.model_path.exists() {
            return Err(TranscribeError::ProviderPayload(format!(
                "whisper model not found: {}",
                self.model_path.display()
            )));
        }

        // whisper.cpp writes <output_base>.json when asked for JSON output.
        let output_base = chunk.path.with_extension("whisper");

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg("-m")
            .arg(&self.model_path)
            .arg("-f")
            .arg(&chunk.path)
            .arg("-oj")
            .arg("-of")
            .arg(&output_base);

        if let Some(ref language) = options.language {
            command.args(["-l", language]);
        }
        if let Some(ref prompt) = options.prompt {
            command.args(["--prompt", prompt]);
        }

        let output = command.output().await.map_err(|e| {
            TranscribeError::ProviderPayload(format!(
                "failed to run {} (is whisper.cpp installed?): {e}",
                self.binary
            ))
        })?;

        if !output.status.success() {
            return Err(TranscribeError::ProviderPayload(format!(
                "whisper.cpp exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let json_path = output_base.with_extension("whisper.json");
        let json = fs_err::read_to_string(&json_path).map_err(|e| {
            TranscribeError::ProviderPayload(format!("missing whisper.cpp output: {e}"))
        })?;
        let _ = fs_err::remove_file(&json_path);

        Self::parse_output(&json)
    }
}

#[derive(Debug, Deserialize)]
struct WhisperCliOutput {
    #[serde(default)]
    transcription: Vec<WhisperEntry>,
}

#[derive(Debug, Deserialize)]
struct WhisperEntry {
    offsets: WhisperOffsets,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}
