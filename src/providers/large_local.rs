//! Locally hosted large model backend.
//!
//! Behaves like the local whisper backend but with a one-time model
//! materialization step: the multi-gigabyte weights are downloaded from
//! Hugging Face into a cache directory before first use and never
//! re-fetched per chunk. The loaded model is process-wide state with an
//! explicit load/unload lifecycle.

use async_trait::async_trait;
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::OnceCell;

use super::local::LocalModelProvider;
use super::{ProviderEnvelope, Segment, TranscribeOptions, TranscriptionProvider};
use crate::audio::AudioSource;
use crate::config::LargeLocalConfig;
use crate::TranscribeError;

pub struct LocalLargeModelProvider {
    binary: String,
    model_url: String,
    model_filename: String,
    cache_dir: Option<PathBuf>,
    model: OnceCell<PathBuf>,
}

impl LocalLargeModelProvider {
    pub fn from_config(config: &LargeLocalConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            model_url: config.model_url.clone(),
            model_filename: config.model_filename.clone(),
            cache_dir: config.cache_dir.clone(),
            model: OnceCell::new(),
        }
    }

    /// Materialize the model eagerly. Transcription calls do this lazily,
    /// but callers that want the expensive download surfaced up front can
    /// invoke it themselves.
    pub async fn load(&self) -> crate::Result<&PathBuf> {
        self.model
            .get_or_try_init(|| self.materialize())
            .await
            .map_err(Into::into)
    }

    /// Drop the cached model handle. The weights stay on disk; the next
    /// call re-checks the cache rather than the network.
    pub fn unload(&mut self) {
        self.model = OnceCell::new();
    }

    fn cache_path(&self) -> Result<PathBuf, TranscribeError> {
        let dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::cache_dir()
                .ok_or_else(|| {
                    TranscribeError::Configuration(
                        "cannot determine a cache directory for model weights".into(),
                    )
                })?
                .join("clean-scribe")
                .join("models"),
        };
        Ok(dir.join(&self.model_filename))
    }

    async fn materialize(&self) -> Result<PathBuf, TranscribeError> {
        let model_path = self.cache_path()?;
        if model_path.exists() {
            tracing::info!("using cached model at {}", model_path.display());
            return Ok(model_path);
        }

        if let Some(parent) = model_path.parent() {
            fs_err::create_dir_all(parent)
                .map_err(|e| TranscribeError::Configuration(e.to_string()))?;
        }

        tracing::info!("downloading model weights from {}", self.model_url);
        let response = reqwest::get(&self.model_url).await.map_err(|e| {
            TranscribeError::ProviderTransient(format!("model download failed: {e}"))
        })?;

        if !response.status().is_success() {
            return Err(TranscribeError::ProviderTransient(format!(
                "model download failed: HTTP {}",
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let progress = ProgressBar::new(total);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
                .unwrap(),
        );
        progress.set_message("Downloading model weights...");

        // Download to a partial file first so an interrupted run never
        // leaves a truncated model in the cache.
        let partial_path = model_path.with_extension("partial");
        let mut file = fs_err::File::create(&partial_path)
            .map_err(|e| TranscribeError::Configuration(e.to_string()))?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(piece) = stream.next().await {
            let piece = piece.map_err(|e| {
                TranscribeError::ProviderTransient(format!("model download interrupted: {e}"))
            })?;
            file.write_all(&piece)
                .map_err(|e| TranscribeError::Configuration(e.to_string()))?;
            downloaded += piece.len() as u64;
            progress.set_position(downloaded);
        }
        drop(file);

        fs_err::rename(&partial_path, &model_path)
            .map_err(|e| TranscribeError::Configuration(e.to_string()))?;
        progress.finish_with_message("Model ready");

        Ok(model_path)
    }
}

#[async_trait]
impl TranscriptionProvider for LocalLargeModelProvider {
    fn name(&self) -> &'static str {
        "local-large"
    }

    fn envelope(&self) -> ProviderEnvelope {
        ProviderEnvelope::UNBOUNDED
    }

    async fn transcribe(
        &self,
        chunk: &AudioSource,
        options: &TranscribeOptions,
    ) -> Result<Vec<Segment>, TranscribeError> {
        let model_path = self
            .model
            .get_or_try_init(|| self.materialize())
            .await?
            .clone();

        // Same runner as the small local backend, pointed at the large
        // weights that were just materialized.
        let runner = LocalModelProvider::new(self.binary.clone(), model_path);
        runner.transcribe(chunk, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LargeLocalConfig;

    fn provider(cache_dir: PathBuf) -> LocalLargeModelProvider {
        LocalLargeModelProvider::from_config(&LargeLocalConfig {
            binary: "whisper-cli".into(),
            model_url: "https://example.invalid/model.bin".into(),
            model_filename: "ggml-large-v3.bin".into(),
            cache_dir: Some(cache_dir),
        })
    }

    #[tokio::test]
    async fn cached_weights_skip_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("ggml-large-v3.bin");
        fs_err::write(&weights, b"weights").unwrap();

        let provider = provider(dir.path().to_path_buf());
        // The URL is unreachable, so this only succeeds via the cache.
        let loaded = provider.load().await.unwrap();
        assert_eq!(loaded, &weights);
    }

    #[tokio::test]
    async fn load_happens_once_per_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("ggml-large-v3.bin");
        fs_err::write(&weights, b"weights").unwrap();

        let mut provider = provider(dir.path().to_path_buf());
        let first = provider.load().await.unwrap().clone();
        let second = provider.load().await.unwrap().clone();
        assert_eq!(first, second);

        provider.unload();
        let third = provider.load().await.unwrap().clone();
        assert_eq!(first, third);
    }
}
