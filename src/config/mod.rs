use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::chunk::ChunkParams;
use crate::clean::{LlmCleaner, TranscriptCleaner};
use crate::transcribe::merge::MergeParams;

/// Credentials and environment are resolved here, in the configuration
/// layer; providers and the orchestrator only ever see opaque values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote transcription API settings
    pub remote: RemoteConfig,

    /// Local whisper.cpp settings
    pub local: LocalConfig,

    /// Locally hosted large model settings
    pub large_local: LargeLocalConfig,

    /// Chunk planning and merge tuning
    pub chunking: ChunkingConfig,

    /// Transcript cleaning settings
    pub cleaning: CleaningConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// OpenAI-compatible API root
    pub base_url: String,

    /// Transcription model name
    pub model: String,

    /// API key; falls back to `api_key_env` when unset
    pub api_key: Option<String>,

    /// Environment variable consulted for the API key
    pub api_key_env: String,

    /// Per-attempt request timeout in seconds
    pub timeout_s: u64,

    /// Attempt budget for transient failures
    pub max_attempts: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_s: 120,
            max_attempts: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// whisper.cpp binary name or path
    pub binary: String,

    /// Path to the ggml model weights
    pub model_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            binary: "whisper-cli".to_string(),
            model_path: PathBuf::from("ggml-base.bin"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LargeLocalConfig {
    /// Runner binary for the large model
    pub binary: String,

    /// Where to fetch the weights on first use
    pub model_url: String,

    /// Filename for the cached weights
    pub model_filename: String,

    /// Cache directory override; defaults to the user cache dir
    pub cache_dir: Option<PathBuf>,
}

impl Default for LargeLocalConfig {
    fn default() -> Self {
        Self {
            binary: "whisper-cli".to_string(),
            model_url:
                "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin"
                    .to_string(),
            model_filename: "ggml-large-v3.bin".to_string(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Seconds of overlap between consecutive chunk slices
    pub overlap_s: f64,

    /// Fraction shaved off chunk windows for encoding overhead
    pub safety_margin: f64,

    /// Gap under which boundary segments fuse into one cue
    pub fusion_gap_s: f64,

    /// Token-overlap similarity treated as a boundary duplicate
    pub similarity_threshold: f64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            overlap_s: 2.0,
            safety_margin: 0.05,
            fusion_gap_s: 0.25,
            similarity_threshold: 0.8,
        }
    }
}

impl ChunkingConfig {
    pub fn params(&self) -> ChunkParams {
        ChunkParams {
            overlap_s: self.overlap_s,
            safety_margin: self.safety_margin,
        }
    }

    pub fn merge_params(&self) -> MergeParams {
        MergeParams {
            fusion_gap_s: self.fusion_gap_s,
            similarity_threshold: self.similarity_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Clean every transcript by default, without requiring --clean
    pub enabled: bool,

    /// OpenAI-compatible chat API root
    pub base_url: String,

    /// Chat model used for cleaning
    pub model: String,

    /// API key; falls back to `api_key_env` when unset
    pub api_key: Option<String>,

    /// Environment variable consulted for the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_s: u64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_s: 60,
        }
    }
}

impl CleaningConfig {
    /// Build the LLM cleaner this config describes. Callers that do not
    /// want cleaning use [`NoopCleaner`] instead of calling this.
    pub fn build_cleaner(&self) -> Result<Box<dyn TranscriptCleaner>> {
        let credential = self
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .with_context(|| {
                format!(
                    "cleaning is enabled but no API key was found (set cleaning.api_key or {})",
                    self.api_key_env
                )
            })?;
        Ok(Box::new(LlmCleaner::new(
            self.base_url.clone(),
            self.model.clone(),
            credential,
            Duration::from_secs(self.timeout_s),
        )))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Keep resolved audio files after transcription
    pub keep_audio: bool,

    /// Default output format
    pub default_output_format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            keep_audio: false,
            default_output_format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            local: LocalConfig::default(),
            large_local: LargeLocalConfig::default(),
            chunking: ChunkingConfig::default(),
            cleaning: CleaningConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("clean-scribe").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chunking.overlap_s < 0.0 {
            anyhow::bail!("chunking.overlap_s must be non-negative");
        }
        if !(0.0..1.0).contains(&self.chunking.safety_margin) {
            anyhow::bail!("chunking.safety_margin must be in [0, 1)");
        }
        if self.remote.max_attempts == 0 {
            anyhow::bail!("remote.max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Resolve the remote API credential: explicit config value first, then
    /// the configured environment variable. Returns an opaque value; the
    /// provider never touches the environment itself.
    pub fn remote_credential(&self) -> Option<String> {
        self.remote
            .api_key
            .clone()
            .or_else(|| std::env::var(&self.remote.api_key_env).ok())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Remote API: {} ({})", self.remote.base_url, self.remote.model);
        println!(
            "  Remote key: {}",
            if self.remote_credential().is_some() { "configured" } else { "missing" }
        );
        println!("  Local model: {}", self.local.model_path.display());
        println!("  Large model: {}", self.large_local.model_filename);
        println!(
            "  Chunking: overlap {}s, margin {:.0}%",
            self.chunking.overlap_s,
            self.chunking.safety_margin * 100.0
        );
        println!("  Cleaning: {}", if self.cleaning.enabled { "enabled" } else { "disabled" });
        println!("  Default format: {}", self.app.default_output_format);
    }
}
