use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::clean::CleaningStyle;
use crate::providers::ProviderKind;

#[derive(Parser)]
#[command(
    name = "cleanscribe",
    about = "Clean Scribe - transcribe YouTube videos and local media into cleaned, time-aligned subtitles",
    version,
    long_about = "A CLI tool that transcribes audio from YouTube URLs or local media files \
                  using a local whisper.cpp model, an OpenAI-compatible API, or a locally \
                  hosted large model, then optionally cleans the text and renders it as \
                  TXT, SRT, or VTT with timing preserved."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe audio from a URL or local file
    Transcribe {
        /// URL or file path to transcribe (YouTube, direct media, or local audio/video files)
        #[arg(value_name = "URL_OR_FILE")]
        input: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Transcription backend to route through
        #[arg(short, long, value_enum, default_value = "local")]
        provider: ProviderKind,

        /// Model override for the chosen provider (model path for local,
        /// model name for remote)
        #[arg(short, long, value_name = "MODEL")]
        model: Option<String>,

        /// Language code for transcription (auto-detect if not specified)
        #[arg(short, long, value_name = "LANG")]
        language: Option<String>,

        /// Free-text prompt to bias the model (names, jargon, context)
        #[arg(long, value_name = "TEXT")]
        prompt: Option<String>,

        /// Transcribe only from this offset, in seconds
        #[arg(long, value_name = "SECONDS")]
        from: Option<f64>,

        /// Transcribe only up to this offset, in seconds
        #[arg(long, value_name = "SECONDS")]
        to: Option<f64>,

        /// Clean the transcript with the configured LLM before rendering
        #[arg(long)]
        clean: bool,

        /// Editorial style used when cleaning
        #[arg(long, value_enum, default_value = "conversation")]
        clean_style: CleaningStyle,

        /// Fail the run when any chunk could not be transcribed, instead of
        /// emitting a transcript with gaps
        #[arg(long)]
        strict: bool,
    },

    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List available providers and their limits
    Providers,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON with timestamps
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
