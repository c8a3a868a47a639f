use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clean_scribe::audio::TimeRange;
use clean_scribe::cli::{Cli, Commands};
use clean_scribe::config::Config;
use clean_scribe::providers::{TimestampGranularity, TranscribeOptions};
use clean_scribe::transcribe::TranscriptionPipeline;
use clean_scribe::{output, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "clean_scribe=debug"
    } else {
        "clean_scribe=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Transcribe {
            input,
            output,
            format,
            provider,
            model,
            language,
            prompt,
            from,
            to,
            clean,
            clean_style,
            strict,
        } => {
            // External tool checks are advisory; the tools may still be
            // found at call time in container setups.
            let missing = utils::check_dependencies().await;
            for dep in &missing {
                tracing::warn!("missing external tool: {dep}");
            }

            let requested_range = match (from, to) {
                (None, None) => None,
                (start, end) => {
                    // The end bound is clamped to the real duration later;
                    // f64::MAX stands in for "until the end".
                    Some(TimeRange::new(
                        start.unwrap_or(0.0),
                        end.unwrap_or(f64::MAX),
                    )?)
                }
            };

            let options = TranscribeOptions {
                language,
                prompt,
                granularity: TimestampGranularity::Segment,
            };

            let do_clean = clean || config.cleaning.enabled;
            let pipeline = TranscriptionPipeline::new(config)?;
            let result = pipeline
                .transcribe(
                    &input,
                    provider,
                    model.as_deref(),
                    &options,
                    requested_range,
                    do_clean.then_some(clean_style),
                )
                .await?;

            if strict {
                result.ensure_complete()?;
            }

            match output {
                Some(path) => {
                    output::save_to_file(&result, &path, &format)?;
                    println!("Transcription saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, &format)?;
                }
            }

            if result.is_partial() {
                eprintln!(
                    "Warning: {} of {} chunks failed; the transcript has gaps at:",
                    result.failed_ranges.len(),
                    result.total_chunks
                );
                for range in &result.failed_ranges {
                    eprintln!("  {range}");
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.save()?;
                println!("Configuration written. Edit it at the path shown by --show.");
            }
        }
        Commands::Providers => {
            println!("Available providers:");
            println!("  local       whisper.cpp on this machine; no duration or size limits");
            println!("  remote      OpenAI-compatible API; 15 min / 25 MB per request, chunked automatically");
            println!("  large-local locally hosted large model; weights downloaded and cached on first use");
        }
    }

    Ok(())
}
