//! Input resolution: turn a URL or local file path into a normalized
//! [`AudioSource`] for the transcription core.
//!
//! Remote media is fetched with yt-dlp, which handles YouTube and most
//! other platforms and extracts an mp3 audio stream in one pass.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use url::Url;

use crate::audio::AudioSource;

/// Resolve an input string to a probed audio source inside `work_dir`.
pub async fn resolve(input: &str, work_dir: &Path) -> Result<AudioSource> {
    if is_local_file(input) {
        let path = Path::new(input);
        return AudioSource::probe(path)
            .await
            .with_context(|| format!("cannot use {input} as an audio source"));
    }

    let url = validate_url(input)?;
    let audio_path = download_audio(&url, work_dir).await?;
    AudioSource::probe(&audio_path).await
}

/// Check if input is a local file path rather than a URL.
fn is_local_file(input: &str) -> bool {
    if input.starts_with("http://") || input.starts_with("https://") {
        return false;
    }
    Path::new(input).exists()
}

/// Validate and normalize a media URL.
fn validate_url(input: &str) -> Result<Url> {
    let parsed = Url::parse(input).map_err(|_| anyhow::anyhow!("Invalid URL format: {input}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed)
}

/// Download and extract the audio track of a remote video with yt-dlp.
async fn download_audio(url: &Url, work_dir: &Path) -> Result<std::path::PathBuf> {
    let output_template = work_dir.join(format!(
        "audio_{}.%(ext)s",
        &uuid::Uuid::new_v4().to_string()[..8]
    ));

    let progress = ProgressBar::new_spinner();
    progress.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap(),
    );
    progress.set_message("Downloading audio with yt-dlp...");
    progress.enable_steady_tick(std::time::Duration::from_millis(120));

    let output = tokio::process::Command::new("yt-dlp")
        .args([
            "--no-playlist",
            "-x",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "192K",
            "-o",
        ])
        .arg(&output_template)
        .arg(url.as_str())
        .output()
        .await
        .context("failed to run yt-dlp (is it installed?)")?;

    progress.finish_and_clear();

    if !output.status.success() {
        anyhow::bail!(
            "yt-dlp failed for {url}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    // yt-dlp substitutes the extension; the converted file is always mp3.
    let audio_path = output_template.with_extension("mp3");
    if !audio_path.exists() {
        anyhow::bail!("yt-dlp reported success but produced no audio file");
    }

    tracing::info!("downloaded audio to {}", audio_path.display());
    Ok(audio_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_urls_are_not_local_files() {
        assert!(!is_local_file("https://www.youtube.com/watch?v=abc"));
        assert!(!is_local_file("http://example.com/a.mp3"));
    }

    #[test]
    fn existing_paths_are_local_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(is_local_file(file.path().to_str().unwrap()));
        assert!(!is_local_file("/no/such/file/anywhere.mp3"));
    }

    #[test]
    fn validate_url_rejects_non_http_schemes() {
        assert!(validate_url("https://example.com/v.mp4").is_ok());
        assert!(validate_url("ftp://example.com/v.mp4").is_err());
        assert!(validate_url("not a url").is_err());
    }
}
