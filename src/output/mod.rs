use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::TranscriptResult;

pub mod formatters;

pub use formatters::*;

/// Render a transcription result in the requested format.
pub fn render(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => format_as_text(result),
        OutputFormat::Json => format_as_json(result)?,
        OutputFormat::Srt => format_as_srt(result)?,
        OutputFormat::Vtt => format_as_vtt(result)?,
    };
    Ok(content)
}

/// Save transcription result to file
pub fn save_to_file(result: &TranscriptResult, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcription result to console
pub fn print_to_console(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    println!("{}", render(result, format)?);
    Ok(())
}
