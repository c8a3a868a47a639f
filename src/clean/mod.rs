//! Transcript cleaning collaborator seam.
//!
//! Cleaning is an opaque `text + style -> text` function to the core. The
//! only contract the core enforces is shape preservation: when cleaning is
//! applied per segment, text never reflows across cue boundaries, so
//! subtitle timing survives.

use async_trait::async_trait;

use crate::providers::Segment;
use crate::Result;

pub mod llm;

pub use llm::LlmCleaner;

/// Editorial register for the cleaned transcript.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleaningStyle {
    /// Polished talk-style prose
    Presentation,
    /// Keeps conversational rhythm, drops filler
    Conversation,
    /// Structured, note-friendly phrasing
    Lecture,
}

impl std::fmt::Display for CleaningStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleaningStyle::Presentation => write!(f, "presentation"),
            CleaningStyle::Conversation => write!(f, "conversation"),
            CleaningStyle::Lecture => write!(f, "lecture"),
        }
    }
}

#[async_trait]
pub trait TranscriptCleaner: Send + Sync {
    /// Clean a whole document; the cleaner may reflow paragraphs freely.
    async fn clean_text(&self, text: &str, style: CleaningStyle) -> Result<String>;

    /// Clean each segment independently, returning exactly one text per
    /// input segment so cue timing is preserved.
    async fn clean_segments(
        &self,
        segments: &[Segment],
        style: CleaningStyle,
    ) -> Result<Vec<String>> {
        let mut cleaned = Vec::with_capacity(segments.len());
        for segment in segments {
            cleaned.push(self.clean_text(&segment.text, style).await?);
        }
        Ok(cleaned)
    }
}

/// Passthrough used when cleaning is disabled.
pub struct NoopCleaner;

#[async_trait]
impl TranscriptCleaner for NoopCleaner {
    async fn clean_text(&self, text: &str, _style: CleaningStyle) -> Result<String> {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_passes_data_through_unchanged() {
        let text = "um, so, like, hello";
        let out = NoopCleaner
            .clean_text(text, CleaningStyle::Conversation)
            .await
            .unwrap();
        assert_eq!(out, text);
    }

    #[tokio::test]
    async fn default_segment_cleaning_is_one_to_one() {
        let segments = vec![
            Segment::new(0.0, 1.0, "first"),
            Segment::new(1.0, 2.0, "second"),
            Segment::new(2.0, 3.0, "third"),
        ];
        let cleaned = NoopCleaner
            .clean_segments(&segments, CleaningStyle::Lecture)
            .await
            .unwrap();
        assert_eq!(cleaned, vec!["first", "second", "third"]);
    }
}
