//! LLM-backed transcript cleaner speaking the OpenAI chat-completions
//! protocol.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{CleaningStyle, TranscriptCleaner};
use crate::Result;

pub struct LlmCleaner {
    client: reqwest::Client,
    base_url: String,
    model: String,
    credential: String,
}

impl LlmCleaner {
    pub fn new(base_url: String, model: String, credential: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            credential,
        }
    }

    fn instruction(style: CleaningStyle) -> &'static str {
        match style {
            CleaningStyle::Presentation => {
                "Rewrite this transcript excerpt as polished presentation prose. \
                 Remove filler words and false starts. Keep every point the \
                 speaker makes. Reply with the cleaned text only."
            }
            CleaningStyle::Conversation => {
                "Lightly clean this transcript excerpt. Remove filler words \
                 but keep the conversational tone and phrasing. Reply with \
                 the cleaned text only."
            }
            CleaningStyle::Lecture => {
                "Clean this lecture transcript excerpt into clear, structured \
                 sentences suitable for study notes. Keep all technical \
                 content. Reply with the cleaned text only."
            }
        }
    }
}

#[async_trait]
impl TranscriptCleaner for LlmCleaner {
    async fn clean_text(&self, text: &str, style: CleaningStyle) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": Self::instruction(style)},
                {"role": "user", "content": text}
            ],
            "temperature": 0.2
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.credential)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!(
                "cleaning request failed: HTTP {} from {}",
                response.status(),
                url
            );
        }

        let completion: ChatCompletion = response.json().await?;
        let cleaned = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|c| !c.is_empty());

        // An empty or missing completion falls back to the original text;
        // a worse transcript must never come out of the cleaning step.
        Ok(cleaned.unwrap_or_else(|| text.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}
