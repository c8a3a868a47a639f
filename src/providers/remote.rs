//! OpenAI-compatible transcription API backend.
//!
//! POSTs chunks as multipart form data to `{base_url}/audio/transcriptions`
//! and asks for `verbose_json` so segment timestamps come back when the
//! caller wants them. Transient failures are retried with exponential
//! backoff; auth and payload errors fail fast.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::retry::{ErrorClass, RetryDecision, RetryPolicy};
use super::{
    ProviderEnvelope, Segment, TimestampGranularity, TranscribeOptions, TranscriptionProvider,
};
use crate::audio::AudioSource;
use crate::config::RemoteConfig;
use crate::TranscribeError;

/// Limits of the backing service: 15 minutes / 25 MB per request.
const MAX_DURATION_S: f64 = 900.0;
const MAX_SIZE_BYTES: u64 = 25 * 1024 * 1024;

/// Raw response from one transport attempt.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Transport seam: the real implementation speaks HTTP, tests inject a
/// scripted fake so retry behavior is verified without a network.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn post_audio(
        &self,
        chunk: &AudioSource,
        options: &TranscribeOptions,
        model: &str,
    ) -> Result<ApiResponse, TranscribeError>;
}

/// HTTP transport with a per-attempt client timeout, distinct from the
/// retry/backoff policy.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credential: String,
}

impl HttpTransport {
    pub fn new(base_url: String, credential: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        }
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn post_audio(
        &self,
        chunk: &AudioSource,
        options: &TranscribeOptions,
        model: &str,
    ) -> Result<ApiResponse, TranscribeError> {
        let bytes = fs_err::read(&chunk.path)
            .map_err(|e| TranscribeError::ProviderPayload(format!("cannot read chunk: {e}")))?;
        let file_name = chunk
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")
            .map_err(|e| TranscribeError::ProviderPayload(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model.to_string());

        if let Some(ref language) = options.language {
            form = form.text("language", language.clone());
        }
        if let Some(ref prompt) = options.prompt {
            form = form.text("prompt", prompt.clone());
        }
        if options.granularity == TimestampGranularity::Segment {
            form = form
                .text("response_format", "verbose_json")
                .text("timestamp_granularities[]", "segment");
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.credential)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                // Connect errors and timeouts are retryable.
                TranscribeError::ProviderTransient(format!("request to {url} failed: {e}"))
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(ApiResponse { status, body })
    }
}

/// Remote API provider with bounded envelope and local retry logic.
pub struct RemoteApiProvider {
    transport: Box<dyn ApiTransport>,
    model: String,
    policy: RetryPolicy,
    retries: AtomicU32,
}

impl RemoteApiProvider {
    pub fn from_config(config: &RemoteConfig, credential: String) -> Self {
        let transport = HttpTransport::new(
            config.base_url.clone(),
            credential,
            Duration::from_secs(config.timeout_s),
        );
        Self::with_transport(
            Box::new(transport),
            config.model.clone(),
            RetryPolicy {
                max_attempts: config.max_attempts,
                ..Default::default()
            },
        )
    }

    pub fn with_transport(
        transport: Box<dyn ApiTransport>,
        model: String,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            model,
            policy,
            retries: AtomicU32::new(0),
        }
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    /// Total retries performed across all chunks of this run.
    pub fn retries_used(&self) -> u32 {
        self.retries.load(Ordering::Relaxed)
    }

    fn classify(status: u16) -> Option<ErrorClass> {
        match status {
            200..=299 => None,
            401 | 403 => Some(ErrorClass::Auth),
            408 | 429 => Some(ErrorClass::Transient),
            400..=499 => Some(ErrorClass::Payload),
            _ => Some(ErrorClass::Transient),
        }
    }

    fn error_for(class: ErrorClass, status: u16, body: &str) -> TranscribeError {
        let detail = format!("HTTP {status}: {}", body.chars().take(200).collect::<String>());
        match class {
            ErrorClass::Auth => TranscribeError::ProviderAuth(detail),
            ErrorClass::Payload => TranscribeError::ProviderPayload(detail),
            ErrorClass::Transient => TranscribeError::ProviderTransient(detail),
        }
    }

    fn parse_response(
        body: &str,
        chunk: &AudioSource,
        options: &TranscribeOptions,
    ) -> Result<Vec<Segment>, TranscribeError> {
        let parsed: TranscriptionBody = serde_json::from_str(body)
            .map_err(|e| TranscribeError::ProviderPayload(format!("unparseable response: {e}")))?;

        let segments: Vec<Segment> = match (&parsed.segments, options.granularity) {
            (Some(segs), TimestampGranularity::Segment) => segs
                .iter()
                .filter(|s| !s.text.trim().is_empty())
                .map(|s| Segment::new(s.start, s.end, s.text.trim()))
                .collect(),
            // Plain-text responses become one chunk-spanning segment so
            // timing metadata survives even without granular stamps.
            _ => {
                if parsed.text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![Segment::new(0.0, chunk.duration_s, parsed.text.trim())]
                }
            }
        };

        Ok(segments)
    }
}

#[async_trait]
impl TranscriptionProvider for RemoteApiProvider {
    fn name(&self) -> &'static str {
        "remote-api"
    }

    fn envelope(&self) -> ProviderEnvelope {
        ProviderEnvelope {
            max_duration_s: Some(MAX_DURATION_S),
            max_size_bytes: Some(MAX_SIZE_BYTES),
            supports_timestamps: true,
        }
    }

    async fn transcribe(
        &self,
        chunk: &AudioSource,
        options: &TranscribeOptions,
    ) -> Result<Vec<Segment>, TranscribeError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let outcome = self.transport.post_audio(chunk, options, &self.model).await;
            let (class, error) = match outcome {
                Ok(response) => match Self::classify(response.status) {
                    None => return Self::parse_response(&response.body, chunk, options),
                    Some(class) => (
                        class,
                        Self::error_for(class, response.status, &response.body),
                    ),
                },
                Err(e) if e.is_transient() => (ErrorClass::Transient, e),
                Err(e) => return Err(e),
            };

            match self.policy.decide(attempt, class) {
                RetryDecision::RetryAfter(delay) => {
                    self.retries.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        "attempt {attempt} against remote API failed ({error}), retrying in {:.1}s",
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Abort => return Err(error),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionBody {
    #[serde(default)]
    text: String,
    segments: Option<Vec<BodySegment>>,
}

#[derive(Debug, Deserialize)]
struct BodySegment {
    start: f64,
    end: f64,
    text: String,
}
