//! Remote ASR over an OpenAI-compatible transcription API.
//!
//! POSTs each segment file as multipart form data to a user-configured
//! endpoint (e.g. `https://api.openai.com/v1/audio/transcriptions`) and
//! reads back the verbose JSON response.

use crate::backends::{AsrBackend, AsrOptions, AsrOutput};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tablescribe_types::{TimedSegment, WordSpan};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";
/// Segment uploads can be large; give slow links room.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for the remote transcription API.
#[derive(Debug, Clone)]
pub struct RemoteAsrConfig {
    /// Full endpoint URL
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for RemoteAsrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

/// Verbose JSON transcription response.
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    segments: Vec<ResponseSegment>,
    #[serde(default)]
    words: Vec<ResponseWord>,
}

#[derive(Debug, Deserialize)]
struct ResponseSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResponseWord {
    start: f64,
    end: f64,
    word: String,
}

pub struct RemoteAsrBackend {
    config: RwLock<RemoteAsrConfig>,
    client: reqwest::Client,
}

impl RemoteAsrBackend {
    pub fn new(config: RemoteAsrConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::model_load(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            config: RwLock::new(config),
            client,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(RemoteAsrConfig::default())
    }

    pub fn set_api_key(&self, api_key: Option<String>) {
        self.config.write().api_key = api_key;
    }
}

#[async_trait]
impl AsrBackend for RemoteAsrBackend {
    fn name(&self) -> &str {
        "remote-asr"
    }

    async fn transcribe(&self, audio: &Path, options: &AsrOptions) -> Result<AsrOutput> {
        let (endpoint, model, api_key) = {
            let config = self.config.read();
            (
                config.endpoint.clone(),
                config.model.clone(),
                config.api_key.clone(),
            )
        };

        let bytes = std::fs::read(audio)?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", model)
            .text("response_format", "verbose_json");
        if options.word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }

        let mut request = self.client.post(&endpoint).multipart(form);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        tracing::debug!("remote-asr: uploading {:?} to {}", audio, endpoint);
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::backend(format!(
                "transcription API error {status}: {body}"
            )));
        }

        let parsed: TranscriptionResponse = response.json().await?;
        Ok(convert(parsed))
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

/// Map the wire response onto timed segments, folding flat word timestamps
/// into the segment containing each word's start.
fn convert(parsed: TranscriptionResponse) -> AsrOutput {
    let mut segments: Vec<TimedSegment> = parsed
        .segments
        .into_iter()
        .map(|s| TimedSegment {
            start_ms: secs_to_ms(s.start),
            end_ms: secs_to_ms(s.end),
            text: s.text.trim().to_string(),
            speaker: None,
            words: Vec::new(),
        })
        .collect();

    for word in parsed.words {
        let start_ms = secs_to_ms(word.start);
        let span = WordSpan {
            start_ms,
            end_ms: secs_to_ms(word.end),
            text: word.word,
        };
        match segments
            .iter_mut()
            .find(|s| s.start_ms <= start_ms && start_ms < s.end_ms)
        {
            Some(segment) => segment.words.push(span),
            None => {
                if let Some(last) = segments.last_mut() {
                    last.words.push(span);
                }
            }
        }
    }

    AsrOutput {
        text: parsed.text.trim().to_string(),
        segments,
    }
}
