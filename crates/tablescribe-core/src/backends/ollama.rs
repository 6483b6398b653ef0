//! Ollama text-generation backend.
//!
//! Single-shot chat for summarization, NDJSON streaming for conversational
//! turns. The context-window bound maps onto Ollama's `num_ctx` option.

use crate::backends::{GenerationOptions, StreamEvent, TextGenBackend};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tablescribe_types::ChatMessage;
use tokio::sync::mpsc;

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Ollama connection configuration.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    stream: bool,
    /// Disable thinking mode for models that support it
    think: bool,
    options: WireOptions,
}

#[derive(Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct WireOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_ctx: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<WireResponseMessage>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

/// One NDJSON line of a streaming chat response.
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    message: Option<WireResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

fn to_wire(messages: &[ChatMessage]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        })
        .collect()
}

// ============================================================================
// Backend
// ============================================================================

pub struct OllamaBackend {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::model_load(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(OllamaConfig::default())
    }

    /// Check whether the Ollama server is reachable.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.url);
        self.client.get(&url).send().await.is_ok()
    }

    fn request(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
        stream: bool,
    ) -> ChatRequest {
        ChatRequest {
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: to_wire(messages),
            stream,
            think: false,
            options: WireOptions {
                temperature: options.temperature.unwrap_or(self.config.temperature),
                num_predict: options.max_tokens.unwrap_or(self.config.max_tokens),
                num_ctx: options.context_size.map(|c| c.get()),
            },
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.url)
    }
}

#[async_trait]
impl TextGenBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String> {
        let request = self.request(messages, options, false);

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::generation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::generation(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CoreError::generation(format!("unparseable response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(CoreError::generation(error));
        }

        Ok(parsed
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default())
    }

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let request = self.request(messages, options, true);

        let response = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| CoreError::generation(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::generation(format!(
                "Ollama API error {status}: {body}"
            )));
        }

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Failed(e.to_string())).await;
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    if forward_line(&tx, &line).await.is_break() {
                        return;
                    }
                }
            }

            // Flush any final line that arrived without a trailing newline
            if !buffer.is_empty() && forward_line(&tx, &buffer).await.is_break() {
                return;
            }

            let _ = tx
                .send(StreamEvent::Failed(
                    "stream ended without completion signal".to_string(),
                ))
                .await;
        });

        Ok(rx)
    }
}

/// Parse one NDJSON line and forward the resulting events.
///
/// Returns `Break` once a terminal event (`Done`/`Failed`) was sent or the
/// receiver is gone.
async fn forward_line(
    tx: &mpsc::Sender<StreamEvent>,
    line: &[u8],
) -> std::ops::ControlFlow<()> {
    use std::ops::ControlFlow;

    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return ControlFlow::Continue(());
    }

    let chunk: StreamChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(e) => {
            let _ = tx
                .send(StreamEvent::Failed(format!("unparseable stream chunk: {e}")))
                .await;
            return ControlFlow::Break(());
        }
    };

    if let Some(error) = chunk.error {
        let _ = tx.send(StreamEvent::Failed(error)).await;
        return ControlFlow::Break(());
    }

    if let Some(message) = chunk.message {
        if !message.content.is_empty()
            && tx
                .send(StreamEvent::Delta(message.content))
                .await
                .is_err()
        {
            return ControlFlow::Break(());
        }
    }

    if chunk.done {
        let _ = tx.send(StreamEvent::Done).await;
        return ControlFlow::Break(());
    }

    ControlFlow::Continue(())
}
