//! Scriptable mock backends.
//!
//! Shipped in the crate (not behind `cfg(test)`) so downstream shells can
//! exercise the orchestration paths without real models. Responses are keyed
//! by the audio file stem; a FIFO queue serves as fallback for generated
//! slice files.

use crate::backends::{
    AlignmentBackend, AsrBackend, AsrOptions, AsrOutput, DiarizationBackend, GenerationOptions,
    StreamEvent, TextGenBackend,
};
use crate::error::{CoreError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tablescribe_types::{ChatMessage, ChatRole, SpeakerSpan, TimedSegment};
use tokio::sync::mpsc;

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

// ============================================================================
// ASR
// ============================================================================

#[derive(Debug, Clone, Default)]
struct ScriptedAsr {
    text: String,
    segments: Vec<TimedSegment>,
    delay_ms: u64,
    fail: bool,
}

/// Mock speech-to-text backend.
#[derive(Default)]
pub struct MockAsr {
    scripts: Mutex<HashMap<String, ScriptedAsr>>,
    queue: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<String>>,
}

impl MockAsr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `text` for the file whose stem is `stem`.
    pub fn with_text(self, stem: &str, text: &str) -> Self {
        self.scripts.lock().entry(stem.to_string()).or_default().text = text.to_string();
        self
    }

    /// Respond with timestamped segments for `stem`.
    pub fn with_segments(self, stem: &str, segments: Vec<TimedSegment>) -> Self {
        let mut scripts = self.scripts.lock();
        let entry = scripts.entry(stem.to_string()).or_default();
        entry.text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        entry.segments = segments;
        drop(scripts);
        self
    }

    /// Delay the response for `stem`, for completion-order tests.
    pub fn with_delay_ms(self, stem: &str, delay_ms: u64) -> Self {
        self.scripts
            .lock()
            .entry(stem.to_string())
            .or_default()
            .delay_ms = delay_ms;
        self
    }

    /// Fail the call for `stem`.
    pub fn with_failure(self, stem: &str) -> Self {
        self.scripts.lock().entry(stem.to_string()).or_default().fail = true;
        self
    }

    /// Queue a response served (FIFO) to any stem without a script.
    pub fn with_queued_text(self, text: &str) -> Self {
        self.queue.lock().push_back(text.to_string());
        self
    }

    /// Stems of every transcribe call, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AsrBackend for MockAsr {
    fn name(&self) -> &str {
        "mock-asr"
    }

    async fn transcribe(&self, audio: &Path, _options: &AsrOptions) -> Result<AsrOutput> {
        let stem = stem_of(audio);
        self.calls.lock().push(stem.clone());

        let script = self.scripts.lock().get(&stem).cloned();
        if let Some(script) = script {
            if script.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
            }
            if script.fail {
                return Err(CoreError::backend(format!(
                    "scripted transcription failure for {stem}"
                )));
            }
            return Ok(AsrOutput {
                text: script.text,
                segments: script.segments,
            });
        }

        if let Some(text) = self.queue.lock().pop_front() {
            return Ok(AsrOutput::from_text(text));
        }

        Err(CoreError::backend(format!(
            "no scripted response for {stem}"
        )))
    }
}

// ============================================================================
// Diarization
// ============================================================================

/// Mock diarization backend returning a fixed span list.
pub struct MockDiarizer {
    spans: Vec<SpeakerSpan>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockDiarizer {
    pub fn new(spans: Vec<SpeakerSpan>) -> Self {
        Self {
            spans,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            spans: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiarizationBackend for MockDiarizer {
    fn name(&self) -> &str {
        "mock-diarizer"
    }

    async fn diarize(&self, _audio: &Path) -> Result<Vec<SpeakerSpan>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CoreError::diarization_unavailable(
                "scripted diarization failure",
            ));
        }
        Ok(self.spans.clone())
    }
}

// ============================================================================
// Alignment
// ============================================================================

/// Mock alignment backend; identity unless given refined output.
#[derive(Default)]
pub struct MockAligner {
    refined: Option<Vec<TimedSegment>>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockAligner {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_refined(refined: Vec<TimedSegment>) -> Self {
        Self {
            refined: Some(refined),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlignmentBackend for MockAligner {
    fn name(&self) -> &str {
        "mock-aligner"
    }

    async fn align(
        &self,
        segments: Vec<TimedSegment>,
        _audio: &Path,
    ) -> Result<Vec<TimedSegment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CoreError::backend("scripted alignment failure"));
        }
        Ok(self.refined.clone().unwrap_or(segments))
    }
}

// ============================================================================
// Text Generation
// ============================================================================

/// Mock text-generation backend.
///
/// In echo mode, `generate` wraps the last user message as `tag[content]`,
/// which keeps reducer outputs deterministic and inspectable. Queued
/// responses and stream scripts take precedence when present.
pub struct MockTextGen {
    tag: String,
    responses: Mutex<VecDeque<String>>,
    stream_scripts: Mutex<VecDeque<Vec<StreamEvent>>>,
    fail: bool,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockTextGen {
    pub fn echoing(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            responses: Mutex::new(VecDeque::new()),
            stream_scripts: Mutex::new(VecDeque::new()),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let mut mock = Self::echoing("S");
        mock.fail = true;
        mock
    }

    pub fn with_response(self, text: &str) -> Self {
        self.responses.lock().push_back(text.to_string());
        self
    }

    pub fn with_stream(self, events: Vec<StreamEvent>) -> Self {
        self.stream_scripts.lock().push_back(events);
        self
    }

    /// Message lists from every call, in invocation order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    fn echo(&self, messages: &[ChatMessage]) -> String {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        format!("{}[{}]", self.tag, last_user)
    }
}

#[async_trait]
impl TextGenBackend for MockTextGen {
    fn name(&self) -> &str {
        "mock-textgen"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<String> {
        self.calls.lock().push(messages.to_vec());
        if self.fail {
            return Err(CoreError::generation("scripted generation failure"));
        }
        if let Some(text) = self.responses.lock().pop_front() {
            return Ok(text);
        }
        Ok(self.echo(messages))
    }

    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        self.calls.lock().push(messages.to_vec());
        if self.fail {
            return Err(CoreError::generation("scripted generation failure"));
        }

        let events = match self.stream_scripts.lock().pop_front() {
            Some(events) => events,
            None => {
                let text = match self.responses.lock().pop_front() {
                    Some(text) => text,
                    None => self.echo(messages),
                };
                vec![StreamEvent::Delta(text), StreamEvent::Done]
            }
        };

        let (tx, rx) = mpsc::channel(events.len().max(1));
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn asr_serves_scripted_and_queued_responses() {
        let asr = MockAsr::new()
            .with_text("a", "alpha")
            .with_queued_text("queued");

        let out = asr
            .transcribe(Path::new("/tmp/a.wav"), &AsrOptions::default())
            .await
            .unwrap();
        assert_eq!(out.text, "alpha");

        let out = asr
            .transcribe(Path::new("/tmp/other.wav"), &AsrOptions::default())
            .await
            .unwrap();
        assert_eq!(out.text, "queued");

        assert!(asr
            .transcribe(Path::new("/tmp/empty.wav"), &AsrOptions::default())
            .await
            .is_err());
        assert_eq!(asr.calls(), vec!["a", "other", "empty"]);
    }

    #[tokio::test]
    async fn textgen_echoes_last_user_message() {
        let gen = MockTextGen::echoing("S");
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: "hello".into(),
            sequence: 0,
        }];
        let out = gen
            .generate(&messages, &GenerationOptions::default())
            .await
            .unwrap();
        assert_eq!(out, "S[hello]");
    }

    #[tokio::test]
    async fn textgen_stream_defaults_to_delta_then_done() {
        let gen = MockTextGen::echoing("S").with_response("answer");
        let mut rx = gen
            .generate_stream(&[], &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(StreamEvent::Delta("answer".into())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Done));
        assert_eq!(rx.recv().await, None);
    }
}
