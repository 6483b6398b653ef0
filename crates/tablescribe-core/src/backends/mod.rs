//! Backend contracts consumed by the orchestration core
//!
//! Acoustic, diarization, alignment, and text-generation models are opaque
//! backends behind these traits; the core never fixes a wire format of its
//! own. Concrete adapters live in the sibling modules, scriptable mocks in
//! [`mock`].

use crate::error::Result;
use crate::hardware::ModelProfile;
use async_trait::async_trait;
use std::path::Path;
use tablescribe_types::{ChatMessage, ContextSize, SpeakerSpan, TimedSegment};
use tokio::sync::mpsc;

pub mod align_cli;
pub mod diarize_cli;
pub mod mock;
pub mod ollama;
pub mod remote;
pub mod whisper_cli;

pub use align_cli::AlignCliBackend;
pub use diarize_cli::DiarizeCliBackend;
pub use ollama::{OllamaBackend, OllamaConfig};
pub use remote::{RemoteAsrBackend, RemoteAsrConfig};
pub use whisper_cli::WhisperCliBackend;

// ============================================================================
// Options & Outputs
// ============================================================================

/// Options for a transcription request.
#[derive(Debug, Clone, Default)]
pub struct AsrOptions {
    /// Language hint (ISO 639-1 code)
    pub language: Option<String>,
    /// Request word-level timestamps where the backend supports them
    pub word_timestamps: bool,
    /// Model profile chosen from the capability check
    pub profile: ModelProfile,
}

/// Transcription output: full text plus timestamped segments when available.
#[derive(Debug, Clone, Default)]
pub struct AsrOutput {
    pub text: String,
    pub segments: Vec<TimedSegment>,
}

impl AsrOutput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            segments: Vec::new(),
        }
    }
}

/// Options for a text-generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Model override (provider default when unset)
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Context-window bound for this call
    pub context_size: Option<ContextSize>,
}

/// One event in a streaming generation.
///
/// A stream is an ordered sequence of `Delta`s terminated by exactly one
/// `Done` or `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A partial-completion fragment
    Delta(String),
    /// Explicit completion signal
    Done,
    /// The stream ended in an error; no further events follow
    Failed(String),
}

// ============================================================================
// Traits
// ============================================================================

/// Speech-to-text backend, local or remote.
#[async_trait]
pub trait AsrBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, audio: &Path, options: &AsrOptions) -> Result<AsrOutput>;
}

/// Speaker-diarization backend.
#[async_trait]
pub trait DiarizationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Partition the audio timeline into speaker-attributed spans,
    /// ordered by start time.
    async fn diarize(&self, audio: &Path) -> Result<Vec<SpeakerSpan>>;
}

/// Forced-alignment backend refining word-level timestamps.
#[async_trait]
pub trait AlignmentBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn align(
        &self,
        segments: Vec<TimedSegment>,
        audio: &Path,
    ) -> Result<Vec<TimedSegment>>;
}

/// Text-generation backend for summarization and Q&A.
#[async_trait]
pub trait TextGenBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Single-shot completion.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String>;

    /// Streaming completion: an ordered sequence of [`StreamEvent`]s ending
    /// with `Done` or `Failed`.
    async fn generate_stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>>;
}
