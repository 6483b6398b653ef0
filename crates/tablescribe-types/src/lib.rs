//! Shared types for tablescribe
//!
//! This crate contains the data structures shared between the
//! orchestration core and its collaborators (shells, persistence).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Audio Segments
// ============================================================================

/// A bounded time slice of a source recording, the unit of transcription
/// dispatch. Ordered by `index`, which matches ascending `start_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Ordinal position within the source recording
    pub index: usize,
    /// Start offset in milliseconds
    pub start_ms: u64,
    /// End offset in milliseconds
    pub end_ms: u64,
    /// Path to the extracted segment file
    pub path: PathBuf,
}

impl Segment {
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }
}

/// Lifecycle of a transcription unit.
///
/// A unit leaves `Pending` exactly once and is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Pending,
    Success,
    Failed,
}

/// One segment's transcription outcome, carrying the ordering key and an
/// optional speaker label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionUnit {
    pub index: usize,
    pub start_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub text: String,
    pub status: UnitStatus,
}

impl TranscriptionUnit {
    pub fn pending(index: usize, start_ms: u64) -> Self {
        Self {
            index,
            start_ms,
            speaker: None,
            text: String::new(),
            status: UnitStatus::Pending,
        }
    }

    pub fn success(index: usize, start_ms: u64, speaker: Option<String>, text: String) -> Self {
        Self {
            index,
            start_ms,
            speaker,
            text,
            status: UnitStatus::Success,
        }
    }

    pub fn failed(index: usize, start_ms: u64) -> Self {
        Self {
            index,
            start_ms,
            speaker: None,
            text: String::new(),
            status: UnitStatus::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == UnitStatus::Success
    }
}

// ============================================================================
// Diarization & Word Timing
// ============================================================================

/// A diarized span of the audio timeline attributed to one speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerSpan {
    /// Speaker label (e.g., "Speaker 0")
    pub speaker: String,
    /// Start time in seconds
    pub start_secs: f64,
    /// End time in seconds
    pub end_secs: f64,
}

impl SpeakerSpan {
    pub fn duration_secs(&self) -> f64 {
        (self.end_secs - self.start_secs).max(0.0)
    }
}

/// A single word with timing information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordSpan {
    /// Start time in milliseconds
    pub start_ms: u64,
    /// End time in milliseconds
    pub end_ms: u64,
    pub text: String,
}

/// A timestamped stretch of transcribed text, optionally speaker-attributed
/// and optionally carrying word-level timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedSegment {
    /// Start time in milliseconds
    pub start_ms: u64,
    /// End time in milliseconds
    pub end_ms: u64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Word-level timestamps
    #[serde(default)]
    pub words: Vec<WordSpan>,
}

// ============================================================================
// Summarization
// ============================================================================

/// One summarized chunk within a level of the summary tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryChunk {
    /// Tree level: 0 = map output, 1.. = reduce passes
    pub level: usize,
    /// Position within the level
    pub index: usize,
    pub text: String,
}

/// Ordered levels of summary chunks. Chunk count never grows level over
/// level; the terminal level holds one chunk unless the pass limit hit first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTree {
    pub levels: Vec<Vec<SummaryChunk>>,
}

impl SummaryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_level(&mut self, chunks: Vec<SummaryChunk>) {
        self.levels.push(chunks);
    }

    /// Chunks at the terminal level, in order. Empty if nothing was summarized.
    pub fn final_level(&self) -> &[SummaryChunk] {
        self.levels.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

// ============================================================================
// Conversation
// ============================================================================

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One message in a chat session. `sequence` is the append position and
/// strictly increases within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub sequence: u64,
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Unseeded,
    Active,
}

/// An append-only conversation bound to one transcript.
///
/// Created `Unseeded`; seeding happens on the first question and a clear
/// returns it to `Unseeded` with the message list emptied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub messages: Vec<ChatMessage>,
    pub state: SessionState,
    pub context_size: ContextSize,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
            state: SessionState::Unseeded,
            context_size: ContextSize::default(),
        }
    }

    /// Append a message, assigning the next sequence number.
    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) -> &ChatMessage {
        let sequence = self.next_sequence();
        self.messages.push(ChatMessage {
            role,
            content: content.into(),
            sequence,
        });
        self.messages.last().unwrap_or_else(|| unreachable!())
    }

    pub fn next_sequence(&self) -> u64 {
        self.messages.last().map(|m| m.sequence + 1).unwrap_or(0)
    }

    pub fn is_unseeded(&self) -> bool {
        self.state == SessionState::Unseeded
    }

    /// Full reset: all messages dropped, state back to `Unseeded`.
    /// The session id is kept so collaborators can correlate exports.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.state = SessionState::Unseeded;
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated context-window size for a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSize(u32);

impl ContextSize {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 16192;

    pub fn new(value: u32) -> Result<Self, InvalidContextSize> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidContextSize {
                input: value.to_string(),
            })
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ContextSize {
    fn default() -> Self {
        Self(4096)
    }
}

impl FromStr for ContextSize {
    type Err = InvalidContextSize;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map_err(|_| InvalidContextSize {
                input: s.to_string(),
            })
            .and_then(Self::new)
    }
}

/// Rejected context-size input (out of range or not an integer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid context size {input:?}: expected an integer between {} and {}", ContextSize::MIN, ContextSize::MAX)]
pub struct InvalidContextSize {
    pub input: String,
}

// ============================================================================
// Settings
// ============================================================================

/// Settings for the concurrent remote dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSettings {
    /// Maximum number of in-flight transcription requests
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Separator between successive segments' text
    #[serde(default = "default_separator")]
    pub separator: String,
}

fn default_worker_count() -> usize {
    8
}

fn default_separator() -> String {
    " ".to_string()
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            separator: default_separator(),
        }
    }
}

/// Settings for the hierarchical summary reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySettings {
    /// Transcript lines per map-step window
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Chunks consolidated per reduce-step group
    #[serde(default = "default_granularity")]
    pub granularity: usize,
    /// Maximum number of reduce passes
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
}

fn default_window_size() -> usize {
    40
}

fn default_granularity() -> usize {
    4
}

fn default_max_levels() -> usize {
    3
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            granularity: default_granularity(),
            max_levels: default_max_levels(),
        }
    }
}

/// How the local diarization pipeline combines speakers with text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiarizationStrategy {
    /// Diarize first, then transcribe each speaker span independently
    #[default]
    SpanTranscribe,
    /// Transcribe with word timestamps, align, then overlay diarized spans
    WordAlign,
}

/// Settings for the local diarization pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    #[serde(default)]
    pub strategy: DiarizationStrategy,
    /// Span-cache directory; resolved to the platform data dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_size_accepts_bounds() {
        assert!(ContextSize::new(1).is_ok());
        assert!(ContextSize::new(16192).is_ok());
    }

    #[test]
    fn context_size_rejects_out_of_range() {
        assert!(ContextSize::new(0).is_err());
        assert!(ContextSize::new(16193).is_err());
    }

    #[test]
    fn context_size_parses_numeric_input() {
        assert_eq!("4096".parse::<ContextSize>().unwrap().get(), 4096);
        assert_eq!(" 1 ".parse::<ContextSize>().unwrap().get(), 1);
    }

    #[test]
    fn context_size_rejects_non_numeric_input() {
        assert!("".parse::<ContextSize>().is_err());
        assert!("abc".parse::<ContextSize>().is_err());
        assert!("-5".parse::<ContextSize>().is_err());
        assert!("4096.5".parse::<ContextSize>().is_err());
    }

    #[test]
    fn session_assigns_increasing_sequences() {
        let mut session = ChatSession::new();
        session.push(ChatRole::Assistant, "hello");
        session.push(ChatRole::System, "context");
        session.push(ChatRole::User, "question");

        let sequences: Vec<u64> = session.messages.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn session_reset_returns_to_unseeded() {
        let mut session = ChatSession::new();
        let id = session.id.clone();
        session.push(ChatRole::User, "question");
        session.state = SessionState::Active;

        session.reset();

        assert!(session.messages.is_empty());
        assert!(session.is_unseeded());
        assert_eq!(session.id, id);
    }

    #[test]
    fn unit_constructors_set_status() {
        assert_eq!(TranscriptionUnit::pending(0, 0).status, UnitStatus::Pending);
        assert!(TranscriptionUnit::success(1, 500, None, "hi".into()).is_success());
        assert_eq!(TranscriptionUnit::failed(2, 1000).status, UnitStatus::Failed);
    }

    #[test]
    fn summary_tree_final_level() {
        let mut tree = SummaryTree::new();
        assert!(tree.final_level().is_empty());

        tree.push_level(vec![
            SummaryChunk {
                level: 0,
                index: 0,
                text: "a".into(),
            },
            SummaryChunk {
                level: 0,
                index: 1,
                text: "b".into(),
            },
        ]);
        tree.push_level(vec![SummaryChunk {
            level: 1,
            index: 0,
            text: "ab".into(),
        }]);

        assert_eq!(tree.level_count(), 2);
        assert_eq!(tree.final_level().len(), 1);
        assert_eq!(tree.final_level()[0].text, "ab");
    }

    #[test]
    fn speaker_span_roundtrips_through_json() {
        let span = SpeakerSpan {
            speaker: "Speaker 0".into(),
            start_secs: 1.25,
            end_secs: 3.75,
        };
        let json = serde_json::to_string(&span).unwrap();
        let back: SpeakerSpan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, span);
    }

    #[test]
    fn default_settings() {
        let dispatch = DispatchSettings::default();
        assert_eq!(dispatch.worker_count, 8);
        assert_eq!(dispatch.separator, " ");

        let summary = SummarySettings::default();
        assert_eq!(summary.window_size, 40);
        assert_eq!(summary.granularity, 4);
        assert_eq!(summary.max_levels, 3);

        assert_eq!(
            PipelineSettings::default().strategy,
            DiarizationStrategy::SpanTranscribe
        );
    }
}
