//! Streaming multi-turn Q&A over a transcript.
//!
//! The manager owns one `ChatSession` bound to a source transcript. `&mut
//! self` on `ask` keeps a single turn in flight per session; callers wanting
//! concurrency must queue outside.

use crate::backends::{GenerationOptions, StreamEvent, TextGenBackend};
use crate::error::Result;
use std::sync::Arc;
use tablescribe_types::{ChatRole, ChatSession, ContextSize};

/// Assistant preamble seeded into every fresh session.
pub const ASSISTANT_PREAMBLE: &str =
    "I'm here to help answer questions about this session.";

/// Returned in place of an answer when generation fails mid-turn.
pub const GENERATION_FAILED_SENTINEL: &str =
    "Something went wrong while generating an answer. Please try again.";

pub struct ConversationManager {
    backend: Arc<dyn TextGenBackend>,
    transcript: String,
    session: ChatSession,
}

impl ConversationManager {
    pub fn new(backend: Arc<dyn TextGenBackend>, transcript: impl Into<String>) -> Self {
        Self {
            backend,
            transcript: transcript.into(),
            session: ChatSession::new(),
        }
    }

    /// Ask a question about the transcript, streaming the answer into the
    /// session as it arrives.
    ///
    /// `context_size` is validated before any session mutation. A generation
    /// failure returns [`GENERATION_FAILED_SENTINEL`] and leaves the session
    /// as it stands: the question (and any partial answer) remain.
    pub async fn ask(&mut self, question: &str, context_size: u32) -> Result<String> {
        let context_size = ContextSize::new(context_size)?;
        self.session.context_size = context_size;

        if self.session.is_unseeded() {
            self.seed();
        }

        self.session.push(ChatRole::User, question);

        let options = GenerationOptions {
            context_size: Some(context_size),
            ..GenerationOptions::default()
        };

        let mut rx = match self
            .backend
            .generate_stream(&self.session.messages, &options)
            .await
        {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!("chat: failed to start generation: {e}");
                return Ok(GENERATION_FAILED_SENTINEL.to_string());
            }
        };

        let mut answer = String::new();
        let mut answer_seq: Option<u64> = None;

        loop {
            match rx.recv().await {
                Some(StreamEvent::Delta(fragment)) => {
                    answer.push_str(&fragment);
                    match answer_seq {
                        Some(seq) => {
                            if let Some(message) =
                                self.session.messages.iter_mut().find(|m| m.sequence == seq)
                            {
                                message.content.push_str(&fragment);
                            }
                        }
                        None => {
                            let message = self.session.push(ChatRole::Assistant, fragment);
                            answer_seq = Some(message.sequence);
                        }
                    }
                }
                Some(StreamEvent::Done) => {
                    tracing::debug!("chat: answer complete ({} chars)", answer.len());
                    return Ok(answer);
                }
                Some(StreamEvent::Failed(message)) => {
                    tracing::warn!("chat: generation failed mid-stream: {message}");
                    return Ok(GENERATION_FAILED_SENTINEL.to_string());
                }
                // Stream ended without an explicit completion signal
                None => {
                    tracing::warn!("chat: stream closed without completion signal");
                    return Ok(GENERATION_FAILED_SENTINEL.to_string());
                }
            }
        }
    }

    /// Discard the whole session: messages emptied, state back to unseeded.
    pub fn clear(&mut self) {
        self.session.reset();
        tracing::info!("chat: session cleared");
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Messages for the persistence collaborator to export.
    pub fn export_messages(&self) -> &[tablescribe_types::ChatMessage] {
        &self.session.messages
    }

    fn seed(&mut self) {
        self.session.push(ChatRole::Assistant, ASSISTANT_PREAMBLE);
        self.session.push(
            ChatRole::System,
            format!(
                "The following is the transcript of the recorded session:\n\n{}",
                self.transcript
            ),
        );
        self.session.state = tablescribe_types::SessionState::Active;
    }
}
