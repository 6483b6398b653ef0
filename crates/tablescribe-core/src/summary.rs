//! Hierarchical map-reduce summarization.
//!
//! Transcripts too large for a single generation call are summarized in
//! windows (map), then consolidated level by level (reduce) until one chunk
//! remains or the configured pass limit is reached.

use crate::backends::{GenerationOptions, TextGenBackend};
use crate::error::{CoreError, Result};
use std::sync::Arc;
use tablescribe_types::{ChatMessage, ChatRole, SummaryChunk, SummarySettings, SummaryTree};

/// System prompt for every summarization call.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You are an assistant summarizing the events of a \
tabletop roleplaying session. There may be multiple speakers, one of whom is the game master. \
Where possible, summarize each character's actions. Keep the summary easy to follow and \
capture the essence of the session.";

pub struct SummaryReducer {
    backend: Arc<dyn TextGenBackend>,
    settings: SummarySettings,
}

impl SummaryReducer {
    pub fn new(backend: Arc<dyn TextGenBackend>, settings: SummarySettings) -> Result<Self> {
        if settings.window_size == 0 {
            return Err(CoreError::Config {
                message: "summary window size must be at least 1".to_string(),
            });
        }
        if settings.granularity < 2 {
            return Err(CoreError::Config {
                message: "summary granularity must be at least 2".to_string(),
            });
        }
        Ok(Self { backend, settings })
    }

    /// Summarize a transcript into a tree of progressively smaller levels.
    ///
    /// Terminates when one chunk remains, or after `max_levels` reduce
    /// passes, whichever comes first.
    pub async fn summarize(&self, transcript: &str) -> Result<SummaryTree> {
        let lines: Vec<&str> = transcript.lines().collect();
        let mut tree = SummaryTree::new();
        if lines.is_empty() {
            return Ok(tree);
        }

        // Map: one summary per window of lines
        let mut chunks = Vec::new();
        for (index, window) in lines.chunks(self.settings.window_size).enumerate() {
            let text = self.summarize_text(&window.join("\n")).await?;
            chunks.push(SummaryChunk {
                level: 0,
                index,
                text,
            });
        }
        tracing::info!(
            "reducer: map step produced {} chunks from {} lines",
            chunks.len(),
            lines.len()
        );
        tree.push_level(chunks);

        // Reduce: consolidate consecutive groups until one chunk remains
        let mut level = 0;
        while tree.final_level().len() > 1 && level < self.settings.max_levels {
            level += 1;
            let mut next = Vec::new();
            for (index, group) in tree
                .final_level()
                .chunks(self.settings.granularity)
                .enumerate()
            {
                let combined = group
                    .iter()
                    .map(|c| c.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                let text = self.summarize_text(&combined).await?;
                next.push(SummaryChunk { level, index, text });
            }
            tracing::debug!("reducer: level {} has {} chunks", level, next.len());
            tree.push_level(next);
        }

        Ok(tree)
    }

    /// Summarize and return the final level's concatenated text.
    pub async fn summarize_to_text(&self, transcript: &str) -> Result<String> {
        let tree = self.summarize(transcript).await?;
        Ok(final_text(&tree))
    }

    async fn summarize_text(&self, text: &str) -> Result<String> {
        let messages = [
            ChatMessage {
                role: ChatRole::System,
                content: SUMMARY_SYSTEM_PROMPT.to_string(),
                sequence: 0,
            },
            ChatMessage {
                role: ChatRole::User,
                content: text.to_string(),
                sequence: 1,
            },
        ];
        self.backend
            .generate(&messages, &GenerationOptions::default())
            .await
    }
}

/// In-order concatenation of the terminal level's chunk texts.
pub fn final_text(tree: &SummaryTree) -> String {
    tree.final_level()
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
