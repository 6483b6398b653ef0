//! Error types for the orchestration core.

use tablescribe_types::InvalidContextSize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Pre-flight validation
    #[error("unsupported audio format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },

    // Per-unit transcription failure (recoverable: the unit is skipped)
    #[error("transcription failed for segment {index}: {message}")]
    SegmentTranscription { index: usize, message: String },

    // Fatal for the current file/attempt
    #[error("diarization unavailable: {message}")]
    DiarizationUnavailable { message: String },

    // Fatal for the whole operation
    #[error("model load failed: {message}")]
    ModelLoad { message: String },

    // Recoverable per conversational turn
    #[error("generation failed: {message}")]
    Generation { message: String },

    // Input validation, rejected before any call
    #[error(transparent)]
    ContextSizeOutOfRange(#[from] InvalidContextSize),

    // Backend plumbing
    #[error("backend error: {message}")]
    Backend { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        CoreError::Backend {
            message: message.into(),
        }
    }

    pub fn model_load(message: impl Into<String>) -> Self {
        CoreError::ModelLoad {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        CoreError::Generation {
            message: message.into(),
        }
    }

    pub fn diarization_unavailable(message: impl Into<String>) -> Self {
        CoreError::DiarizationUnavailable {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
