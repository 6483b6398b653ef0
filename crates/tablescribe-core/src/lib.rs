//! Transcription & analysis orchestration core for tablescribe
//!
//! Splits long multi-speaker recordings, dispatches segments to opaque
//! transcription backends, overlays speaker diarization, and drives
//! summarization and transcript Q&A. Model inference itself always lives
//! behind the backend contracts in [`backends`].

pub mod audio;
pub mod backends;
pub mod chat;
pub mod diarization;
pub mod dispatch;
pub mod error;
pub mod hardware;
pub mod store;
mod subprocess;
pub mod summary;
pub mod transcript;

pub use audio::{AudioSegmenter, SUPPORTED_EXTENSIONS};
pub use backends::{
    AlignmentBackend, AsrBackend, AsrOptions, AsrOutput, DiarizationBackend, GenerationOptions,
    StreamEvent, TextGenBackend,
};
pub use chat::{ConversationManager, GENERATION_FAILED_SENTINEL};
pub use diarization::{DiarizationCache, DiarizationPipeline, SpeakerAligner};
pub use dispatch::ConcurrentDispatcher;
pub use error::{CoreError, Result};
pub use hardware::{Acceleration, ModelProfile};
pub use store::{CampaignStore, FlatFileStore};
pub use summary::SummaryReducer;
pub use transcript::assemble;
