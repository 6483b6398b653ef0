//! End-to-end walk through the orchestration core with mock backends.
//!
//! Run with: cargo run --example session_flow

use std::path::PathBuf;
use std::sync::Arc;
use tablescribe_core::backends::mock::{MockAsr, MockTextGen};
use tablescribe_core::backends::AsrOptions;
use tablescribe_core::{transcript, ConcurrentDispatcher, ConversationManager, SummaryReducer};
use tablescribe_types::{DispatchSettings, Segment, SummarySettings, TranscriptionUnit};

#[tokio::main]
async fn main() -> Result<(), tablescribe_core::CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Segments as the segmenter would produce them for a 25-minute recording
    let segments: Vec<Segment> = (0..3)
        .map(|index| Segment {
            index,
            start_ms: index as u64 * 500_000,
            end_ms: (index as u64 + 1) * 500_000,
            path: PathBuf::from(format!("session_{index:03}.m4a")),
        })
        .collect();

    let asr = MockAsr::new()
        .with_text("session_000", "The party gathers at the tavern.")
        .with_text("session_001", "A stranger offers them a map.")
        .with_text("session_002", "They set off at dawn.");

    let dispatcher =
        ConcurrentDispatcher::new(Arc::new(asr), DispatchSettings::default())?;
    let units: Vec<TranscriptionUnit> = dispatcher
        .dispatch(segments, &AsrOptions::default())
        .await;
    let transcript_text = transcript::assemble(&units);
    println!("--- transcript ---\n{transcript_text}\n");

    let reducer = SummaryReducer::new(
        Arc::new(MockTextGen::echoing("summary")),
        SummarySettings {
            window_size: 2,
            granularity: 2,
            max_levels: 2,
        },
    )?;
    let summary = reducer.summarize_to_text(&transcript_text).await?;
    println!("--- summary ---\n{summary}\n");

    let mut chat = ConversationManager::new(
        Arc::new(MockTextGen::echoing("answer")),
        transcript_text,
    );
    let answer = chat.ask("Where did the party meet?", 4096).await?;
    println!("--- answer ---\n{answer}");

    Ok(())
}
