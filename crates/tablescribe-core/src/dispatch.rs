//! Concurrent dispatch of segments to a transcription backend.
//!
//! Workers run in a bounded pool and emit `(segment, result)` messages over
//! a channel to a single ordering/aggregation stage, so assembly order never
//! depends on completion order. A failed segment is logged and skipped; the
//! batch itself never aborts.

use crate::backends::{AsrBackend, AsrOptions};
use crate::error::{CoreError, Result};
use std::sync::Arc;
use tablescribe_types::{DispatchSettings, Segment, TranscriptionUnit};
use tokio::sync::{mpsc, Semaphore};

pub struct ConcurrentDispatcher {
    backend: Arc<dyn AsrBackend>,
    settings: DispatchSettings,
}

impl ConcurrentDispatcher {
    pub fn new(backend: Arc<dyn AsrBackend>, settings: DispatchSettings) -> Result<Self> {
        if settings.worker_count == 0 {
            return Err(CoreError::Config {
                message: "dispatch worker count must be at least 1".to_string(),
            });
        }
        Ok(Self { backend, settings })
    }

    /// Transcribe every segment concurrently and return units sorted by
    /// ascending index. Failed segments come back as `Failed` units.
    pub async fn dispatch(
        &self,
        segments: Vec<Segment>,
        options: &AsrOptions,
    ) -> Vec<TranscriptionUnit> {
        if segments.is_empty() {
            return Vec::new();
        }

        let expected = segments.len();
        let (tx, mut rx) = mpsc::channel(expected);
        let permits = Arc::new(Semaphore::new(self.settings.worker_count));

        tracing::info!(
            "dispatch: {} segments across {} workers via {}",
            expected,
            self.settings.worker_count,
            self.backend.name()
        );

        for segment in segments {
            let tx = tx.clone();
            let permits = Arc::clone(&permits);
            let backend = Arc::clone(&self.backend);
            let options = options.clone();
            tokio::spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    // Semaphore is never closed while workers exist
                    Err(_) => return,
                };
                let result = backend.transcribe(&segment.path, &options).await;
                let _ = tx.send((segment, result)).await;
            });
        }
        drop(tx);

        // Single ordering/aggregation stage: the channel closing is the
        // join barrier.
        let mut units = Vec::with_capacity(expected);
        while let Some((segment, result)) = rx.recv().await {
            match result {
                Ok(output) => {
                    tracing::debug!(
                        "dispatch: segment {} finished ({} chars)",
                        segment.index,
                        output.text.len()
                    );
                    units.push(TranscriptionUnit::success(
                        segment.index,
                        segment.start_ms,
                        None,
                        output.text,
                    ));
                }
                Err(e) => {
                    let err = CoreError::SegmentTranscription {
                        index: segment.index,
                        message: e.to_string(),
                    };
                    tracing::warn!("dispatch: {err}; segment omitted from transcript");
                    units.push(TranscriptionUnit::failed(segment.index, segment.start_ms));
                }
            }
        }

        units.sort_by_key(|u| u.index);
        units
    }

    /// Dispatch and join the successful units' text with the configured
    /// separator.
    pub async fn transcribe_all(&self, segments: Vec<Segment>, options: &AsrOptions) -> String {
        let units = self.dispatch(segments, options).await;
        join_text(&units, &self.settings.separator)
    }
}

/// Ascending-index concatenation of the successful units' text.
pub fn join_text(units: &[TranscriptionUnit], separator: &str) -> String {
    units
        .iter()
        .filter(|u| u.is_success())
        .map(|u| u.text.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
