//! Forced alignment via a subprocess engine.
//!
//! The binary receives the rough segments as JSON on stdin, the audio path
//! as an argument, and prints the refined segments back in the same shape.

use crate::backends::AlignmentBackend;
use crate::error::{CoreError, Result};
use crate::subprocess;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tablescribe_types::TimedSegment;
use tokio::process::Command;

pub struct AlignCliBackend {
    binary: PathBuf,
}

impl AlignCliBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(CoreError::model_load(format!(
                "alignment binary not found at {binary:?}"
            )));
        }
        tracing::info!("align-cli: using binary at {:?}", binary);
        Ok(Self { binary })
    }

    pub fn is_available(binary: &Path) -> bool {
        binary.exists()
    }
}

#[async_trait]
impl AlignmentBackend for AlignCliBackend {
    fn name(&self) -> &str {
        "align-cli"
    }

    async fn align(
        &self,
        segments: Vec<TimedSegment>,
        audio: &Path,
    ) -> Result<Vec<TimedSegment>> {
        if segments.is_empty() {
            return Ok(segments);
        }

        let input = serde_json::to_vec(&segments)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--audio").arg(audio);

        let stdout = subprocess::run_with_stdin("align-cli", &mut cmd, &input).await?;
        let refined: Vec<TimedSegment> = serde_json::from_slice(&stdout)
            .map_err(|e| CoreError::backend(format!("unparseable alignment output: {e}")))?;

        tracing::debug!(
            "align-cli: refined {} segments for {:?}",
            refined.len(),
            audio
        );
        Ok(refined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_a_model_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = AlignCliBackend::new(dir.path().join("absent"));
        assert!(matches!(result, Err(CoreError::ModelLoad { .. })));
    }

    #[test]
    fn segments_roundtrip_the_wire_shape() {
        let segments = vec![TimedSegment {
            start_ms: 100,
            end_ms: 900,
            text: "hello".into(),
            speaker: None,
            words: vec![tablescribe_types::WordSpan {
                start_ms: 100,
                end_ms: 900,
                text: "hello".into(),
            }],
        }];

        let wire = serde_json::to_vec(&segments).unwrap();
        let back: Vec<TimedSegment> = serde_json::from_slice(&wire).unwrap();
        assert_eq!(back, segments);
    }
}
