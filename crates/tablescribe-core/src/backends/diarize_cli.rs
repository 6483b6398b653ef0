//! Speaker diarization via a subprocess engine.
//!
//! The binary reads one audio file per invocation and prints speaker
//! segments as JSON to stdout. Numeric speaker ids become "Speaker N"
//! labels for the rest of the core.

use crate::backends::DiarizationBackend;
use crate::error::{CoreError, Result};
use crate::subprocess;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tablescribe_types::SpeakerSpan;
use tokio::process::Command;

/// JSON document printed by the diarization binary.
#[derive(Debug, Deserialize)]
struct CliDiarization {
    #[serde(default)]
    segments: Vec<CliSpan>,
    #[serde(default)]
    num_speakers: i32,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliSpan {
    speaker: i32,
    start: f64,
    end: f64,
}

pub struct DiarizeCliBackend {
    binary: PathBuf,
}

impl DiarizeCliBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Result<Self> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(CoreError::model_load(format!(
                "diarization binary not found at {binary:?}"
            )));
        }
        tracing::info!("diarize-cli: using binary at {:?}", binary);
        Ok(Self { binary })
    }

    pub fn is_available(binary: &Path) -> bool {
        binary.exists()
    }
}

#[async_trait]
impl DiarizationBackend for DiarizeCliBackend {
    fn name(&self) -> &str {
        "diarize-cli"
    }

    async fn diarize(&self, audio: &Path) -> Result<Vec<SpeakerSpan>> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--audio").arg(audio);

        let stdout = subprocess::run("diarize-cli", &mut cmd)
            .await
            .map_err(|e| CoreError::diarization_unavailable(e.to_string()))?;

        let parsed: CliDiarization = serde_json::from_slice(&stdout).map_err(|e| {
            CoreError::diarization_unavailable(format!("unparseable diarization output: {e}"))
        })?;

        if let Some(error) = parsed.error {
            return Err(CoreError::diarization_unavailable(error));
        }

        let mut spans = convert(parsed.segments);
        spans.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));

        tracing::info!(
            "diarize-cli: {} spans from {} speakers in {:?}",
            spans.len(),
            parsed.num_speakers,
            audio
        );
        Ok(spans)
    }
}

fn convert(segments: Vec<CliSpan>) -> Vec<SpeakerSpan> {
    segments
        .into_iter()
        .map(|s| SpeakerSpan {
            speaker: format!("Speaker {}", s.speaker),
            start_secs: s.start,
            end_secs: s.end,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_a_model_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = DiarizeCliBackend::new(dir.path().join("absent"));
        assert!(matches!(result, Err(CoreError::ModelLoad { .. })));
    }

    #[test]
    fn numeric_speakers_become_labels() {
        let raw = r#"{
            "segments": [
                {"speaker": 1, "start": 4.0, "end": 9.5},
                {"speaker": 0, "start": 0.0, "end": 4.0}
            ],
            "num_speakers": 2
        }"#;
        let parsed: CliDiarization = serde_json::from_str(raw).unwrap();
        let spans = convert(parsed.segments);

        assert_eq!(spans[0].speaker, "Speaker 1");
        assert_eq!(spans[1].speaker, "Speaker 0");
        assert_eq!(spans[1].start_secs, 0.0);
    }
}
