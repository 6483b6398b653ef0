//! Local ASR via a whisper-style CLI subprocess.
//!
//! Each transcription runs in an isolated process; the binary prints a JSON
//! document to stdout. Model files are resolved from the model directory
//! according to the selected profile.

use crate::backends::{AsrBackend, AsrOptions, AsrOutput};
use crate::error::{CoreError, Result};
use crate::subprocess;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tablescribe_types::{TimedSegment, WordSpan};
use tokio::process::Command;

/// JSON document printed by the transcription binary.
#[derive(Debug, Deserialize)]
struct CliTranscription {
    #[serde(default)]
    segments: Vec<CliSegment>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    words: Vec<CliWord>,
}

#[derive(Debug, Deserialize)]
struct CliWord {
    start: f64,
    end: f64,
    word: String,
}

pub struct WhisperCliBackend {
    binary: PathBuf,
    model_dir: PathBuf,
}

impl WhisperCliBackend {
    pub fn new(binary: impl Into<PathBuf>, model_dir: impl Into<PathBuf>) -> Result<Self> {
        let binary = binary.into();
        if !binary.exists() {
            return Err(CoreError::model_load(format!(
                "transcription binary not found at {binary:?}"
            )));
        }
        tracing::info!("whisper-cli: using binary at {:?}", binary);
        Ok(Self {
            binary,
            model_dir: model_dir.into(),
        })
    }

    /// Check whether the engine can be constructed.
    pub fn is_available(binary: &Path) -> bool {
        binary.exists()
    }

    fn model_path(&self, options: &AsrOptions) -> Result<PathBuf> {
        let path = self
            .model_dir
            .join(format!("ggml-{}.bin", options.profile.model_name()));
        if path.exists() {
            Ok(path)
        } else {
            Err(CoreError::model_load(format!(
                "model file not found at {path:?}"
            )))
        }
    }
}

#[async_trait]
impl AsrBackend for WhisperCliBackend {
    fn name(&self) -> &str {
        "whisper-cli"
    }

    async fn transcribe(&self, audio: &Path, options: &AsrOptions) -> Result<AsrOutput> {
        let model = self.model_path(options)?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--model")
            .arg(&model)
            .arg("--file")
            .arg(audio)
            .arg("--output-json");
        if options.word_timestamps {
            cmd.arg("--word-timestamps");
        }
        if let Some(language) = &options.language {
            cmd.args(["--language", language]);
        }

        let stdout = subprocess::run("whisper-cli", &mut cmd).await?;
        let parsed: CliTranscription = serde_json::from_slice(&stdout).map_err(|e| {
            CoreError::backend(format!("whisper-cli produced unparseable output: {e}"))
        })?;

        if let Some(error) = parsed.error {
            return Err(CoreError::backend(format!("whisper-cli error: {error}")));
        }

        Ok(convert(parsed))
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

fn convert(parsed: CliTranscription) -> AsrOutput {
    let segments: Vec<TimedSegment> = parsed
        .segments
        .into_iter()
        .map(|s| TimedSegment {
            start_ms: secs_to_ms(s.start),
            end_ms: secs_to_ms(s.end),
            text: s.text.trim().to_string(),
            speaker: None,
            words: s
                .words
                .into_iter()
                .map(|w| WordSpan {
                    start_ms: secs_to_ms(w.start),
                    end_ms: secs_to_ms(w.end),
                    text: w.word,
                })
                .collect(),
        })
        .collect();

    let text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    AsrOutput { text, segments }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_a_model_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = WhisperCliBackend::new(dir.path().join("absent"), dir.path());
        assert!(matches!(result, Err(CoreError::ModelLoad { .. })));
    }

    #[test]
    fn cli_output_converts_with_words() {
        let raw = r#"{
            "segments": [
                {"start": 0.0, "end": 1.5, "text": " hello there ",
                 "words": [{"start": 0.0, "end": 0.7, "word": "hello"},
                           {"start": 0.7, "end": 1.5, "word": "there"}]},
                {"start": 1.5, "end": 2.0, "text": "friend"}
            ]
        }"#;
        let parsed: CliTranscription = serde_json::from_str(raw).unwrap();
        let output = convert(parsed);

        assert_eq!(output.text, "hello there friend");
        assert_eq!(output.segments.len(), 2);
        assert_eq!(output.segments[0].words.len(), 2);
        assert_eq!(output.segments[0].words[1].start_ms, 700);
        assert!(output.segments[1].words.is_empty());
    }

    #[test]
    fn error_field_deserializes() {
        let parsed: CliTranscription =
            serde_json::from_str(r#"{"error": "model exploded"}"#).unwrap();
        assert_eq!(parsed.error.as_deref(), Some("model exploded"));
    }
}
