//! Source-file segmentation for remote dispatch.
//!
//! Splits a recording into contiguous stream-copied segments named so the
//! ordinal index is recoverable from the filename.

use crate::audio::ffmpeg;
use crate::error::{CoreError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tablescribe_types::Segment;
use tokio::process::Command;

/// Audio container formats accepted by the transcription backends.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "flac", "m4a", "mp3", "mp4", "mpeg", "mpga", "oga", "ogg", "wav", "webm",
];

/// Default maximum segment length in seconds.
pub const DEFAULT_SEGMENT_SECS: u64 = 500;

/// Splits a source file into time-bounded segments.
pub struct AudioSegmenter {
    work_dir: PathBuf,
    max_segment: Duration,
}

impl AudioSegmenter {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            max_segment: Duration::from_secs(DEFAULT_SEGMENT_SECS),
        }
    }

    pub fn with_max_segment(mut self, max_segment: Duration) -> Self {
        self.max_segment = max_segment;
        self
    }

    /// Split `source` into contiguous stream-copied segments.
    ///
    /// Fails fast with `UnsupportedFormat` before any processing; segment
    /// files land in the work directory as `<stem>_NNN.<ext>`.
    pub async fn split(&self, source: &Path) -> Result<Vec<Segment>> {
        let ext = validate_extension(source)?;
        let stem = file_stem(source)?;

        let total_ms = ffmpeg::probe_duration_ms(source).await?;
        std::fs::create_dir_all(&self.work_dir)?;

        let pattern = self.work_dir.join(format!("{stem}_%03d.{ext}"));
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-y")
            .arg("-i")
            .arg(source)
            .args(["-f", "segment", "-segment_time"])
            .arg(self.max_segment.as_secs().to_string())
            .args(["-c", "copy"])
            .arg(&pattern);
        ffmpeg::run("ffmpeg segment", &mut cmd).await?;

        let mut indexed = collect_segment_files(&self.work_dir, &stem, &ext)?;
        indexed.sort_by_key(|(index, _)| *index);

        let segment_ms = self.max_segment.as_millis() as u64;
        let segments: Vec<Segment> = indexed
            .into_iter()
            .map(|(index, path)| {
                let start_ms = index as u64 * segment_ms;
                let end_ms = (start_ms + segment_ms).min(total_ms.max(start_ms));
                Segment {
                    index,
                    start_ms,
                    end_ms,
                    path,
                }
            })
            .collect();

        tracing::info!(
            "segmenter: split {:?} into {} segments of up to {}s",
            source,
            segments.len(),
            self.max_segment.as_secs()
        );
        Ok(segments)
    }
}

/// Check the file extension against the supported set.
pub fn validate_extension(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(CoreError::UnsupportedFormat { extension: ext })
    }
}

pub(crate) fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| CoreError::Config {
            message: format!("source path has no usable file name: {path:?}"),
        })
}

/// Recover the ordinal from a `<stem>_NNN.<ext>` segment filename.
fn parse_segment_index(file_name: &str, stem: &str, ext: &str) -> Option<usize> {
    let digits = file_name
        .strip_prefix(stem)?
        .strip_prefix('_')?
        .strip_suffix(ext)?
        .strip_suffix('.')?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn collect_segment_files(dir: &Path, stem: &str, ext: &str) -> Result<Vec<(usize, PathBuf)>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some(index) = parse_segment_index(name, stem, ext) {
            out.push((index, entry.path()));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_pass_validation() {
        for ext in SUPPORTED_EXTENSIONS {
            let path = PathBuf::from(format!("session.{ext}"));
            assert_eq!(validate_extension(&path).unwrap(), *ext);
        }
    }

    #[test]
    fn validation_is_case_insensitive() {
        assert_eq!(validate_extension(Path::new("a.M4A")).unwrap(), "m4a");
        assert_eq!(validate_extension(Path::new("a.Wav")).unwrap(), "wav");
    }

    #[test]
    fn unsupported_extension_fails_fast() {
        let err = validate_extension(Path::new("notes.txt")).unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedFormat { extension } if extension == "txt"
        ));

        assert!(validate_extension(Path::new("no_extension")).is_err());
    }

    #[test]
    fn segment_index_is_recovered_from_filename() {
        assert_eq!(parse_segment_index("night_000.m4a", "night", "m4a"), Some(0));
        assert_eq!(parse_segment_index("night_042.m4a", "night", "m4a"), Some(42));
        assert_eq!(
            parse_segment_index("night_1234.m4a", "night", "m4a"),
            Some(1234)
        );
    }

    #[test]
    fn foreign_files_are_ignored() {
        assert_eq!(parse_segment_index("night.m4a", "night", "m4a"), None);
        assert_eq!(parse_segment_index("other_000.m4a", "night", "m4a"), None);
        assert_eq!(parse_segment_index("night_000.wav", "night", "m4a"), None);
        assert_eq!(parse_segment_index("night_abc.m4a", "night", "m4a"), None);
        assert_eq!(parse_segment_index("night_.m4a", "night", "m4a"), None);
    }

    #[test]
    fn collect_orders_by_parsed_index() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["s_002.wav", "s_000.wav", "s_001.wav", "unrelated.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let mut found = collect_segment_files(dir.path(), "s", "wav").unwrap();
        found.sort_by_key(|(i, _)| *i);

        let indices: Vec<usize> = found.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
