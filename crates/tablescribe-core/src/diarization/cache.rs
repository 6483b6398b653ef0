//! On-disk cache of diarization spans.
//!
//! Entries are keyed by the SHA-256 of the audio file contents: a renamed
//! file keeps its entry, edited audio invalidates it. A present but
//! unreadable entry is deleted and the attempt fails; the cache never
//! silently recomputes under a different key.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tablescribe_types::SpeakerSpan;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    key: String,
    created_at: DateTime<Utc>,
    spans: Vec<SpeakerSpan>,
}

/// Sidecar JSON store for diarization spans.
pub struct DiarizationCache {
    dir: PathBuf,
}

impl DiarizationCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache under the platform-local data directory.
    pub fn with_default_dir() -> Result<Self> {
        let dir = dirs::data_local_dir()
            .map(|d| d.join("tablescribe").join("diarization"))
            .ok_or_else(|| CoreError::Config {
                message: "no local data directory available for the diarization cache"
                    .to_string(),
            })?;
        Ok(Self::new(dir))
    }

    /// Content-identity key for an audio file (lowercase SHA-256 hex).
    pub fn content_key(audio: &Path) -> Result<String> {
        let mut file = std::fs::File::open(audio)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher)?;
        let digest = hasher.finalize();
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Load the spans cached for `key`.
    ///
    /// Returns `Ok(None)` on a miss. A present entry that cannot be read
    /// back is deleted and the call fails with `DiarizationUnavailable`.
    pub fn load(&self, key: &str) -> Result<Option<Vec<SpeakerSpan>>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<CacheEntry>(&raw).map_err(|e| e.to_string()))
            .and_then(|entry| {
                if entry.key == key {
                    Ok(entry)
                } else {
                    Err(format!("entry key mismatch: {}", entry.key))
                }
            });

        match parsed {
            Ok(entry) => Ok(Some(entry.spans)),
            Err(message) => {
                tracing::warn!("diarization cache: dropping stale entry {path:?}: {message}");
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!("diarization cache: failed to delete {path:?}: {e}");
                }
                Err(CoreError::diarization_unavailable(format!(
                    "cache entry for {key} was unreadable and has been dropped"
                )))
            }
        }
    }

    /// Persist spans for `key` (atomic tmp-then-rename write).
    pub fn save(&self, key: &str, spans: &[SpeakerSpan]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let entry = CacheEntry {
            key: key.to_string(),
            created_at: Utc::now(),
            spans: spans.to_vec(),
        };

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&entry)?)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!("diarization cache: saved {} spans for {key}", spans.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_spans() -> Vec<SpeakerSpan> {
        vec![
            SpeakerSpan {
                speaker: "Speaker 0".into(),
                start_secs: 0.0,
                end_secs: 4.2,
            },
            SpeakerSpan {
                speaker: "Speaker 1".into(),
                start_secs: 4.2,
                end_secs: 9.87,
            },
        ]
    }

    #[test]
    fn save_then_load_roundtrips_spans() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiarizationCache::new(dir.path());
        let spans = make_spans();

        cache.save("abc123", &spans).unwrap();
        let loaded = cache.load("abc123").unwrap();

        assert_eq!(loaded, Some(spans));
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiarizationCache::new(dir.path());
        assert_eq!(cache.load("nothing").unwrap(), None);
    }

    #[test]
    fn corrupt_entry_is_deleted_and_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiarizationCache::new(dir.path());
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let err = cache.load("bad").unwrap_err();
        assert!(matches!(err, CoreError::DiarizationUnavailable { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn mismatched_key_counts_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiarizationCache::new(dir.path());
        cache.save("original", &make_spans()).unwrap();
        std::fs::rename(
            dir.path().join("original.json"),
            dir.path().join("renamed.json"),
        )
        .unwrap();

        assert!(cache.load("renamed").is_err());
        assert!(!dir.path().join("renamed.json").exists());
    }

    #[test]
    fn content_key_tracks_contents_not_names() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();

        let key_a = DiarizationCache::content_key(&a).unwrap();
        let key_b = DiarizationCache::content_key(&b).unwrap();
        assert_eq!(key_a, key_b);

        std::fs::write(&b, b"different bytes").unwrap();
        let key_b2 = DiarizationCache::content_key(&b).unwrap();
        assert_ne!(key_a, key_b2);
        assert_eq!(key_a.len(), 64);
    }
}
