//! Persistence collaborator contract.
//!
//! Campaign storage lives outside the core; this is the narrow seam it is
//! called through, plus a flat-file reference implementation for shells and
//! tests.

use crate::error::Result;
use std::io::Write;
use std::path::PathBuf;

/// Contract for campaign persistence.
pub trait CampaignStore: Send + Sync {
    /// Append one entry to the campaign record.
    fn save(&self, entry: &str) -> Result<()>;

    /// All entries, in the order they were saved.
    fn load(&self) -> Result<Vec<String>>;
}

/// Numbered-line flat file store (`1. entry` per line).
pub struct FlatFileStore {
    path: PathBuf,
}

impl FlatFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CampaignStore for FlatFileStore {
    fn save(&self, entry: &str) -> Result<()> {
        let next = self.load()?.len() + 1;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{next}. {entry}")?;
        Ok(())
    }

    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(strip_ordinal)
            .collect())
    }
}

fn strip_ordinal(line: &str) -> String {
    let trimmed = line.trim_start();
    let after_digits = trimmed.trim_start_matches(|c: char| c.is_ascii_digit());
    if after_digits.len() < trimmed.len() {
        if let Some(rest) = after_digits.strip_prefix(". ") {
            return rest.to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_roundtrips_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().join("campaign.txt"));

        store.save("the party reached the keep").unwrap();
        store.save("a dragon was sighted").unwrap();

        assert_eq!(
            store.load().unwrap(),
            vec![
                "the party reached the keep".to_string(),
                "a dragon was sighted".to_string(),
            ]
        );
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::new(dir.path().join("nothing.txt"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn ordinals_are_stripped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaign.txt");
        std::fs::write(&path, "1. first\n12. twelfth\nno ordinal here\n").unwrap();

        let store = FlatFileStore::new(&path);
        assert_eq!(
            store.load().unwrap(),
            vec![
                "first".to_string(),
                "twelfth".to_string(),
                "no ordinal here".to_string(),
            ]
        );
    }
}
