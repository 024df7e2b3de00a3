//! Append/delete log of past transcripts
//!
//! Newest-first JSON array in the config directory. A malformed blob
//! must never take the app down; it degrades to an empty list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::credential::write_atomic;

const HISTORY_FILE_NAME: &str = "history.json";

/// One completed transcription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Locally generated, unique, time-ordered by creation (order is
    /// maintained by prepending, not by sorting on id).
    pub id: String,
    /// Name of the original input file, not the converted one.
    pub filename: String,
    /// The transcript text.
    pub text: String,
    /// Creation timestamp.
    pub date: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filename: filename.into(),
            text: text.into(),
            date: Utc::now(),
        }
    }
}

pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: config_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE_NAME)
    }

    /// Load all entries, newest first. Missing or corrupt files read as
    /// an empty list.
    pub fn load_all(&self) -> Vec<HistoryEntry> {
        let path = self.path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("History: failed to read {:?}: {}", path, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&contents) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("History: failed to parse {:?}: {}", path, e);
                Vec::new()
            }
        }
    }

    /// Prepend `entry` and persist the full list.
    pub fn append(&self, entry: HistoryEntry) -> Result<(), String> {
        let mut entries = self.load_all();
        entries.insert(0, entry);
        self.persist(&entries)
    }

    /// Remove the entry with the given id, if present. Order of the
    /// remaining entries is unchanged.
    pub fn remove(&self, id: &str) -> Result<(), String> {
        let mut entries = self.load_all();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            log::debug!("History: remove({}) matched no entry", id);
            return Ok(());
        }
        self.persist(&entries)
    }

    fn persist(&self, entries: &[HistoryEntry]) -> Result<(), String> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
        }
        let contents =
            serde_json::to_string_pretty(entries).map_err(|e| format!("Serialize history: {}", e))?;
        write_atomic(&path, &contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_prepends_newest_first() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.append(HistoryEntry::new("a.mp3", "first")).unwrap();
        store.append(HistoryEntry::new("b.ogg", "second")).unwrap();

        let entries = store.load_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "second");
        assert_eq!(entries[1].text, "first");
    }

    #[test]
    fn remove_deletes_exactly_one_and_keeps_order() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path());

        store.append(HistoryEntry::new("a.mp3", "one")).unwrap();
        store.append(HistoryEntry::new("b.mp3", "two")).unwrap();
        store.append(HistoryEntry::new("c.mp3", "three")).unwrap();

        let middle_id = store.load_all()[1].id.clone();
        store.remove(&middle_id).unwrap();

        let entries = store.load_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "three");
        assert_eq!(entries[1].text, "one");
    }

    #[test]
    fn remove_unknown_id_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        store.append(HistoryEntry::new("a.mp3", "one")).unwrap();
        store.remove("no-such-id").unwrap();
        assert_eq!(store.load_all().len(), 1);
    }

    #[test]
    fn round_trip_preserves_order_and_content() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        for i in 0..5 {
            store
                .append(HistoryEntry::new(format!("f{}.mp3", i), format!("t{}", i)))
                .unwrap();
        }
        let first = store.load_all();
        let second = HistoryStore::new(dir.path()).load_all();
        assert_eq!(first, second);
    }

    #[test]
    fn corrupt_blob_reads_as_empty_without_panicking() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(HISTORY_FILE_NAME), "{not valid json").unwrap();
        let store = HistoryStore::new(dir.path());
        assert!(store.load_all().is_empty());
    }

    #[test]
    fn entry_ids_are_unique() {
        let a = HistoryEntry::new("a", "x");
        let b = HistoryEntry::new("a", "x");
        assert_ne!(a.id, b.id);
    }
}
