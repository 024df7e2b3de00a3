//! Persistent storage for the transcription API credential
//!
//! One credential per installation, stored as plaintext JSON in the
//! config directory. Browser-local threat model: the key protects a
//! metered API, not user data, so OS file permissions are considered
//! enough.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CREDENTIAL_FILE_NAME: &str = "credential.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    api_key: String,
}

/// Outcome of a save attempt, surfaced as a status message by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Non-empty key persisted.
    Saved,
    /// Input was empty after trimming; any stored key was deleted.
    EmptyInput,
}

pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: config_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIAL_FILE_NAME)
    }

    /// Load the stored credential. Absent, unreadable, or
    /// empty/whitespace-only values all read as `None`.
    pub fn load(&self) -> Option<String> {
        let path = self.path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Credential: failed to read {:?}: {}", path, e);
                return None;
            }
        };

        match serde_json::from_str::<StoredCredential>(&contents) {
            Ok(stored) => {
                let trimmed = stored.api_key.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(e) => {
                log::warn!("Credential: failed to parse {:?}: {}", path, e);
                None
            }
        }
    }

    /// Trim and persist `raw`. An empty input deletes any stored value
    /// and reports `EmptyInput` so the caller can show a validation
    /// message.
    pub fn save(&self, raw: &str) -> Result<SaveOutcome, String> {
        let key = raw.trim();
        if key.is_empty() {
            self.delete()?;
            return Ok(SaveOutcome::EmptyInput);
        }

        let path = self.path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory {:?}: {}", parent, e))?;
        }

        let contents = serde_json::to_string_pretty(&StoredCredential {
            api_key: key.to_string(),
        })
        .map_err(|e| format!("Serialize credential: {}", e))?;

        write_atomic(&path, &contents)?;
        log::info!("Credential: stored API key ({} chars)", key.len());
        Ok(SaveOutcome::Saved)
    }

    /// Remove any stored credential. Missing file is not an error.
    pub fn delete(&self) -> Result<(), String> {
        let path = self.path();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("Remove credential file {:?}: {}", path, e)),
        }
    }
}

/// Write atomically: write to a temp file in the same directory, then
/// rename. Prevents a partial/corrupt file if the process dies
/// mid-write.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), String> {
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, contents)
        .map_err(|e| format!("Write temp file {:?}: {}", tmp_path, e))?;

    // On Unix, rename atomically replaces the destination. On Windows,
    // rename fails if the destination exists, so remove it first
    // (ignoring NotFound).
    if cfg!(windows) && path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                return Err(format!("Remove existing file {:?}: {}", path, e));
            }
        }
    }

    std::fs::rename(&tmp_path, path)
        .map_err(|e| format!("Rename temp file {:?} to {:?}: {}", tmp_path, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips_trimmed_key() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        assert_eq!(store.save("  sk-test-123  ").unwrap(), SaveOutcome::Saved);
        assert_eq!(store.load().as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn empty_save_deletes_existing_key() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());

        store.save("sk-test-123").unwrap();
        assert!(store.load().is_some());

        assert_eq!(store.save("   ").unwrap(), SaveOutcome::EmptyInput);
        assert!(store.load().is_none());
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn corrupt_file_loads_as_none() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CREDENTIAL_FILE_NAME), "not json").unwrap();
        let store = CredentialStore::new(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn whitespace_only_stored_value_loads_as_none() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(CREDENTIAL_FILE_NAME),
            r#"{"api_key": "   "}"#,
        )
        .unwrap();
        let store = CredentialStore::new(dir.path());
        assert!(store.load().is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.delete().unwrap();
        store.save("sk-x").unwrap();
        store.delete().unwrap();
        store.delete().unwrap();
        assert!(store.load().is_none());
    }
}
