//! Single-slot hand-off of a shared file from the gateway to the session
//!
//! The gateway writes the uploaded file here before redirecting; the
//! session reads it (and deletes it) on the next `shared=true` intake.
//! One fixed slot: a second share overwrites the first before it is
//! consumed. Last-writer-wins, no queue.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fixed slot key inside the shared-files bucket.
pub const SLOT_KEY: &str = "latest-shared-audio";

const FALLBACK_FILENAME: &str = "shared_audio.file";

/// Matches the characters `encodeURIComponent` leaves bare, so the
/// stored filename header is ASCII-safe in transit.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A shared file materialized from the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFileRecord {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Sidecar metadata persisted next to the payload. The filename is kept
/// percent-encoded on disk, exactly as it travels in the original's
/// `X-Original-Filename` header.
#[derive(Debug, Serialize, Deserialize)]
struct SlotMetadata {
    content_type: String,
    content_length: u64,
    original_filename_encoded: String,
}

pub struct SharedFileBridge {
    dir: PathBuf,
}

impl SharedFileBridge {
    pub fn new(bucket_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: bucket_dir.into(),
        }
    }

    fn payload_path(&self) -> PathBuf {
        self.dir.join(format!("{}.bin", SLOT_KEY))
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", SLOT_KEY))
    }

    /// Store a record in the slot, replacing whatever was there. The
    /// payload lands before the metadata so a reader never sees
    /// metadata pointing at a missing payload.
    pub fn put(&self, filename: &str, content_type: &str, bytes: &[u8]) -> Result<(), String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Create bridge bucket {:?}: {}", self.dir, e))?;

        let payload_path = self.payload_path();
        let tmp_payload = payload_path.with_extension("bin.tmp");
        std::fs::write(&tmp_payload, bytes)
            .map_err(|e| format!("Write bridge payload {:?}: {}", tmp_payload, e))?;
        std::fs::rename(&tmp_payload, &payload_path)
            .map_err(|e| format!("Commit bridge payload: {}", e))?;

        let name = if filename.is_empty() {
            FALLBACK_FILENAME
        } else {
            filename
        };
        let metadata = SlotMetadata {
            content_type: content_type.to_string(),
            content_length: bytes.len() as u64,
            original_filename_encoded: utf8_percent_encode(name, FILENAME_ENCODE_SET).to_string(),
        };
        let contents =
            serde_json::to_string(&metadata).map_err(|e| format!("Serialize bridge metadata: {}", e))?;
        crate::credential::write_atomic(&self.metadata_path(), &contents)?;

        log::info!(
            "Bridge: stored shared file \"{}\" ({} bytes, {})",
            name,
            bytes.len(),
            content_type
        );
        Ok(())
    }

    /// Read the slot without consuming it. Returns `None` when empty or
    /// when the stored state is unreadable (logged, degraded).
    pub fn get(&self) -> Option<SharedFileRecord> {
        let metadata_path = self.metadata_path();
        let contents = match std::fs::read_to_string(&metadata_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("Bridge: failed to read metadata {:?}: {}", metadata_path, e);
                return None;
            }
        };
        let metadata: SlotMetadata = match serde_json::from_str(&contents) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Bridge: failed to parse metadata {:?}: {}", metadata_path, e);
                return None;
            }
        };
        let bytes = match std::fs::read(self.payload_path()) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("Bridge: failed to read payload: {}", e);
                return None;
            }
        };

        let filename = percent_decode_str(&metadata.original_filename_encoded)
            .decode_utf8()
            .map(|s| s.to_string())
            .unwrap_or_else(|_| FALLBACK_FILENAME.to_string());

        if bytes.len() as u64 != metadata.content_length {
            log::warn!(
                "Bridge: payload length {} differs from recorded {} for \"{}\"",
                bytes.len(),
                metadata.content_length,
                filename
            );
        }

        Some(SharedFileRecord {
            filename,
            content_type: if metadata.content_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                metadata.content_type
            },
            bytes,
        })
    }

    /// Empty the slot. Missing files are not errors.
    pub fn delete(&self) -> Result<(), String> {
        for path in [self.metadata_path(), self.payload_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(format!("Remove bridge file {:?}: {}", path, e)),
            }
        }
        Ok(())
    }
}
