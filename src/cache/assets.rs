//! Versioned app-shell asset cache
//!
//! Cache-first storage for static asset responses, keyed by request
//! path. Only 200 responses are cached; invalidation happens by bumping
//! the bucket version, never per-entry.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem-safe encoding of a request path into an entry stem.
/// `/` is encoded too, so nested paths stay flat in the bucket.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// A cached asset response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMetadata {
    content_type: String,
}

pub struct AssetCache {
    dir: PathBuf,
}

impl AssetCache {
    pub fn new(bucket_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: bucket_dir.into(),
        }
    }

    /// Entry file for `path` with the given suffix appended. Appended,
    /// not swapped in, so `/app.css` and `/app.js` stay distinct.
    fn entry_path(&self, path: &str, suffix: &str) -> PathBuf {
        let key = utf8_percent_encode(path, KEY_ENCODE_SET).to_string();
        self.dir.join(format!("{}.{}", key, suffix))
    }

    /// Look up a cached response for `path`.
    pub fn get(&self, path: &str) -> Option<CachedAsset> {
        let metadata_contents = match std::fs::read_to_string(self.entry_path(path, "json")) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("AssetCache: failed to read metadata for {}: {}", path, e);
                return None;
            }
        };
        let metadata: EntryMetadata = match serde_json::from_str(&metadata_contents) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("AssetCache: corrupt metadata for {}: {}", path, e);
                return None;
            }
        };
        let body = match std::fs::read(self.entry_path(path, "body")) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("AssetCache: failed to read body for {}: {}", path, e);
                return None;
            }
        };
        Some(CachedAsset {
            content_type: metadata.content_type,
            body,
        })
    }

    /// Store a 200 response for `path`.
    pub fn put(&self, path: &str, content_type: &str, body: &[u8]) -> Result<(), String> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Create asset bucket {:?}: {}", self.dir, e))?;

        let body_path = self.entry_path(path, "body");
        let tmp_body = self.entry_path(path, "body.tmp");
        std::fs::write(&tmp_body, body)
            .map_err(|e| format!("Write asset body {:?}: {}", tmp_body, e))?;
        std::fs::rename(&tmp_body, &body_path)
            .map_err(|e| format!("Commit asset body: {}", e))?;

        let contents = serde_json::to_string(&EntryMetadata {
            content_type: content_type.to_string(),
        })
        .map_err(|e| format!("Serialize asset metadata: {}", e))?;
        crate::credential::write_atomic(&self.entry_path(path, "json"), &contents)?;

        log::debug!("AssetCache: cached {} ({} bytes)", path, body.len());
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entry_path(path, "json").exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_then_get_round_trips() {
        let root = tempdir().unwrap();
        let cache = AssetCache::new(root.path().join(crate::cache::APP_SHELL_BUCKET));

        cache
            .put("/index.html", "text/html", b"<html></html>")
            .unwrap();

        let asset = cache.get("/index.html").unwrap();
        assert_eq!(asset.content_type, "text/html");
        assert_eq!(asset.body, b"<html></html>");
    }

    #[test]
    fn nested_paths_do_not_collide() {
        let root = tempdir().unwrap();
        let cache = AssetCache::new(root.path().join(crate::cache::APP_SHELL_BUCKET));

        cache.put("/a/b.js", "text/javascript", b"one").unwrap();
        cache.put("/a_b.js", "text/javascript", b"two").unwrap();

        assert_eq!(cache.get("/a/b.js").unwrap().body, b"one");
        assert_eq!(cache.get("/a_b.js").unwrap().body, b"two");
    }

    #[test]
    fn same_stem_different_extension_do_not_collide() {
        let root = tempdir().unwrap();
        let cache = AssetCache::new(root.path().join(crate::cache::APP_SHELL_BUCKET));

        cache.put("/app.css", "text/css", b"css").unwrap();
        cache.put("/app.js", "text/javascript", b"js").unwrap();

        assert_eq!(cache.get("/app.css").unwrap().body, b"css");
        assert_eq!(cache.get("/app.js").unwrap().body, b"js");
    }

    #[test]
    fn miss_returns_none() {
        let root = tempdir().unwrap();
        let cache = AssetCache::new(root.path().join(crate::cache::APP_SHELL_BUCKET));
        assert!(cache.get("/missing.css").is_none());
        assert!(!cache.contains("/missing.css"));
    }
}
