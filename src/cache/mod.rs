//! On-disk cache buckets
//!
//! Each bucket is a directory under the cache root, named with the
//! common `sharescribe-` prefix. The app-shell bucket is versioned and
//! superseded wholesale by a name bump; the shared-files bucket is
//! fixed. Stale versions are swept on gateway activation.

pub mod assets;
pub mod bridge;

pub use assets::AssetCache;
pub use bridge::{SharedFileBridge, SharedFileRecord};

use std::path::Path;

use crate::paths::CACHE_BUCKET_PREFIX;

/// Versioned bucket holding static asset responses. Bump the suffix to
/// invalidate every cached asset at once.
pub const APP_SHELL_BUCKET: &str = "sharescribe-app-shell-v2";

/// Fixed bucket used to hand a shared file from the gateway to the
/// session. Never swept.
pub const SHARED_FILES_BUCKET: &str = "sharescribe-shared-files-v1";

/// Delete every bucket directory that carries our prefix but is not in
/// `keep`. Returns the number of buckets removed. Unreadable entries
/// are skipped, not fatal.
pub fn sweep_stale_buckets(cache_root: &Path, keep: &[&str]) -> std::io::Result<usize> {
    if !cache_root.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(cache_root)?.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(CACHE_BUCKET_PREFIX) || keep.contains(&name) {
            continue;
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                log::info!("Cache: swept stale bucket {}", name);
                removed += 1;
            }
            Err(e) => {
                log::warn!("Cache: failed to sweep bucket {}: {}", name, e);
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sweep_removes_only_prefixed_non_kept_buckets() {
        let root = tempdir().unwrap();
        for name in [
            "sharescribe-app-shell-v1",
            APP_SHELL_BUCKET,
            SHARED_FILES_BUCKET,
            "unrelated-dir",
        ] {
            std::fs::create_dir_all(root.path().join(name)).unwrap();
        }

        let removed =
            sweep_stale_buckets(root.path(), &[APP_SHELL_BUCKET, SHARED_FILES_BUCKET]).unwrap();

        assert_eq!(removed, 1);
        assert!(!root.path().join("sharescribe-app-shell-v1").exists());
        assert!(root.path().join(APP_SHELL_BUCKET).exists());
        assert!(root.path().join(SHARED_FILES_BUCKET).exists());
        assert!(root.path().join("unrelated-dir").exists());
    }

    #[test]
    fn sweep_of_missing_root_is_zero() {
        let root = tempdir().unwrap();
        let missing = root.path().join("nope");
        assert_eq!(sweep_stale_buckets(&missing, &[]).unwrap(), 0);
    }
}
