//! XDG path helpers for config, cache buckets, and conversion scratch space
//!
//! Config files live in:   ~/.config/sharescribe/
//! Cache buckets live in:  ~/.cache/sharescribe/<bucket-name>/
//! Scratch files live in:  ~/.local/share/sharescribe/scratch/
//!
//! These are defaults only; every store takes its directory explicitly
//! so tests can point them at a tempdir.

use std::fs;
use std::path::{Path, PathBuf};

/// Common prefix shared by every cache bucket this app creates.
/// Stale versioned buckets are recognized (and swept) by this prefix.
pub const CACHE_BUCKET_PREFIX: &str = "sharescribe-";

/// Default directory for persisted JSON state (credential, history).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sharescribe")
}

/// Default root directory under which cache buckets are created.
pub fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sharescribe")
}

/// Default scratch directory used as the conversion engine's working
/// filesystem.
pub fn default_scratch_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sharescribe")
        .join("scratch")
}

/// Directory of a single named cache bucket under `cache_root`.
pub fn bucket_dir(cache_root: &Path, bucket_name: &str) -> PathBuf {
    cache_root.join(bucket_name)
}

/// Create a cache bucket directory if it doesn't exist.
pub fn create_bucket_dir(cache_root: &Path, bucket_name: &str) -> std::io::Result<PathBuf> {
    let dir = bucket_dir(cache_root, bucket_name);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_dir_nests_under_cache_root() {
        let root = PathBuf::from("/tmp/cache-root");
        let dir = bucket_dir(&root, "sharescribe-app-shell-v2");
        assert!(dir.starts_with(&root));
        assert!(dir
            .file_name()
            .map(|n| n == "sharescribe-app-shell-v2")
            .unwrap_or(false));
    }

    #[test]
    fn default_paths_contain_app_name() {
        assert!(default_config_dir()
            .to_string_lossy()
            .contains("sharescribe"));
        assert!(default_cache_root()
            .to_string_lossy()
            .contains("sharescribe"));
        assert!(default_scratch_dir().to_string_lossy().contains("scratch"));
    }
}
