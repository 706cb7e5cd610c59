// src/fingerprint/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use tracing::debug;

use crate::fingerprint::hash::compute_file_hash;
use crate::fs::FileSystem;

/// Session-owned cache of file version tokens.
///
/// Avoids re-hashing every input of every project on each build: only files
/// reported as changed are invalidated. One instance is created per session
/// and handed to whoever enumerates inputs; there is no process-wide cache.
#[derive(Debug, Default)]
pub struct VersionTokenCache {
    tokens: Mutex<HashMap<PathBuf, String>>,
}

impl VersionTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the token for a file, computing and caching it if necessary.
    pub fn get_or_compute(&self, fs: &dyn FileSystem, path: &Path) -> Result<String> {
        if let Some(token) = self.lock().get(path) {
            return Ok(token.clone());
        }

        debug!("cache miss: computing version token for {:?}", path);
        let token = compute_file_hash(fs, path)?;
        self.lock().insert(path.to_path_buf(), token.clone());
        Ok(token)
    }

    /// Invalidate the cached token for a file (e.g. on change).
    pub fn invalidate(&self, path: &Path) {
        if self.lock().remove(path).is_some() {
            debug!("invalidated version token for {:?}", path);
        }
    }

    /// Invalidate every cached token at or beneath `folder`.
    pub fn invalidate_under(&self, folder: &Path) {
        let mut tokens = self.lock();
        let before = tokens.len();
        tokens.retain(|path, _| !path.starts_with(folder));
        let removed = before - tokens.len();
        if removed > 0 {
            debug!(removed, "invalidated version tokens under {:?}", folder);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, String>> {
        self.tokens.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn caches_until_invalidated() {
        let fs = MockFileSystem::new();
        let path = Path::new("/repo/a.txt");
        fs.add_file(path, "one");

        let cache = VersionTokenCache::new();
        let first = cache.get_or_compute(&fs, path).unwrap();

        fs.add_file(path, "two");
        assert_eq!(cache.get_or_compute(&fs, path).unwrap(), first);

        cache.invalidate(path);
        assert_ne!(cache.get_or_compute(&fs, path).unwrap(), first);
    }

    #[test]
    fn invalidate_under_only_touches_that_folder() {
        let fs = MockFileSystem::new();
        fs.add_file("/repo/a/x", "x");
        fs.add_file("/repo/b/y", "y");

        let cache = VersionTokenCache::new();
        cache.get_or_compute(&fs, Path::new("/repo/a/x")).unwrap();
        cache.get_or_compute(&fs, Path::new("/repo/b/y")).unwrap();

        cache.invalidate_under(Path::new("/repo/a"));
        assert_eq!(cache.len(), 1);
    }
}
