//! Global cache for file content digests.
//!
//! Nothing here watches the filesystem, so a cached digest is only trusted
//! while the file's size and mtime still match what they were when the
//! digest was computed. A lookup that finds a changed fingerprint drops the
//! entry and reports a miss, forcing a re-hash of the current bytes.

use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use super::ContentDigest;

/// Filesystem state a cached digest was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    len: u64,
    modified: Option<SystemTime>,
}

impl Fingerprint {
    fn of(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

struct CachedDigest {
    digest: ContentDigest,
    fingerprint: Fingerprint,
}

/// Global cache for file content digests (thread-safe).
pub struct DigestCache {
    digests: DashMap<PathBuf, CachedDigest>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self {
            digests: DashMap::new(),
        }
    }

    /// Look up a digest, validating it against the file's current state.
    ///
    /// A stale or unverifiable entry is evicted and reported as a miss.
    pub fn get(&self, path: &Path) -> Option<ContentDigest> {
        let canonical = path.canonicalize().ok()?;
        let (digest, fresh) = {
            let entry = self.digests.get(&canonical)?;
            // No mtime means the entry cannot be validated; treat as stale
            let fresh = matches!(
                Fingerprint::of(&canonical),
                Some(current) if entry.fingerprint.modified.is_some()
                    && entry.fingerprint == current
            );
            (entry.digest, fresh)
        };

        if fresh {
            Some(digest)
        } else {
            self.digests.remove(&canonical);
            None
        }
    }

    /// Cache a digest together with the file's current fingerprint.
    ///
    /// Files whose metadata cannot be read are never cached.
    pub fn set(&self, path: &Path, digest: ContentDigest) {
        if let Ok(canonical) = path.canonicalize()
            && let Some(fingerprint) = Fingerprint::of(&canonical)
        {
            self.digests.insert(canonical, CachedDigest { digest, fingerprint });
        }
    }

    pub fn invalidate(&self, path: &Path) {
        if let Ok(canonical) = path.canonicalize() {
            self.digests.remove(&canonical);
        }
    }

    pub fn clear(&self) {
        self.digests.clear();
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl Default for DigestCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Global digest cache instance.
pub static DIGEST_CACHE: LazyLock<DigestCache> = LazyLock::new(DigestCache::new);

/// Get cached digest for a file.
#[inline]
pub fn get_cached_digest(path: &Path) -> Option<ContentDigest> {
    DIGEST_CACHE.get(path)
}

/// Store digest in global cache.
#[inline]
pub fn set_cached_digest(path: &Path, digest: ContentDigest) {
    DIGEST_CACHE.set(path, digest);
}

/// Drop the cached digest for a file.
#[inline]
pub fn invalidate_cached_digest(path: &Path) {
    DIGEST_CACHE.invalidate(path);
}

/// Clear the global digest cache.
#[inline]
pub fn clear_cache() {
    DIGEST_CACHE.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cache_get_set() {
        let cache = DigestCache::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "content").unwrap();

        let digest = ContentDigest::of_bytes(b"content");
        cache.set(&path, digest);

        assert_eq!(cache.get(&path), Some(digest));
    }

    #[test]
    fn test_cache_detects_rewrite() {
        let cache = DigestCache::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "short").unwrap();
        cache.set(&path, ContentDigest::of_bytes(b"short"));

        // Rewrite changes the fingerprint; the stale entry is evicted
        fs::write(&path, "considerably longer content").unwrap();
        assert_eq!(cache.get(&path), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = DigestCache::new();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.txt");
        fs::write(&path, "content").unwrap();

        cache.set(&path, ContentDigest::of_bytes(b"content"));
        cache.invalidate(&path);

        assert_eq!(cache.get(&path), None);
    }

    #[test]
    fn test_cache_clear() {
        let cache = DigestCache::new();
        let dir = TempDir::new().unwrap();

        let path1 = dir.path().join("a.txt");
        let path2 = dir.path().join("b.txt");
        fs::write(&path1, "a").unwrap();
        fs::write(&path2, "b").unwrap();

        cache.set(&path1, ContentDigest::of_bytes(b"a"));
        cache.set(&path2, ContentDigest::of_bytes(b"b"));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_nonexistent_path() {
        let cache = DigestCache::new();
        // Paths that cannot be canonicalized are never cached
        cache.set(Path::new("/nonexistent/x.txt"), ContentDigest::of_bytes(b"x"));
        assert_eq!(cache.get(Path::new("/nonexistent/x.txt")), None);
    }
}
