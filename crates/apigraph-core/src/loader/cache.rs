//! On-disk cache for remote documents.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use url::Url;

use super::error::LoaderError;
use super::fetch::Fetch;

/// Wraps a fetcher and keeps fetched remote documents under a cache directory.
///
/// Entries are named by the SHA-256 of the normalized URI. An entry older
/// than `expiry` is refetched; without an expiry entries never go stale.
/// `file://` URIs bypass the cache.
pub struct DiskCache<F> {
    inner: F,
    dir: PathBuf,
    expiry: Option<Duration>,
}

impl<F: Fetch> DiskCache<F> {
    pub fn new(inner: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the cache entry for `uri`.
    pub fn entry_path(&self, uri: &Url) -> PathBuf {
        let digest = Sha256::digest(uri.as_str().as_bytes());
        self.dir.join(hex::encode(digest))
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let Ok(metadata) = fs::metadata(path) else {
            return false;
        };
        let Some(expiry) = self.expiry else {
            return true;
        };
        metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .map(|age| age < expiry)
            .unwrap_or(false)
    }

    fn store(&self, path: &Path, text: &str) -> Result<(), LoaderError> {
        fs::create_dir_all(&self.dir).map_err(|e| LoaderError::io(&self.dir, e))?;
        fs::write(path, text).map_err(|e| LoaderError::io(path, e))
    }
}

impl<F: Fetch> Fetch for DiskCache<F> {
    fn fetch(&self, uri: &Url) -> Result<String, LoaderError> {
        if uri.scheme() == "file" {
            return self.inner.fetch(uri);
        }

        let path = self.entry_path(uri);
        if self.is_fresh(&path) {
            tracing::debug!(uri = %uri, path = %path.display(), "Document cache hit");
            return fs::read_to_string(&path).map_err(|e| LoaderError::io(path, e));
        }

        tracing::debug!(uri = %uri, "Document cache miss");
        let text = self.inner.fetch(uri)?;
        if let Err(e) = self.store(&path, &text) {
            tracing::warn!(uri = %uri, error = %e, "Failed to write document cache entry");
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryFetcher;

    #[test]
    fn test_second_fetch_is_served_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Url::parse("https://example.com/api.yaml").unwrap();
        let memory = MemoryFetcher::new().with_document(&uri, "openapi: 3.0.0");

        let cache = DiskCache::new(&memory, dir.path());
        assert_eq!(cache.fetch(&uri).unwrap(), "openapi: 3.0.0");
        assert_eq!(cache.fetch(&uri).unwrap(), "openapi: 3.0.0");

        assert_eq!(memory.fetch_count(&uri), 1);
        assert!(cache.entry_path(&uri).exists());
    }

    #[test]
    fn test_expired_entry_is_refetched() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Url::parse("https://example.com/api.yaml").unwrap();
        let memory = MemoryFetcher::new().with_document(&uri, "v1");

        let cache = DiskCache::new(&memory, dir.path()).with_expiry(Some(Duration::ZERO));
        cache.fetch(&uri).unwrap();

        memory.insert(&uri, "v2");
        assert_eq!(cache.fetch(&uri).unwrap(), "v2");
        assert_eq!(memory.fetch_count(&uri), 2);
    }

    #[test]
    fn test_file_uris_bypass_cache() {
        let dir = tempfile::tempdir().unwrap();
        let uri = Url::parse("file:///tmp/api.yaml").unwrap();
        let memory = MemoryFetcher::new().with_document(&uri, "openapi: 3.0.0");

        let cache = DiskCache::new(&memory, dir.path().join("cache"));
        cache.fetch(&uri).unwrap();
        cache.fetch(&uri).unwrap();

        assert_eq!(memory.fetch_count(&uri), 2);
        assert!(!dir.path().join("cache").exists());
    }
}
