//! Durable checksum cache for downloaded guide documents.
//!
//! Maps `"{destination_folder}_{procedure_id}"` to the last-known fingerprint
//! of the file produced for that procedure. Consulted at the start of every
//! pipeline invocation to skip redundant downloads; written back only after a
//! successful fetch/convert/annotate cycle. Persisted as a flat JSON object
//! between runs, with no expiry.
//!
//! The cache is advisory metadata, not a source of truth: a corrupt or
//! missing cache file degrades to an empty cache, never to a failed run.

pub mod checksum;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

pub use checksum::{compute_file_checksum, compute_file_checksum_sync, digest_bytes};

/// One cached fingerprint, keyed by destination folder + procedure id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub code: String,
    pub title: String,
    pub downloaded: bool,
    /// Hex digest of the final on-disk file. Absent on entries written by
    /// older versions; validation then degrades to size-only.
    pub checksum: Option<String>,
    pub size: Option<u64>,
}

/// Why an existing file failed cache validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    Missing,
    Empty,
    SizeMismatch,
    ChecksumMismatch,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "file missing"),
            Self::Empty => write!(f, "file empty"),
            Self::SizeMismatch => write!(f, "size mismatch"),
            Self::ChecksumMismatch => write!(f, "checksum mismatch"),
        }
    }
}

/// Thread-safe checksum cache service.
///
/// Injected into each worker rather than living as ambient global state.
/// The interior mutex is held only across map operations, never across I/O,
/// so contention stays negligible next to fetch/convert latency.
pub struct ChecksumCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    backing_file: PathBuf,
}

impl ChecksumCache {
    /// Load the cache from its backing file.
    ///
    /// A missing file yields an empty cache; an unreadable or corrupt file
    /// is discarded with a warning. Neither is fatal to the run.
    #[must_use]
    pub fn load(backing_file: &Path) -> Self {
        let entries = match std::fs::read_to_string(backing_file) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&raw) {
                Ok(map) => {
                    debug!("Loaded {} cache entries from {}", map.len(), backing_file.display());
                    map
                }
                Err(e) => {
                    warn!(
                        "Cache file {} is corrupt ({e}), starting with an empty cache",
                        backing_file.display()
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!(
                    "Cannot read cache file {} ({e}), starting with an empty cache",
                    backing_file.display()
                );
                HashMap::new()
            }
        };

        Self {
            entries: Mutex::new(entries),
            backing_file: backing_file.to_path_buf(),
        }
    }

    /// Composite key for one procedure in one destination folder
    #[must_use]
    pub fn key(destination_folder: &Path, procedure_id: &str) -> String {
        format!("{}_{procedure_id}", destination_folder.display())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    pub fn put(&self, key: String, entry: CacheEntry) {
        self.entries.lock().insert(key, entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Persist the cache to its backing file.
    ///
    /// Write-then-rename; idempotent. A partial write can at worst lose
    /// advisory metadata, so failures are reported but not escalated by
    /// callers.
    pub fn persist(&self) -> std::io::Result<()> {
        let snapshot = self.entries.lock().clone();
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| std::io::Error::other(format!("cache serialization failed: {e}")))?;

        let tmp_path = self.backing_file.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.backing_file)?;
        debug!(
            "Persisted {} cache entries to {}",
            snapshot.len(),
            self.backing_file.display()
        );
        Ok(())
    }
}

/// Decide whether an existing file can be reused for a cached entry.
///
/// Valid iff the file exists with size > 0, the size matches the cached size
/// when one is recorded, and the recomputed checksum matches the cached
/// checksum when one is recorded. An entry without a checksum validates on
/// size alone, a weaker guarantee kept for compatibility with entries
/// written before checksums were recorded.
pub fn validate_existing_file(path: &Path, entry: &CacheEntry) -> Result<(), StaleReason> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return Err(StaleReason::Missing),
    };

    let current_size = meta.len();
    if current_size == 0 {
        return Err(StaleReason::Empty);
    }

    if let Some(cached_size) = entry.size
        && current_size != cached_size
    {
        return Err(StaleReason::SizeMismatch);
    }

    if let Some(cached_checksum) = &entry.checksum {
        match compute_file_checksum_sync(path) {
            Ok(current) if &current == cached_checksum => {}
            Ok(_) => return Err(StaleReason::ChecksumMismatch),
            Err(_) => return Err(StaleReason::Missing),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry_for(path: &Path) -> CacheEntry {
        CacheEntry {
            code: "1.001".into(),
            title: "test".into(),
            downloaded: true,
            checksum: Some(compute_file_checksum_sync(path).expect("checksum")),
            size: Some(std::fs::metadata(path).expect("metadata").len()),
        }
    }

    #[test]
    fn test_validate_accepts_unchanged_file() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(b"guide document body").expect("write");
        let entry = entry_for(f.path());
        assert_eq!(validate_existing_file(f.path(), &entry), Ok(()));
    }

    #[test]
    fn test_validate_rejects_size_change() {
        let mut f = tempfile::NamedTempFile::new().expect("temp file");
        f.write_all(b"guide document body").expect("write");
        let entry = entry_for(f.path());
        f.write_all(b"!").expect("append");
        f.flush().expect("flush");
        assert_eq!(
            validate_existing_file(f.path(), &entry),
            Err(StaleReason::SizeMismatch)
        );
    }

    #[test]
    fn test_validate_rejects_checksum_change_at_same_size() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("guide.docx");
        std::fs::write(&path, b"aaaa").expect("write");
        let mut entry = entry_for(&path);
        entry.checksum = Some("0000000000000000".into());
        assert_eq!(
            validate_existing_file(&path, &entry),
            Err(StaleReason::ChecksumMismatch)
        );
    }

    #[test]
    fn test_validate_without_checksum_degrades_to_size_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("guide.docx");
        std::fs::write(&path, b"bbbb").expect("write");
        let entry = CacheEntry {
            code: "1.001".into(),
            title: "test".into(),
            downloaded: true,
            checksum: None,
            size: Some(4),
        };
        assert_eq!(validate_existing_file(&path, &entry), Ok(()));
    }

    #[test]
    fn test_missing_file_is_stale() {
        let entry = CacheEntry {
            code: "1.001".into(),
            title: "test".into(),
            downloaded: true,
            checksum: None,
            size: None,
        };
        assert_eq!(
            validate_existing_file(Path::new("/no/such/guide.docx"), &entry),
            Err(StaleReason::Missing)
        );
    }

    #[test]
    fn test_corrupt_cache_file_starts_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cache_ministries.json");
        std::fs::write(&path, b"{not json").expect("write");
        let cache = ChecksumCache::load(&path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_persist_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("cache_ministries.json");
        let cache = ChecksumCache::load(&path);
        cache.put(
            "downloads/bo_tu_phap_42".into(),
            CacheEntry {
                code: "1.001".into(),
                title: "Cấp hộ chiếu".into(),
                downloaded: true,
                checksum: Some("abc".into()),
                size: Some(1000),
            },
        );
        cache.persist().expect("persist");

        let reloaded = ChecksumCache::load(&path);
        assert_eq!(reloaded.len(), 1);
        let entry = reloaded.get("downloads/bo_tu_phap_42").expect("entry");
        assert_eq!(entry.size, Some(1000));
        assert_eq!(entry.checksum.as_deref(), Some("abc"));
    }
}
