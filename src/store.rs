//! Directory-backed artifact store
//!
//! One file per `(key, kind)`: `<key>.jpg` for thumbnails and
//! `<key>_<kind>.txt` for metadata values. There is no index; the
//! directory listing is the source of truth. A file's modification time
//! doubles as the entry's stored-at timestamp.
//!
//! Writes go to a hidden temporary file in the same directory and are
//! renamed into place, so readers see either the previous complete entry
//! or the new complete entry.

use chrono::{DateTime, Local, Utc};
use humansize::{format_size, BINARY};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::key::CacheKey;

const TEMP_SUFFIX: &str = ".tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Kinds of textual metadata kept alongside thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Duration,
}

impl MetadataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKind::Duration => "duration",
        }
    }
}

/// What a stored blob represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// JPEG thumbnail bytes.
    Thumbnail,
    /// A short UTF-8 value.
    Metadata(MetadataKind),
}

impl ArtifactKind {
    /// File name for this kind of artifact under `key`.
    pub fn file_name(&self, key: &CacheKey) -> String {
        match self {
            ArtifactKind::Thumbnail => format!("{}.jpg", key),
            ArtifactKind::Metadata(kind) => format!("{}_{}.txt", key, kind.as_str()),
        }
    }
}

/// A file found in the store directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub path: PathBuf,
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch.
    pub stored_at: i64,
}

impl StoredEntry {
    fn is_thumbnail(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "jpg")
    }
}

/// Aggregate view of the store contents.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total_size: u64,
    pub entry_count: usize,
    pub thumbnail_count: usize,
    pub metadata_count: usize,
    pub oldest: Option<StoredEntry>,
}

impl StoreStats {
    /// Get human-readable total size
    pub fn size_human(&self) -> String {
        format_size(self.total_size, BINARY)
    }

    /// Format a summary for display
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Video cache: {}\n   Entries: {} ({} thumbnails, {} metadata)",
            self.size_human(),
            self.entry_count,
            self.thumbnail_count,
            self.metadata_count
        );

        if let Some(oldest) = &self.oldest {
            if let Some(when) = DateTime::<Utc>::from_timestamp_millis(oldest.stored_at) {
                let when: DateTime<Local> = when.into();
                summary.push_str(&format!("\n   Oldest: {}", when.format("%Y-%m-%d %H:%M")));
            }
        }

        summary
    }
}

/// Store of derived artifacts rooted at one directory.
///
/// Cheap to clone and safe to use from several threads at once. Writes to
/// the same `(key, kind)` are last-write-wins.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store over `dir`. The directory is not touched until
    /// [`ensure_dir`](Self::ensure_dir) or the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the store directory if it does not exist yet.
    pub fn ensure_dir(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::CreateDir {
            path: self.dir.clone(),
            source,
        })
    }

    /// Full path of the entry for `(key, kind)`.
    pub fn entry_path(&self, key: &CacheKey, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name(key))
    }

    /// Stored-at timestamp of an entry, if it exists.
    pub fn stored_at(&self, key: &CacheKey, kind: ArtifactKind) -> Option<i64> {
        let metadata = fs::metadata(self.entry_path(key, kind)).ok()?;
        if !metadata.is_file() {
            return None;
        }
        metadata.modified().ok().map(system_time_millis)
    }

    /// True iff an entry exists and was stored at or after `not_older_than`.
    pub fn has(&self, key: &CacheKey, kind: ArtifactKind, not_older_than: i64) -> bool {
        self.stored_at(key, kind)
            .is_some_and(|stored_at| stored_at >= not_older_than)
    }

    /// Read an entry's bytes. Any failure is a miss.
    pub fn read(&self, key: &CacheKey, kind: ArtifactKind) -> Option<Vec<u8>> {
        let path = self.entry_path(key, kind);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Atomically store `bytes` for `(key, kind)`.
    ///
    /// On failure no partial file is left behind.
    pub fn write(&self, key: &CacheKey, kind: ArtifactKind, bytes: &[u8]) -> StoreResult<()> {
        let path = self.entry_path(key, kind);
        let temp = self.temp_path(&kind.file_name(key));

        let result = self
            .ensure_dir()
            .and_then(|()| write_file(&temp, bytes))
            .and_then(|()| {
                fs::rename(&temp, &path).map_err(|source| StoreError::Write {
                    path: path.clone(),
                    source,
                })
            });

        if result.is_err() {
            let _ = fs::remove_file(&temp);
        }
        result
    }

    /// Delete an entry. Deleting a missing entry is not an error.
    pub fn delete(&self, key: &CacheKey, kind: ArtifactKind) -> StoreResult<()> {
        remove_entry(&self.entry_path(key, kind))
    }

    /// Delete an entry by path, as returned from [`list_all`](Self::list_all).
    pub fn delete_path(&self, path: &Path) -> StoreResult<()> {
        remove_entry(path)
    }

    /// List every committed entry. In-flight temporary files are skipped.
    pub fn list_all(&self) -> StoreResult<Vec<StoredEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut entries = Vec::new();
        for entry in read_dir.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if is_temp_file(&path) {
                continue;
            }
            // Entries may disappear between listing and stat
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let stored_at = metadata.modified().map(system_time_millis).unwrap_or(0);
            entries.push(StoredEntry {
                path,
                size: metadata.len(),
                stored_at,
            });
        }
        Ok(entries)
    }

    /// Delete every file in the store directory, temporaries included.
    ///
    /// Returns the number of files removed. Files that cannot be removed are
    /// logged and skipped.
    pub fn clear(&self) -> StoreResult<usize> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let mut removed = 0;
        for path in read_dir.filter_map(|e| e.ok()).map(|e| e.path()) {
            if !path.is_file() {
                continue;
            }
            match remove_entry(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("{}", e),
            }
        }
        Ok(removed)
    }

    /// Delete temporary files last modified more than `max_age` ago.
    ///
    /// These are left behind by writes interrupted before the rename.
    /// Younger temporaries may belong to a write still in flight and are
    /// kept. Returns the number of files and bytes removed.
    pub fn remove_stale_temps(&self, max_age: Duration) -> StoreResult<(usize, u64)> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok((0, 0)),
            Err(source) => {
                return Err(StoreError::List {
                    path: self.dir.clone(),
                    source,
                })
            }
        };

        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(UNIX_EPOCH);
        let mut removed = 0;
        let mut bytes = 0;
        for entry in read_dir.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !is_temp_file(&path) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let stale = metadata.modified().is_ok_and(|modified| modified < cutoff);
            if !metadata.is_file() || !stale {
                continue;
            }
            match remove_entry(&path) {
                Ok(()) => {
                    removed += 1;
                    bytes += metadata.len();
                }
                Err(e) => warn!("{}", e),
            }
        }
        Ok((removed, bytes))
    }

    /// Summarise the store contents.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let entries = self.list_all()?;
        let thumbnail_count = entries.iter().filter(|e| e.is_thumbnail()).count();
        Ok(StoreStats {
            total_size: entries.iter().map(|e| e.size).sum(),
            entry_count: entries.len(),
            thumbnail_count,
            metadata_count: entries.len() - thumbnail_count,
            oldest: entries.into_iter().min_by_key(|e| e.stored_at),
        })
    }

    fn temp_path(&self, file_name: &str) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!(
            ".{}.{}.{}{}",
            file_name,
            std::process::id(),
            n,
            TEMP_SUFFIX
        ))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let to_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(to_err)?;
    file.write_all(bytes).map_err(to_err)?;
    file.sync_all().map_err(to_err)
}

fn remove_entry(path: &Path) -> StoreResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StoreError::Delete {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(TEMP_SUFFIX))
}

fn system_time_millis(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
