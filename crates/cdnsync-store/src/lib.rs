//! Two-tier cache for cdnsync.
//!
//! Both tiers share one root directory:
//! - `<root>/metadata/<sha256>.json`: provider API responses, expiring after
//!   a ttl (24 hours by default). Expiry is lazy: a stale read deletes the
//!   entry and reports a miss. [`CacheStore::clear_expired_metadata`] sweeps
//!   on demand; there is no background thread.
//! - `<root>/packages/<provider>/<library>/<version>/<path>`: downloaded
//!   package files, kept until explicitly cleared.
//!
//! The store does no file locking and assumes a single process.

mod key;
mod metadata;
mod package;

pub use key::{MetadataKey, PackageKey};
pub use metadata::CacheEntry;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Default ttl for metadata entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Suffix of files being written, renamed into place when complete.
pub const PARTIAL_SUFFIX: &str = ".cdnsync-part";

const METADATA_DIR: &str = "metadata";
const PACKAGES_DIR: &str = "packages";

/// How the cache should be opened.
///
/// Built once from user config and CLI flags, then turned into a
/// [`CacheStore`] that is passed by reference to everything that caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// When false every read misses and every write is dropped.
    pub enabled: bool,
    /// Ttl for metadata entries.
    pub ttl: Duration,
    /// Cache root; `None` uses [`CacheSettings::default_root`].
    pub root: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_TTL,
            root: None,
        }
    }
}

impl CacheSettings {
    /// Default cache root (~/.cache/cdnsync on Linux).
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("cdnsync")
    }
}

/// The on-disk cache.
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    metadata_dir: PathBuf,
    packages_dir: PathBuf,
    ttl: Duration,
    enabled: bool,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub enabled: bool,
    pub root: PathBuf,
    pub ttl: Duration,
    /// Number of metadata entries, fresh or expired.
    pub metadata_entries: usize,
    /// Metadata entries past their ttl (still on disk until read or swept).
    pub expired_entries: usize,
    pub metadata_bytes: u64,
    pub package_files: usize,
    pub package_bytes: u64,
}

impl CacheStats {
    pub fn total_bytes(&self) -> u64 {
        self.metadata_bytes + self.package_bytes
    }
}

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to create directory: {0}")]
    CreateDir(#[source] io::Error),
    #[error("failed to read file: {0}")]
    ReadFile(#[source] io::Error),
    #[error("failed to write file: {0}")]
    WriteFile(#[source] io::Error),
    #[error("failed to remove cache data: {0}")]
    Remove(#[source] io::Error),
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid package key: {0}")]
    InvalidKey(String),
}

impl CacheStore {
    /// Open the cache described by `settings`, creating both tier
    /// directories. A disabled cache touches nothing on disk.
    pub fn open(settings: &CacheSettings) -> Result<Self, StoreError> {
        let root = settings
            .root
            .clone()
            .unwrap_or_else(CacheSettings::default_root);

        if !settings.enabled {
            return Ok(Self::disabled_at(root, settings.ttl));
        }

        Self::with_root(root, settings.ttl)
    }

    /// Open an enabled cache at a custom root.
    pub fn with_root(root: PathBuf, ttl: Duration) -> Result<Self, StoreError> {
        let store = Self {
            metadata_dir: root.join(METADATA_DIR),
            packages_dir: root.join(PACKAGES_DIR),
            root,
            ttl,
            enabled: true,
        };
        store.create_dirs()?;
        Ok(store)
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self::disabled_at(CacheSettings::default_root(), DEFAULT_TTL)
    }

    fn disabled_at(root: PathBuf, ttl: Duration) -> Self {
        Self {
            metadata_dir: root.join(METADATA_DIR),
            packages_dir: root.join(PACKAGES_DIR),
            root,
            ttl,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remove every entry from both tiers.
    pub fn clear(&self) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }

        remove_dir_if_exists(&self.metadata_dir)?;
        remove_dir_if_exists(&self.packages_dir)?;
        self.create_dirs()?;

        tracing::info!(root = %self.root.display(), "cache cleared");
        Ok(())
    }

    /// Remove every package file, leaving metadata untouched.
    pub fn clear_packages(&self) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }

        remove_dir_if_exists(&self.packages_dir)?;
        fs::create_dir_all(&self.packages_dir).map_err(StoreError::CreateDir)?;

        tracing::info!(dir = %self.packages_dir.display(), "package cache cleared");
        Ok(())
    }

    /// Collect entry counts and sizes for both tiers.
    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        let mut stats = CacheStats {
            enabled: self.enabled,
            root: self.root.clone(),
            ttl: self.ttl,
            ..CacheStats::default()
        };

        if !self.enabled {
            return Ok(stats);
        }

        let now = chrono::Utc::now();
        for (path, size) in self.metadata_files()? {
            stats.metadata_entries += 1;
            stats.metadata_bytes += size;

            // Unreadable entries count toward size but are neither fresh nor expired.
            if let Some(entry) = CacheEntry::read(&path)
                && !entry.is_fresh_at(now)
            {
                stats.expired_entries += 1;
            }
        }

        for entry in WalkDir::new(&self.packages_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                stats.package_files += 1;
                stats.package_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }

        Ok(stats)
    }

    /// All regular files in the metadata directory with their sizes.
    fn metadata_files(&self) -> Result<Vec<(PathBuf, u64)>, StoreError> {
        let mut files = Vec::new();

        if !self.metadata_dir.exists() {
            return Ok(files);
        }

        for entry in fs::read_dir(&self.metadata_dir).map_err(StoreError::ReadFile)? {
            let entry = entry.map_err(StoreError::ReadFile)?;
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_file() {
                files.push((entry.path(), meta.len()));
            }
        }

        files.sort();
        Ok(files)
    }

    fn create_dirs(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.metadata_dir).map_err(StoreError::CreateDir)?;
        fs::create_dir_all(&self.packages_dir).map_err(StoreError::CreateDir)?;
        Ok(())
    }
}

/// Where `path` is staged while it is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), StoreError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StoreError::Remove(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> CacheStore {
        CacheStore::with_root(temp.path().join("cache"), DEFAULT_TTL).unwrap()
    }

    #[test]
    fn open_creates_tier_directories() {
        let temp = TempDir::new().unwrap();
        let settings = CacheSettings {
            root: Some(temp.path().join("root")),
            ..CacheSettings::default()
        };

        let store = CacheStore::open(&settings).unwrap();
        assert!(store.is_enabled());
        assert!(temp.path().join("root/metadata").is_dir());
        assert!(temp.path().join("root/packages").is_dir());
    }

    #[test]
    fn disabled_store_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let settings = CacheSettings {
            enabled: false,
            root: Some(temp.path().join("root")),
            ..CacheSettings::default()
        };

        let store = CacheStore::open(&settings).unwrap();
        assert!(!store.is_enabled());
        assert!(!temp.path().join("root").exists());

        let key = MetadataKey::new("unpkg", "versions", "react");
        store.set_metadata(&key, &vec!["18.2.0"]).unwrap();
        assert!(store.get_metadata::<Vec<String>>(&key).is_none());

        let stats = store.stats().unwrap();
        assert!(!stats.enabled);
        assert_eq!(stats.metadata_entries, 0);
    }

    #[test]
    fn stats_counts_both_tiers() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        store
            .set_metadata(&MetadataKey::new("cdnjs", "versions", "jquery"), &"x")
            .unwrap();
        store
            .set_metadata(&MetadataKey::new("cdnjs", "versions", "lodash"), &"y")
            .unwrap();
        store
            .put_package(&PackageKey::new("unpkg", "react", "18.2.0", "index.js"), b"abc")
            .unwrap();
        store
            .put_package(
                &PackageKey::new("unpkg", "react", "18.2.0", "umd/react.js"),
                b"abcdef",
            )
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.metadata_entries, 2);
        assert_eq!(stats.expired_entries, 0);
        assert!(stats.metadata_bytes > 0);
        assert_eq!(stats.package_files, 2);
        assert_eq!(stats.package_bytes, 9);
        assert_eq!(stats.total_bytes(), stats.metadata_bytes + 9);
    }

    #[test]
    fn clear_empties_both_tiers() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let meta = MetadataKey::new("jsdelivr", "versions", "vue");
        let pkg = PackageKey::new("jsdelivr", "vue", "3.4.0", "dist/vue.js");
        store.set_metadata(&meta, &1).unwrap();
        store.put_package(&pkg, b"vue").unwrap();

        store.clear().unwrap();

        assert!(store.get_metadata::<i32>(&meta).is_none());
        assert!(!store.has_package(&pkg));
        let stats = store.stats().unwrap();
        assert_eq!(stats.metadata_entries, 0);
        assert_eq!(stats.package_files, 0);
    }

    #[test]
    fn clear_packages_keeps_metadata() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let meta = MetadataKey::new("jsdelivr", "versions", "vue");
        let pkg = PackageKey::new("jsdelivr", "vue", "3.4.0", "dist/vue.js");
        store.set_metadata(&meta, &1).unwrap();
        store.put_package(&pkg, b"vue").unwrap();

        store.clear_packages().unwrap();

        assert_eq!(store.get_metadata::<i32>(&meta), Some(1));
        assert!(!store.has_package(&pkg));
        assert!(temp.path().join("cache/packages").is_dir());
    }
}
