//! Metadata tier: expiring JSON entries keyed by request.

use crate::{CacheStore, MetadataKey, StoreError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// One metadata record as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Human-readable key (the file name is its hash).
    pub key: String,
    /// Cached payload.
    pub data: serde_json::Value,
    /// When the entry was written.
    pub written_at: DateTime<Utc>,
    /// Lifetime in seconds.
    pub ttl_secs: u64,
}

impl CacheEntry {
    /// An entry is readable while `now - written_at <= ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.written_at).num_seconds();
        age <= 0 || u64::try_from(age).is_ok_and(|age| age <= self.ttl_secs)
    }

    /// Read and parse an entry. Missing, unreadable and corrupt files all
    /// yield `None`.
    pub(crate) fn read(path: &Path) -> Option<Self> {
        let contents = fs::read(path).ok()?;
        match serde_json::from_slice(&contents) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring corrupt cache entry");
                None
            }
        }
    }
}

impl CacheStore {
    /// Look up a metadata entry. Expired and corrupt entries are misses.
    pub fn get_metadata<T: DeserializeOwned>(&self, key: &MetadataKey) -> Option<T> {
        self.get_metadata_at(key, Utc::now())
    }

    /// [`get_metadata`](Self::get_metadata) evaluated at a given instant.
    pub fn get_metadata_at<T: DeserializeOwned>(
        &self,
        key: &MetadataKey,
        now: DateTime<Utc>,
    ) -> Option<T> {
        if !self.enabled {
            return None;
        }

        let path = self.metadata_dir.join(key.file_name());
        let entry = CacheEntry::read(&path)?;

        if !entry.is_fresh_at(now) {
            debug!(key = %key, "metadata entry expired");
            let _ = fs::remove_file(&path);
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(value) => {
                debug!(key = %key, "metadata cache hit");
                Some(value)
            }
            Err(e) => {
                debug!(key = %key, error = %e, "cached payload does not match expected shape");
                None
            }
        }
    }

    /// Store a metadata entry with the store's ttl.
    pub fn set_metadata<T: Serialize>(&self, key: &MetadataKey, value: &T) -> Result<(), StoreError> {
        self.set_metadata_at(key, value, Utc::now(), self.ttl)
    }

    /// Store a metadata entry with an explicit write time and ttl.
    pub fn set_metadata_at<T: Serialize>(
        &self,
        key: &MetadataKey,
        value: &T,
        written_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if !self.enabled {
            return Ok(());
        }

        let entry = CacheEntry {
            key: key.to_string(),
            data: serde_json::to_value(value)?,
            written_at,
            ttl_secs: ttl.as_secs(),
        };
        let contents = serde_json::to_vec(&entry)?;

        fs::create_dir_all(&self.metadata_dir).map_err(StoreError::CreateDir)?;
        fs::write(self.metadata_dir.join(key.file_name()), contents).map_err(StoreError::WriteFile)?;
        Ok(())
    }

    /// Delete every expired metadata entry, returning how many were removed.
    /// Corrupt entries are left alone; package files never expire.
    pub fn clear_expired_metadata(&self) -> Result<usize, StoreError> {
        self.clear_expired_metadata_at(Utc::now())
    }

    /// [`clear_expired_metadata`](Self::clear_expired_metadata) evaluated at
    /// a given instant.
    pub fn clear_expired_metadata_at(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        if !self.enabled {
            return Ok(0);
        }

        let mut removed = 0;
        for (path, _) in self.metadata_files()? {
            let Some(entry) = CacheEntry::read(&path) else {
                continue;
            };
            if !entry.is_fresh_at(now) && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        debug!(removed, "swept expired metadata entries");
        Ok(removed)
    }
}
