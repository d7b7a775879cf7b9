//! Package tier: downloaded files, never expired.

use crate::{CacheStore, PackageKey, StoreError, partial_path};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

impl CacheStore {
    /// Absolute location of a package file in the cache.
    pub fn package_path(&self, key: &PackageKey) -> Result<PathBuf, StoreError> {
        Ok(self.packages_dir.join(key.relative_path()?))
    }

    /// Check if a package file is cached.
    pub fn has_package(&self, key: &PackageKey) -> bool {
        self.enabled
            && self
                .package_path(key)
                .map(|path| path.is_file())
                .unwrap_or(false)
    }

    /// Read a cached package file.
    pub fn get_package(&self, key: &PackageKey) -> Result<Option<Vec<u8>>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.package_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFile(e)),
        }
    }

    /// Store package file bytes. Returns the cached path, or `None` when the
    /// cache is disabled.
    pub fn put_package(&self, key: &PackageKey, bytes: &[u8]) -> Result<Option<PathBuf>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.prepare_package_path(key)?;
        fs::write(&path, bytes).map_err(StoreError::WriteFile)?;
        Ok(Some(path))
    }

    /// Copy an existing file into the package tier.
    pub fn put_package_from(
        &self,
        key: &PackageKey,
        source: &Path,
    ) -> Result<Option<PathBuf>, StoreError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.prepare_package_path(key)?;
        copy_staged(source, &path).map_err(StoreError::WriteFile)?;
        Ok(Some(path))
    }

    /// Copy a cached package file to `dest`, creating parent directories.
    /// Returns the number of bytes copied, or `None` on a miss. `dest` only
    /// ever holds the complete file.
    pub fn restore_package(&self, key: &PackageKey, dest: &Path) -> Result<Option<u64>, StoreError> {
        if !self.has_package(key) {
            return Ok(None);
        }

        let source = self.package_path(key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
        }
        let copied = copy_staged(&source, dest).map_err(StoreError::WriteFile)?;
        Ok(Some(copied))
    }

    fn prepare_package_path(&self, key: &PackageKey) -> Result<PathBuf, StoreError> {
        let path = self.package_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StoreError::CreateDir)?;
        }
        Ok(path)
    }
}

/// Copy to a partial file next to `dest`, then rename it into place.
fn copy_staged(source: &Path, dest: &Path) -> io::Result<u64> {
    let partial = partial_path(dest);
    let result = fs::copy(source, &partial).and_then(|copied| {
        fs::rename(&partial, dest)?;
        Ok(copied)
    });
    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}
