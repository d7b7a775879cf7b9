//! Cache keys for both tiers.

use crate::StoreError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Key for a metadata-tier entry.
///
/// Identifies one provider API response: the provider, the kind of request
/// (file listing, version listing, ...), the library and, for per-version
/// requests, the version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    provider: String,
    kind: String,
    library: String,
    version: Option<String>,
}

impl MetadataKey {
    /// Key for a request that is not tied to a version.
    pub fn new(
        provider: impl Into<String>,
        kind: impl Into<String>,
        library: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind: kind.into(),
            library: library.into(),
            version: None,
        }
    }

    /// Attach a version to the key.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// File name of the entry inside the metadata directory.
    ///
    /// The key is hashed so library names never have to be valid file names.
    pub fn file_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.to_string().as_bytes());
        format!("{:x}.json", hasher.finalize())
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.provider, self.kind, self.library)?;
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// Key for a package-tier file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    /// Provider id (e.g. "jsdelivr").
    pub provider: String,
    /// Library name; scoped names such as `@scope/name` nest one level deeper.
    pub library: String,
    /// Library version.
    pub version: String,
    /// Slash-separated path of the file inside the package.
    pub path: String,
}

impl PackageKey {
    pub fn new(
        provider: impl Into<String>,
        library: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            library: library.into(),
            version: version.into(),
            path: path.into(),
        }
    }

    /// Relative location `{provider}/{library}/{version}/{path}` below the
    /// packages directory.
    ///
    /// Rejects empty, `.` and `..` segments so a key can never resolve
    /// outside the cache root.
    pub(crate) fn relative_path(&self) -> Result<PathBuf, StoreError> {
        let mut path = PathBuf::new();
        for part in [&self.provider, &self.library, &self.version, &self.path] {
            for segment in part.split('/') {
                if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\')
                {
                    return Err(StoreError::InvalidKey(self.to_string()));
                }
                path.push(segment);
            }
        }
        Ok(path)
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.provider, self.library, self.version, self.path
        )
    }
}
