//! Canonical, provider-independent records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Supported content-delivery providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// unpkg.com, versions from the npm registry
    Unpkg,
    /// cdnjs.com
    Cdnjs,
    /// jsdelivr.com
    Jsdelivr,
}

impl Provider {
    /// Used when neither the library nor the manifest names a provider.
    pub const FALLBACK: Provider = Provider::Unpkg;

    pub const ALL: [Provider; 3] = [Provider::Unpkg, Provider::Cdnjs, Provider::Jsdelivr];

    /// Get the string identifier for this provider.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::Unpkg => "unpkg",
            Provider::Cdnjs => "cdnjs",
            Provider::Jsdelivr => "jsdelivr",
        }
    }

    /// Parse from string identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "unpkg" => Some(Provider::Unpkg),
            "cdnjs" => Some(Provider::Cdnjs),
            "jsdelivr" => Some(Provider::Jsdelivr),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One fetchable file of a published package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Slash-separated path relative to the package root, without a leading
    /// separator.
    pub path: String,
    /// Absolute download URL.
    pub url: String,
    /// Size in bytes, 0 when the provider does not report it.
    pub size: u64,
    /// SRI-style integrity string when the provider exposes one. Never
    /// verified.
    pub integrity: Option<String>,
}

/// Versions published for a library.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSet {
    /// Raw version strings, unordered.
    pub versions: BTreeSet<String>,
    /// Tag -> version (e.g. "latest" -> "3.7.1").
    pub latest: BTreeMap<String, String>,
}

impl VersionSet {
    /// Version carrying the `latest` tag.
    pub fn latest(&self) -> Option<&str> {
        self.latest.get("latest").map(String::as_str)
    }

    pub fn contains(&self, version: &str) -> bool {
        self.versions.contains(version)
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Parseable versions, newest first. See [`crate::sort_descending`].
    pub fn sorted(&self) -> Vec<String> {
        let versions: Vec<String> = self.versions.iter().cloned().collect();
        crate::version::sort_descending(&versions)
    }
}

/// A planned, not yet executed file download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub library: String,
    pub version: String,
    pub provider: Provider,
    /// Path of the file inside the package.
    pub remote_path: String,
    /// Where the file lands on disk.
    pub local_path: PathBuf,
    pub url: String,
    /// Expected size, 0 if unknown.
    pub size: u64,
}
