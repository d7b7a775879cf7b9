//! Manifest parsing for `cdnsync.yaml`.

use crate::model::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "cdnsync.yaml";

/// Placeholder replaced by the library name in destination templates.
pub const LIBRARY_PLACEHOLDER: &str = "{library_name}";

/// A parsed manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Project name, informational only.
    #[serde(default)]
    pub project_name: String,
    /// Destination template, e.g. `./static/vendor/{library_name}`.
    #[serde(default)]
    pub destination: String,
    /// Default provider for every library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<String>,
    /// Libraries keyed by name.
    #[serde(default)]
    pub libraries: BTreeMap<String, LibrarySpec>,
    /// Directory relative destinations resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// One library section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySpec {
    #[serde(default)]
    pub version: String,
    /// Provider override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cdn: Option<String>,
    /// Allow-list of paths or path prefixes. Empty means every file.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    /// Destination override, same template rules as the manifest default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// A validated library with its provider and destination resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub library: String,
    pub version: String,
    pub provider: Provider,
    pub files: Vec<String>,
    pub destination: PathBuf,
}

/// Errors that can occur when loading or validating a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown provider '{name}' (expected unpkg, cdnjs or jsdelivr)")]
    UnknownProvider { name: String },
    #[error("library {0} has no version")]
    MissingVersion(String),
    #[error("no destination configured for library {0}")]
    MissingDestination(String),
    #[error("library {0} is not in the manifest")]
    UnknownLibrary(String),
}

fn parse_provider(name: &str) -> Result<Provider, ManifestError> {
    Provider::from_id(name.trim()).ok_or_else(|| ManifestError::UnknownProvider {
        name: name.to_string(),
    })
}

impl Manifest {
    /// Load a manifest from a file path. Relative destinations resolve
    /// against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut manifest = Self::from_str(&contents)?;
        manifest.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(manifest)
    }

    /// Parse a manifest from a YAML string. Relative destinations resolve
    /// against the current directory.
    pub fn from_str(s: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_yaml::from_str(s)?;
        Ok(manifest)
    }

    /// Provider for a library: its own `cdn`, else the manifest default,
    /// else [`Provider::FALLBACK`].
    pub fn resolve_provider(&self, library: &LibrarySpec) -> Result<Provider, ManifestError> {
        match library.cdn.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(name) => parse_provider(name),
            None => self.default_provider(),
        }
    }

    /// Manifest-level provider, or the fallback.
    pub fn default_provider(&self) -> Result<Provider, ManifestError> {
        match self.cdn.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(name) => parse_provider(name),
            None => Ok(Provider::FALLBACK),
        }
    }

    /// Directory a library's files are written to.
    pub fn library_destination(
        &self,
        name: &str,
        library: &LibrarySpec,
    ) -> Result<PathBuf, ManifestError> {
        let template = library
            .output_path
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.destination);

        if template.trim().is_empty() {
            return Err(ManifestError::MissingDestination(name.to_string()));
        }

        let resolved = PathBuf::from(template.replace(LIBRARY_PLACEHOLDER, name));
        if resolved.is_absolute() {
            Ok(resolved)
        } else {
            Ok(self.base_dir.join(resolved))
        }
    }

    /// Resolve a single library by name.
    pub fn entry(&self, name: &str) -> Result<ManifestEntry, ManifestError> {
        let library = self
            .libraries
            .get(name)
            .ok_or_else(|| ManifestError::UnknownLibrary(name.to_string()))?;

        if library.version.trim().is_empty() {
            return Err(ManifestError::MissingVersion(name.to_string()));
        }

        Ok(ManifestEntry {
            library: name.to_string(),
            version: library.version.trim().to_string(),
            provider: self.resolve_provider(library)?,
            files: library.files.clone(),
            destination: self.library_destination(name, library)?,
        })
    }

    /// Validate and resolve every library, in name order.
    pub fn entries(&self) -> Result<Vec<ManifestEntry>, ManifestError> {
        self.default_provider()?;
        self.libraries.keys().map(|name| self.entry(name)).collect()
    }

    /// Check every library without resolving anything else.
    pub fn validate(&self) -> Result<(), ManifestError> {
        self.entries().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EXAMPLE: &str = r#"
project_name: demo
destination: ./static/vendor/{library_name}
cdn: jsdelivr
libraries:
  jquery:
    version: 3.7.1
    cdn: unpkg
    files: [dist/]
    output_path: ./js/jq
  htmx.org:
    version: 1.9.10
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = Manifest::from_str(EXAMPLE).unwrap();
        assert_eq!(manifest.project_name, "demo");
        assert_eq!(manifest.libraries.len(), 2);

        let jquery = &manifest.libraries["jquery"];
        assert_eq!(jquery.version, "3.7.1");
        assert_eq!(jquery.files, vec!["dist/"]);
        assert_eq!(jquery.output_path.as_deref(), Some("./js/jq"));
    }

    #[test]
    fn provider_precedence() {
        let manifest = Manifest::from_str(EXAMPLE).unwrap();
        assert_eq!(
            manifest.resolve_provider(&manifest.libraries["jquery"]).unwrap(),
            Provider::Unpkg
        );
        assert_eq!(
            manifest.resolve_provider(&manifest.libraries["htmx.org"]).unwrap(),
            Provider::Jsdelivr
        );

        let bare = Manifest::from_str("destination: out\nlibraries:\n  a:\n    version: 1.0.0\n")
            .unwrap();
        assert_eq!(
            bare.resolve_provider(&bare.libraries["a"]).unwrap(),
            Provider::FALLBACK
        );
    }

    #[test]
    fn destination_substitution() {
        let manifest = Manifest::from_str(EXAMPLE).unwrap();
        assert_eq!(
            manifest
                .library_destination("htmx.org", &manifest.libraries["htmx.org"])
                .unwrap(),
            PathBuf::from("./static/vendor/htmx.org")
        );
        assert_eq!(
            manifest
                .library_destination("jquery", &manifest.libraries["jquery"])
                .unwrap(),
            PathBuf::from("./js/jq")
        );
    }

    #[test]
    fn relative_destination_uses_manifest_dir() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(MANIFEST_FILE);
        std::fs::write(&path, EXAMPLE).unwrap();

        let manifest = Manifest::from_path(&path).unwrap();
        let entry = manifest.entry("htmx.org").unwrap();
        assert_eq!(
            entry.destination,
            temp.path().join("./static/vendor/htmx.org")
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let manifest =
            Manifest::from_str("destination: out\ncdn: bower\nlibraries:\n  a:\n    version: 1.0.0\n")
                .unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(matches!(err, ManifestError::UnknownProvider { ref name } if name == "bower"));
    }

    #[test]
    fn missing_version_is_rejected() {
        let manifest =
            Manifest::from_str("destination: out\nlibraries:\n  a:\n    files: [x.js]\n").unwrap();
        assert!(matches!(
            manifest.validate().unwrap_err(),
            ManifestError::MissingVersion(name) if name == "a"
        ));
    }

    #[test]
    fn missing_destination_is_rejected() {
        let manifest = Manifest::from_str("libraries:\n  a:\n    version: 1.0.0\n").unwrap();
        assert!(matches!(
            manifest.validate().unwrap_err(),
            ManifestError::MissingDestination(name) if name == "a"
        ));

        let with_override = Manifest::from_str(
            "libraries:\n  a:\n    version: 1.0.0\n    output_path: vendor/a\n",
        )
        .unwrap();
        assert!(with_override.validate().is_ok());
    }

    #[test]
    fn missing_file() {
        let err = Manifest::from_path("/nonexistent/cdnsync.yaml").unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[test]
    fn invalid_yaml() {
        let err = Manifest::from_str("libraries: [unclosed").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
