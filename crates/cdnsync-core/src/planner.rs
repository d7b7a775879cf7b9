//! Sync planning: which files does the manifest still need?

use crate::manifest::{Manifest, ManifestEntry, ManifestError};
use crate::model::{DownloadTask, FileEntry};
use crate::provider::{FetchContext, ProviderError, ensure_version_available};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Flags that change what gets planned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    /// Plan every file, even ones already on disk.
    pub force: bool,
    /// Check each version against the provider's version list first.
    pub verify_versions: bool,
}

/// Answers whether a local file already exists.
pub trait FsProbe {
    fn exists(&self, path: &Path) -> bool;
}

/// [`FsProbe`] over the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FsProbe for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Errors from planning.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("{library}: {source}")]
    Provider {
        library: String,
        #[source]
        source: ProviderError,
    },
}

/// True when `path` is allowed by `patterns`: an exact match or a prefix
/// match against any pattern. No patterns allows everything.
pub fn matches_filter(path: &str, patterns: &[String]) -> bool {
    let mut patterns = patterns
        .iter()
        .map(|p| p.trim().trim_start_matches('/'))
        .filter(|p| !p.is_empty())
        .peekable();

    if patterns.peek().is_none() {
        return true;
    }
    patterns.any(|pattern| path == pattern || path.starts_with(pattern))
}

/// Keep only the entries allowed by `patterns`.
pub fn filter_files(files: Vec<FileEntry>, patterns: &[String]) -> Vec<FileEntry> {
    files
        .into_iter()
        .filter(|file| matches_filter(&file.path, patterns))
        .collect()
}

/// Local path of a remote file under `destination`, or `None` when a
/// segment would resolve anywhere but a plain child directory.
fn local_path(destination: &Path, remote_path: &str) -> Option<PathBuf> {
    let mut path = destination.to_path_buf();
    for segment in remote_path.split('/').filter(|segment| !segment.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => path.push(name),
            _ => return None,
        }
    }
    (path.as_path() != destination).then_some(path)
}

/// Compute the downloads needed to satisfy `manifest`.
///
/// The manifest is validated before any request is made. Libraries are
/// visited in name order and files in provider order.
pub fn plan(
    manifest: &Manifest,
    ctx: &FetchContext<'_>,
    probe: &dyn FsProbe,
    options: &PlanOptions,
) -> Result<Vec<DownloadTask>, PlanError> {
    let entries = manifest.entries()?;

    let mut tasks = Vec::new();
    let mut seen = HashSet::new();

    for entry in &entries {
        let files = library_files(entry, ctx, options)?;
        let mut skipped = 0usize;

        for file in files {
            if !seen.insert((entry.library.clone(), file.path.clone())) {
                continue;
            }

            let Some(local_path) = local_path(&entry.destination, &file.path) else {
                warn!(library = %entry.library, path = %file.path, "skipping file outside destination");
                continue;
            };
            if !options.force && probe.exists(&local_path) {
                skipped += 1;
                continue;
            }

            tasks.push(DownloadTask {
                library: entry.library.clone(),
                version: entry.version.clone(),
                provider: entry.provider,
                remote_path: file.path,
                local_path,
                url: file.url,
                size: file.size,
            });
        }

        debug!(library = %entry.library, skipped, "already present");
    }

    info!(tasks = tasks.len(), libraries = entries.len(), "planned sync");
    Ok(tasks)
}

fn library_files(
    entry: &ManifestEntry,
    ctx: &FetchContext<'_>,
    options: &PlanOptions,
) -> Result<Vec<FileEntry>, PlanError> {
    let wrap = |source: ProviderError| PlanError::Provider {
        library: entry.library.clone(),
        source,
    };

    if options.verify_versions {
        ensure_version_available(ctx, entry.provider, &entry.library, &entry.version)
            .map_err(wrap)?;
    }

    let files = entry
        .provider
        .adapter()
        .fetch_file_list(ctx, &entry.library, &entry.version)
        .map_err(wrap)?;
    let total = files.len();
    let files = filter_files(files, &entry.files);

    debug!(
        library = %entry.library,
        version = %entry.version,
        provider = %entry.provider,
        total,
        selected = files.len(),
        "file list"
    );
    Ok(files)
}
