//! unpkg: file listings from `?meta`, versions from the npm registry.

use super::{
    FetchContext, ProviderAdapter, ProviderError, base_url, clean_relative_path, fetch_json_cached,
};
use crate::model::{FileEntry, Provider, VersionSet};
use cdnsync_store::MetadataKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// unpkg adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unpkg;

/// Response of `/{library}@{version}/?meta`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MetaResponse {
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub files: Vec<MetaFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct MetaFile {
    pub path: String,
    #[serde(default)]
    pub size: u64,
    /// A MIME type such as `text/javascript`, not a node kind.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub integrity: Option<String>,
}

/// npm registry package document, reduced to what version listing needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct RegistryDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionStub>,
}

/// Per-version manifests are dropped; only the keys matter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct VersionStub {}

pub(crate) fn normalize_meta(
    meta: &MetaResponse,
    host: &str,
    library: &str,
    version: &str,
) -> Vec<FileEntry> {
    let base = base_url(host);
    meta.files
        .iter()
        .filter(|file| file.kind != "directory")
        .filter_map(|file| {
            let path = clean_relative_path(&file.path)?;
            Some(FileEntry {
                path: path.to_string(),
                url: format!("{base}/{library}@{version}/{path}"),
                size: file.size,
                integrity: file.integrity.clone().filter(|s| !s.is_empty()),
            })
        })
        .collect()
}

pub(crate) fn normalize_registry(document: RegistryDocument) -> VersionSet {
    VersionSet {
        versions: document.versions.into_keys().collect(),
        latest: document.dist_tags,
    }
}

impl ProviderAdapter for Unpkg {
    fn provider(&self) -> Provider {
        Provider::Unpkg
    }

    fn fetch_file_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
        version: &str,
    ) -> Result<Vec<FileEntry>, ProviderError> {
        let url = format!(
            "{}/{library}@{version}/?meta",
            base_url(&ctx.endpoints.unpkg)
        );
        let key = MetadataKey::new("unpkg", "meta", library).with_version(version);
        let meta: MetaResponse = fetch_json_cached(ctx, &key, &url)?;
        Ok(normalize_meta(&meta, &ctx.endpoints.unpkg, library, version))
    }

    fn fetch_version_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
    ) -> Result<VersionSet, ProviderError> {
        let url = format!("{}/{library}", base_url(&ctx.endpoints.npm_registry));
        let key = MetadataKey::new("unpkg", "versions", library);
        let document: RegistryDocument = fetch_json_cached(ctx, &key, &url)?;
        Ok(normalize_registry(document))
    }
}
