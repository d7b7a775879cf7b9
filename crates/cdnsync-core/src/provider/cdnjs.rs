//! cdnjs: flat path lists with an SRI map, no sizes.

use super::{
    FetchContext, ProviderAdapter, ProviderError, base_url, clean_relative_path, fetch_json_cached,
};
use crate::model::{FileEntry, Provider, VersionSet};
use cdnsync_store::MetadataKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// cdnjs adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cdnjs;

/// Response of `/libraries/{library}/{version}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct VersionResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "rawFiles")]
    pub raw_files: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub sri: BTreeMap<String, String>,
}

/// Response of `/libraries/{library}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct LibraryResponse {
    #[serde(default)]
    pub name: String,
    /// The latest version.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub versions: Vec<String>,
}

pub(crate) fn normalize_version(
    response: &VersionResponse,
    host: &str,
    library: &str,
    version: &str,
) -> Vec<FileEntry> {
    let base = base_url(host);
    let paths = if response.files.is_empty() {
        &response.raw_files
    } else {
        &response.files
    };

    paths
        .iter()
        .filter_map(|raw| {
            let path = clean_relative_path(raw)?;
            Some(FileEntry {
                path: path.to_string(),
                url: format!("{base}/ajax/libs/{library}/{version}/{path}"),
                size: 0,
                integrity: response
                    .sri
                    .get(raw.as_str())
                    .or_else(|| response.sri.get(path))
                    .cloned(),
            })
        })
        .collect()
}

pub(crate) fn normalize_library(response: LibraryResponse) -> VersionSet {
    let mut latest = BTreeMap::new();
    if !response.version.is_empty() {
        latest.insert("latest".to_string(), response.version);
    }
    VersionSet {
        versions: response.versions.into_iter().collect(),
        latest,
    }
}

impl ProviderAdapter for Cdnjs {
    fn provider(&self) -> Provider {
        Provider::Cdnjs
    }

    fn fetch_file_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
        version: &str,
    ) -> Result<Vec<FileEntry>, ProviderError> {
        let url = format!(
            "{}/libraries/{library}/{version}",
            base_url(&ctx.endpoints.cdnjs_api)
        );
        let key = MetadataKey::new("cdnjs", "version", library).with_version(version);
        let response: VersionResponse = fetch_json_cached(ctx, &key, &url)?;
        Ok(normalize_version(
            &response,
            &ctx.endpoints.cdnjs_cdn,
            library,
            version,
        ))
    }

    fn fetch_version_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
    ) -> Result<VersionSet, ProviderError> {
        let url = format!("{}/libraries/{library}", base_url(&ctx.endpoints.cdnjs_api));
        let key = MetadataKey::new("cdnjs", "versions", library);
        let response: LibraryResponse = fetch_json_cached(ctx, &key, &url)?;
        Ok(normalize_library(response))
    }
}
