//! jsDelivr: recursive file trees from the data API.

use super::{
    FetchContext, ProviderAdapter, ProviderError, base_url, clean_relative_path, fetch_json_cached,
};
use crate::model::{FileEntry, Provider, VersionSet};
use cdnsync_store::MetadataKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// jsDelivr adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jsdelivr;

/// Response of `/v1/packages/npm/{library}@{version}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct PackageResponse {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub files: Vec<TreeNode>,
}

/// A `"file"` or `"directory"` node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TreeNode {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub files: Vec<TreeNode>,
}

/// Response of `/v1/packages/npm/{library}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct VersionsResponse {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub versions: Vec<VersionRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct VersionRecord {
    pub version: String,
}

/// Depth-first flattening of a file tree.
pub(crate) fn flatten(
    nodes: &[TreeNode],
    host: &str,
    library: &str,
    version: &str,
) -> Vec<FileEntry> {
    let base = base_url(host);
    let mut out = Vec::new();
    walk(nodes, "", &base, library, version, &mut out);
    out
}

fn walk(
    nodes: &[TreeNode],
    prefix: &str,
    base: &str,
    library: &str,
    version: &str,
    out: &mut Vec<FileEntry>,
) {
    for node in nodes {
        let name = node.name.trim_matches('/');
        let path = if prefix.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}/{name}")
        };

        match node.kind.as_str() {
            "directory" => walk(&node.files, &path, base, library, version, out),
            "file" => {
                let Some(path) = clean_relative_path(&path) else {
                    continue;
                };
                out.push(FileEntry {
                    url: format!("{base}/npm/{library}@{version}/{path}"),
                    size: node.size,
                    integrity: node
                        .hash
                        .as_deref()
                        .filter(|h| !h.is_empty())
                        .map(|h| format!("sha256-{h}")),
                    path: path.to_string(),
                });
            }
            _ => {}
        }
    }
}

pub(crate) fn normalize_versions(response: VersionsResponse) -> VersionSet {
    VersionSet {
        versions: response.versions.into_iter().map(|v| v.version).collect(),
        latest: response.tags,
    }
}

impl ProviderAdapter for Jsdelivr {
    fn provider(&self) -> Provider {
        Provider::Jsdelivr
    }

    fn fetch_file_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
        version: &str,
    ) -> Result<Vec<FileEntry>, ProviderError> {
        let url = format!(
            "{}/v1/packages/npm/{library}@{version}",
            base_url(&ctx.endpoints.jsdelivr_data)
        );
        let key = MetadataKey::new("jsdelivr", "package", library).with_version(version);
        let response: PackageResponse = fetch_json_cached(ctx, &key, &url)?;
        Ok(flatten(
            &response.files,
            &ctx.endpoints.jsdelivr_cdn,
            library,
            version,
        ))
    }

    fn fetch_version_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
    ) -> Result<VersionSet, ProviderError> {
        let url = format!(
            "{}/v1/packages/npm/{library}",
            base_url(&ctx.endpoints.jsdelivr_data)
        );
        let key = MetadataKey::new("jsdelivr", "versions", library);
        let response: VersionsResponse = fetch_json_cached(ctx, &key, &url)?;
        Ok(normalize_versions(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::MockClient;
    use crate::provider::tests::with_ctx;
    use cdnsync_store::CacheStore;

    fn tree(json: &str) -> Vec<TreeNode> {
        let response: PackageResponse = serde_json::from_str(json).unwrap();
        response.files
    }

    #[test]
    fn single_nested_file() {
        let nodes = tree(
            r#"{"type": "npm", "name": "jquery", "version": "3.7.1", "files": [
                {"type": "directory", "name": "dist", "files": [
                    {"type": "file", "name": "x.min.js", "hash": "", "size": 1000}
                ]}
            ]}"#,
        );
        let files = flatten(&nodes, "cdn.jsdelivr.net", "jquery", "3.7.1");

        assert_eq!(
            files,
            vec![FileEntry {
                path: "dist/x.min.js".to_string(),
                url: "https://cdn.jsdelivr.net/npm/jquery@3.7.1/dist/x.min.js".to_string(),
                size: 1000,
                integrity: None,
            }]
        );
    }

    #[test]
    fn counts_every_leaf_file() {
        let nodes = tree(
            r#"{"files": [
                {"type": "file", "name": "package.json", "hash": "AbC=", "size": 10},
                {"type": "directory", "name": "empty", "files": []},
                {"type": "directory", "name": "dist", "files": [
                    {"type": "file", "name": "a.js", "size": 1},
                    {"type": "directory", "name": "esm", "files": [
                        {"type": "file", "name": "a.mjs", "size": 2},
                        {"type": "directory", "name": "deep", "files": [
                            {"type": "file", "name": "b.mjs", "size": 3}
                        ]}
                    ]}
                ]}
            ]}"#,
        );
        let files = flatten(&nodes, "cdn.jsdelivr.net", "lib", "1.0.0");

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["package.json", "dist/a.js", "dist/esm/a.mjs", "dist/esm/deep/b.mjs"]
        );
        assert!(files.iter().all(|f| !f.path.starts_with('/')));
        assert_eq!(files[0].integrity.as_deref(), Some("sha256-AbC="));
    }

    #[test]
    fn escaping_names_are_dropped() {
        let nodes = tree(
            r#"{"files": [
                {"type": "directory", "name": "..", "files": [
                    {"type": "directory", "name": "..", "files": [
                        {"type": "file", "name": "pwned.txt", "size": 5}
                    ]}
                ]},
                {"type": "file", "name": "..", "size": 1},
                {"type": "directory", "name": "dist", "files": [
                    {"type": "file", "name": "../../outside.js", "size": 2},
                    {"type": "file", "name": "ok.js", "size": 3}
                ]}
            ]}"#,
        );
        let files = flatten(&nodes, "cdn.jsdelivr.net", "lib", "1.0.0");

        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["dist/ok.js"]);
    }

    #[test]
    fn versions_and_tags() {
        let response: VersionsResponse = serde_json::from_str(
            r#"{
                "type": "npm",
                "name": "alpinejs",
                "tags": {"latest": "3.13.5", "beta": "3.0.0-beta.1"},
                "versions": [
                    {"version": "3.13.5", "links": {"self": "x"}},
                    {"version": "3.13.4", "links": {}},
                    {"version": "3.0.0-beta.1"}
                ],
                "links": {"stats": "y"}
            }"#,
        )
        .unwrap();
        let set = normalize_versions(response);
        assert_eq!(set.versions.len(), 3);
        assert_eq!(set.latest(), Some("3.13.5"));
        assert_eq!(set.sorted()[0], "3.13.5");
    }

    #[test]
    fn fetches_tree_through_endpoints() {
        let cache = CacheStore::disabled();
        let client = MockClient::new().with_body(
            "https://data.jsdelivr.com/v1/packages/npm/jquery@3.7.1",
            r#"{"files": [{"type": "directory", "name": "dist", "files": [
                {"type": "file", "name": "jquery.min.js", "size": 87533}
            ]}]}"#,
        );

        let files = with_ctx(&client, &cache, |ctx| {
            Jsdelivr.fetch_file_list(ctx, "jquery", "3.7.1")
        })
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].size, 87533);
    }
}
