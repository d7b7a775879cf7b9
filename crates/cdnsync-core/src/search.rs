//! Library search against the cdnjs catalogue and the npm registry.
//!
//! npm packages are served by both unpkg and jsDelivr, so an npm hit lists
//! both providers. Search results are not cached.

use crate::model::Provider;
use crate::provider::{FetchContext, ProviderError, base_url, fetch_json};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

/// Largest page the npm search API accepts.
const NPM_MAX_SIZE: usize = 250;

/// Which catalogues to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    #[default]
    All,
    Cdnjs,
    Npm,
}

impl SearchScope {
    pub fn id(&self) -> &'static str {
        match self {
            SearchScope::All => "all",
            SearchScope::Cdnjs => "cdnjs",
            SearchScope::Npm => "npm",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "all" => Some(SearchScope::All),
            "cdnjs" => Some(SearchScope::Cdnjs),
            "npm" => Some(SearchScope::Npm),
            _ => None,
        }
    }

    fn includes_cdnjs(self) -> bool {
        matches!(self, SearchScope::All | SearchScope::Cdnjs)
    }

    fn includes_npm(self) -> bool {
        matches!(self, SearchScope::All | SearchScope::Npm)
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One matching library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub name: String,
    /// Latest version the catalogue reports; empty when unknown.
    pub version: String,
    pub description: String,
    /// Providers that can serve the library, in discovery order.
    pub providers: Vec<Provider>,
}

/// Response of `/libraries?search=...` on the cdnjs API.
#[derive(Debug, Default, Deserialize)]
struct CdnjsSearch {
    #[serde(default)]
    results: Vec<CdnjsHit>,
}

#[derive(Debug, Deserialize)]
struct CdnjsHit {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Response of `/-/v1/search` on the npm registry.
#[derive(Debug, Default, Deserialize)]
struct NpmSearch {
    #[serde(default)]
    objects: Vec<NpmObject>,
}

#[derive(Debug, Deserialize)]
struct NpmObject {
    package: NpmPackage,
}

#[derive(Debug, Deserialize)]
struct NpmPackage {
    name: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

fn encode(query: &str) -> String {
    byte_serialize(query.as_bytes()).collect()
}

fn search_cdnjs(
    ctx: &FetchContext<'_>,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, ProviderError> {
    let url = format!(
        "{}/libraries?search={}&fields=version,description&limit={limit}",
        base_url(&ctx.endpoints.cdnjs_api),
        encode(query)
    );
    debug!(url, "searching cdnjs");
    let response: CdnjsSearch = fetch_json(ctx, &url)?;
    Ok(response
        .results
        .into_iter()
        .map(|hit| SearchResult {
            name: hit.name,
            version: hit.version.unwrap_or_default(),
            description: hit.description.unwrap_or_default(),
            providers: vec![Provider::Cdnjs],
        })
        .collect())
}

fn search_npm(
    ctx: &FetchContext<'_>,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>, ProviderError> {
    let url = format!(
        "{}/-/v1/search?text={}&size={}",
        base_url(&ctx.endpoints.npm_registry),
        encode(query),
        limit.min(NPM_MAX_SIZE)
    );
    debug!(url, "searching npm");
    let response: NpmSearch = fetch_json(ctx, &url)?;
    Ok(response
        .objects
        .into_iter()
        .map(|object| SearchResult {
            name: object.package.name,
            version: object.package.version.unwrap_or_default(),
            description: object.package.description.unwrap_or_default(),
            providers: vec![Provider::Unpkg, Provider::Jsdelivr],
        })
        .collect())
}

/// Fold `hits` into `results`, joining entries with the same name.
fn merge(results: &mut Vec<SearchResult>, hits: Vec<SearchResult>) {
    for hit in hits {
        let Some(existing) = results.iter_mut().find(|r| r.name == hit.name) else {
            results.push(hit);
            continue;
        };
        for provider in hit.providers {
            if !existing.providers.contains(&provider) {
                existing.providers.push(provider);
            }
        }
        if existing.version.is_empty() {
            existing.version = hit.version;
        }
        if existing.description.is_empty() {
            existing.description = hit.description;
        }
    }
}

/// Find libraries matching `query`, at most `limit` of them.
///
/// With [`SearchScope::All`] cdnjs hits come first and npm hits for the
/// same name are merged into them. A blank query makes no requests.
pub fn search(
    ctx: &FetchContext<'_>,
    query: &str,
    scope: SearchScope,
    limit: usize,
) -> Result<Vec<SearchResult>, ProviderError> {
    let query = query.trim();
    if query.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    let mut results = Vec::new();
    if scope.includes_cdnjs() {
        merge(&mut results, search_cdnjs(ctx, query, limit)?);
    }
    if scope.includes_npm() {
        merge(&mut results, search_npm(ctx, query, limit)?);
    }
    results.truncate(limit);
    Ok(results)
}
