//! Provider adapters.
//!
//! Each content-delivery service exposes file listings and version histories
//! in its own shape. An adapter fetches those documents (through the
//! metadata cache) and normalizes them into [`FileEntry`] and [`VersionSet`]
//! records. Callers pick an adapter with [`Provider::adapter`] and never
//! branch on the provider themselves.

mod cdnjs;
mod jsdelivr;
mod unpkg;

pub use cdnjs::Cdnjs;
pub use jsdelivr::Jsdelivr;
pub use unpkg::Unpkg;

use crate::http::{FetchError, HttpClient};
use crate::model::{FileEntry, Provider, VersionSet};
use cdnsync_store::{CacheStore, MetadataKey};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Hosts used to build API and download URLs.
///
/// A value without a scheme is treated as an `https://` host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub unpkg: String,
    pub npm_registry: String,
    pub cdnjs_api: String,
    pub cdnjs_cdn: String,
    pub jsdelivr_data: String,
    pub jsdelivr_cdn: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            unpkg: "unpkg.com".to_string(),
            npm_registry: "registry.npmjs.org".to_string(),
            cdnjs_api: "api.cdnjs.com".to_string(),
            cdnjs_cdn: "cdnjs.cloudflare.com".to_string(),
            jsdelivr_data: "data.jsdelivr.com".to_string(),
            jsdelivr_cdn: "cdn.jsdelivr.net".to_string(),
        }
    }
}

/// `https://{host}` unless the host already carries a scheme.
pub(crate) fn base_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

/// A listing path made relative to the package root.
///
/// Leading slashes are dropped. Paths with empty, `.` or `..` segments,
/// backslashes or NUL bytes yield `None`: they cannot be mapped onto the
/// destination directory without leaving it.
pub(crate) fn clean_relative_path(raw: &str) -> Option<&str> {
    let path = raw.trim_start_matches('/');
    let valid = !path.is_empty()
        && path
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | "..") && !segment.contains(['\\', '\0']));
    if !valid {
        warn!(path = raw, "skipping file with an unsafe path");
        return None;
    }
    Some(path)
}

/// Everything an adapter needs to talk to the outside world.
#[derive(Clone, Copy)]
pub struct FetchContext<'a> {
    pub http: &'a dyn HttpClient,
    pub cache: &'a CacheStore,
    pub endpoints: &'a Endpoints,
}

impl<'a> FetchContext<'a> {
    pub fn new(http: &'a dyn HttpClient, cache: &'a CacheStore, endpoints: &'a Endpoints) -> Self {
        Self {
            http,
            cache,
            endpoints,
        }
    }
}

/// Errors from provider adapters.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("version {version} of {library} not found on {provider}")]
    VersionNotFound {
        provider: Provider,
        library: String,
        version: String,
    },
    #[error("{provider} lists no versions for {library}")]
    NoVersions { provider: Provider, library: String },
}

/// Normalizes one provider's metadata.
pub trait ProviderAdapter {
    /// Which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Files published in `library@version`, in provider order.
    fn fetch_file_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
        version: &str,
    ) -> Result<Vec<FileEntry>, ProviderError>;

    /// Every version published for `library`, plus its tags.
    fn fetch_version_list(
        &self,
        ctx: &FetchContext<'_>,
        library: &str,
    ) -> Result<VersionSet, ProviderError>;
}

impl Provider {
    /// The adapter for this provider.
    pub fn adapter(self) -> &'static dyn ProviderAdapter {
        match self {
            Provider::Unpkg => &Unpkg,
            Provider::Cdnjs => &Cdnjs,
            Provider::Jsdelivr => &Jsdelivr,
        }
    }
}

/// Check that `version` is published for `library`.
///
/// Returns the full version list on success so callers can report on it.
pub fn ensure_version_available(
    ctx: &FetchContext<'_>,
    provider: Provider,
    library: &str,
    version: &str,
) -> Result<VersionSet, ProviderError> {
    let versions = provider.adapter().fetch_version_list(ctx, library)?;

    if versions.is_empty() {
        return Err(ProviderError::NoVersions {
            provider,
            library: library.to_string(),
        });
    }
    if !versions.contains(version) {
        return Err(ProviderError::VersionNotFound {
            provider,
            library: library.to_string(),
            version: version.to_string(),
        });
    }
    Ok(versions)
}

/// Fetch and decode a JSON document.
pub(crate) fn fetch_json<T: DeserializeOwned>(
    ctx: &FetchContext<'_>,
    url: &str,
) -> Result<T, ProviderError> {
    let bytes = ctx.http.get_bytes(url)?;
    serde_json::from_slice(&bytes).map_err(|source| ProviderError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Fetch and decode a JSON document, serving it from the metadata tier
/// when a fresh copy exists. The decoded wire form is what gets cached.
pub(crate) fn fetch_json_cached<T>(
    ctx: &FetchContext<'_>,
    key: &MetadataKey,
    url: &str,
) -> Result<T, ProviderError>
where
    T: DeserializeOwned + Serialize,
{
    if let Some(cached) = ctx.cache.get_metadata::<T>(key) {
        return Ok(cached);
    }

    debug!(key = %key, url, "fetching metadata");
    let value: T = fetch_json(ctx, url)?;

    if let Err(e) = ctx.cache.set_metadata(key, &value) {
        warn!(key = %key, error = %e, "failed to cache metadata");
    }
    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::testing::MockClient;
    use cdnsync_store::DEFAULT_TTL;
    use tempfile::TempDir;

    pub(crate) fn with_ctx<R>(
        client: &MockClient,
        cache: &CacheStore,
        f: impl FnOnce(&FetchContext<'_>) -> R,
    ) -> R {
        let endpoints = Endpoints::default();
        let ctx = FetchContext::new(client, cache, &endpoints);
        f(&ctx)
    }

    const NPM_JQUERY: &str = r#"{
        "name": "jquery",
        "dist-tags": {"latest": "3.7.1", "beta": "4.0.0-beta"},
        "versions": {"3.7.0": {"name": "jquery"}, "3.7.1": {}, "4.0.0-beta": {}}
    }"#;

    #[test]
    fn adapter_matches_provider() {
        for provider in Provider::ALL {
            assert_eq!(provider.adapter().provider(), provider);
        }
    }

    #[test]
    fn base_url_adds_scheme() {
        assert_eq!(base_url("unpkg.com"), "https://unpkg.com");
        assert_eq!(base_url("http://127.0.0.1:8080/"), "http://127.0.0.1:8080");
    }

    #[test]
    fn relative_paths_stay_inside_the_package() {
        assert_eq!(clean_relative_path("/dist/a.js"), Some("dist/a.js"));
        assert_eq!(clean_relative_path("a..b/c.js"), Some("a..b/c.js"));
        assert_eq!(clean_relative_path("../../.bashrc"), None);
        assert_eq!(clean_relative_path("dist/../../escape.js"), None);
        assert_eq!(clean_relative_path("dist/./a.js"), None);
        assert_eq!(clean_relative_path("dist//a.js"), None);
        assert_eq!(clean_relative_path("dist\\..\\a.js"), None);
        assert_eq!(clean_relative_path("/"), None);
        assert_eq!(clean_relative_path(""), None);
    }

    #[test]
    fn metadata_is_served_from_cache() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::with_root(temp.path().to_path_buf(), DEFAULT_TTL).unwrap();
        let url = "https://registry.npmjs.org/jquery";
        let client = MockClient::new().with_body(url, NPM_JQUERY);

        with_ctx(&client, &cache, |ctx| {
            let first = Provider::Unpkg.adapter().fetch_version_list(ctx, "jquery").unwrap();
            let second = Provider::Unpkg.adapter().fetch_version_list(ctx, "jquery").unwrap();
            assert_eq!(first, second);
        });
        assert_eq!(client.call_count(url), 1);
    }

    #[test]
    fn disabled_cache_always_fetches() {
        let cache = CacheStore::disabled();
        let url = "https://registry.npmjs.org/jquery";
        let client = MockClient::new().with_body(url, NPM_JQUERY);

        with_ctx(&client, &cache, |ctx| {
            Provider::Unpkg.adapter().fetch_version_list(ctx, "jquery").unwrap();
            Provider::Unpkg.adapter().fetch_version_list(ctx, "jquery").unwrap();
        });
        assert_eq!(client.call_count(url), 2);
    }

    #[test]
    fn decode_error_carries_url() {
        let cache = CacheStore::disabled();
        let url = "https://api.cdnjs.com/libraries/jquery";
        let client = MockClient::new().with_body(url, "<html>oops</html>");

        let err = with_ctx(&client, &cache, |ctx| {
            Provider::Cdnjs.adapter().fetch_version_list(ctx, "jquery")
        })
        .unwrap_err();
        match err {
            ProviderError::Decode { url: failed, .. } => assert_eq!(failed, url),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn status_error_is_wrapped() {
        let cache = CacheStore::disabled();
        let client = MockClient::new();

        let err = with_ctx(&client, &cache, |ctx| {
            Provider::Jsdelivr
                .adapter()
                .fetch_file_list(ctx, "nope", "1.0.0")
        })
        .unwrap_err();
        match err {
            ProviderError::Fetch(fetch) => assert_eq!(fetch.status(), Some(404)),
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn ensure_version_available_checks_membership() {
        let cache = CacheStore::disabled();
        let client = MockClient::new().with_body("https://registry.npmjs.org/jquery", NPM_JQUERY);

        with_ctx(&client, &cache, |ctx| {
            let versions =
                ensure_version_available(ctx, Provider::Unpkg, "jquery", "3.7.1").unwrap();
            assert_eq!(versions.latest(), Some("3.7.1"));

            let err = ensure_version_available(ctx, Provider::Unpkg, "jquery", "9.9.9").unwrap_err();
            assert!(matches!(
                err,
                ProviderError::VersionNotFound { ref version, .. } if version == "9.9.9"
            ));
        });
    }

    #[test]
    fn ensure_version_available_rejects_empty_history() {
        let cache = CacheStore::disabled();
        let client = MockClient::new().with_body(
            "https://api.cdnjs.com/libraries/ghost",
            r#"{"name": "ghost", "version": "", "versions": []}"#,
        );

        let err = with_ctx(&client, &cache, |ctx| {
            ensure_version_available(ctx, Provider::Cdnjs, "ghost", "1.0.0")
        })
        .unwrap_err();
        assert!(matches!(err, ProviderError::NoVersions { .. }));
    }
}
