//! cdnsync core: provider adapters, version ordering and sync planning.
//!
//! cdnsync keeps a project's vendored front-end libraries in line with a
//! `cdnsync.yaml` manifest. Libraries are fetched from unpkg, cdnjs or
//! jsDelivr; metadata and downloaded files go through the
//! [`cdnsync_store::CacheStore`].

mod config;
mod executor;
mod http;
mod manifest;
mod model;
mod planner;
mod provider;
mod search;
mod version;

pub use config::{CacheConfig, ConfigError, EndpointsConfig, UserConfig};
pub use executor::{ExecuteError, ExecuteOptions, ExecutionReport, Progress, execute};
pub use http::{FetchError, HttpClient, HttpResponse, UreqClient};
pub use manifest::{
    LIBRARY_PLACEHOLDER, LibrarySpec, MANIFEST_FILE, Manifest, ManifestEntry, ManifestError,
};
pub use model::{DownloadTask, FileEntry, Provider, VersionSet};
pub use planner::{FsProbe, LocalFs, PlanError, PlanOptions, filter_files, matches_filter, plan};
pub use provider::{
    Cdnjs, Endpoints, FetchContext, Jsdelivr, ProviderAdapter, ProviderError, Unpkg,
    ensure_version_available,
};
pub use search::{SearchResult, SearchScope, search};
pub use version::{parse as parse_version, sort_descending};
