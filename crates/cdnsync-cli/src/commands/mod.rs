//! Subcommand implementations.

pub mod cache;
pub mod clean;
pub mod files;
pub mod outdated;
pub mod search;
pub mod sync;
pub mod versions;

use cdnsync_core::{Endpoints, FetchContext, Provider, UreqClient, UserConfig};
use cdnsync_store::{CacheStore, StoreError};

/// Long-lived collaborators shared by every command that talks to a
/// provider.
pub struct Session {
    pub cache: CacheStore,
    pub endpoints: Endpoints,
    pub http: UreqClient,
}

impl Session {
    /// Build from user config. `no_cache` disables the cache for this run.
    pub fn open(no_cache: bool) -> Result<Self, StoreError> {
        let config = UserConfig::load();
        let mut settings = config.cache.to_settings();
        if no_cache {
            settings.enabled = false;
        }

        Ok(Self {
            cache: CacheStore::open(&settings)?,
            endpoints: config.endpoints.to_endpoints(),
            http: UreqClient::new(),
        })
    }

    pub fn ctx(&self) -> FetchContext<'_> {
        FetchContext::new(&self.http, &self.cache, &self.endpoints)
    }
}

/// Provider named on the command line, or the fallback.
pub fn provider_arg(cdn: Option<&str>) -> Result<Provider, String> {
    match cdn {
        None => Ok(Provider::FALLBACK),
        Some(name) => Provider::from_id(name).ok_or_else(|| {
            format!("unknown provider '{name}' (expected unpkg, cdnjs or jsdelivr)")
        }),
    }
}

/// Open a session, printing the error on failure.
pub fn open_session(no_cache: bool) -> Option<Session> {
    match Session::open(no_cache) {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("error: failed to open cache: {e}");
            None
        }
    }
}
