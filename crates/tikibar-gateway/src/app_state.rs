//! Shared application state for the toolbar.
//!
//! Holds the validated config and the pluggable backends (cache, access
//! policy). Cheap to clone; handed to both the profiling middleware and the
//! toolbar views.

use std::sync::Arc;
use std::time::Duration;

use tikibar_core::signing::Signer;
use tikibar_core::Result;

use crate::access::{AccessPolicy, ConfigAccessPolicy, TokenGate};
use crate::cache::{CacheBackend, MemoryCache};
use crate::config::{TikibarConfig, ToolbarSection};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: TikibarConfig,
    gate: TokenGate,
    cache: Arc<dyn CacheBackend>,
    access: Arc<dyn AccessPolicy>,
}

impl AppState {
    /// Build state with the in-memory cache and the config-driven policy.
    pub fn new(cfg: TikibarConfig) -> Result<Self> {
        let cache = Arc::new(MemoryCache::new(cfg.cache.max_entries));
        let access = Arc::new(ConfigAccessPolicy::from_config(&cfg.toolbar));
        Self::with_backends(cfg, cache, access)
    }

    /// Build state with host-provided backends.
    pub fn with_backends(
        cfg: TikibarConfig,
        cache: Arc<dyn CacheBackend>,
        access: Arc<dyn AccessPolicy>,
    ) -> Result<Self> {
        cfg.validate()?;

        let gate = TokenGate::new(
            Signer::new(cfg.toolbar.secret_key.as_bytes()),
            cfg.toolbar.blacklist.clone(),
            cfg.toolbar.cookie_domain.clone(),
        );

        if cfg.toolbar.api_domain.is_some() && !cfg.toolbar.is_enabled() {
            tracing::warn!("toolbar.api_domain is set but the toolbar is disabled");
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                gate,
                cache,
                access,
            }),
        })
    }

    pub fn cfg(&self) -> &TikibarConfig {
        &self.inner.cfg
    }

    pub fn toolbar_cfg(&self) -> &ToolbarSection {
        &self.inner.cfg.toolbar
    }

    pub fn debug(&self) -> bool {
        self.inner.cfg.toolbar.debug
    }

    /// How long request data stays readable.
    pub fn storage_ttl(&self) -> Duration {
        Duration::from_secs(self.inner.cfg.toolbar.storage_timeout_secs)
    }

    pub fn gate(&self) -> &TokenGate {
        &self.inner.gate
    }

    pub fn cache(&self) -> Arc<dyn CacheBackend> {
        Arc::clone(&self.inner.cache)
    }

    pub fn access(&self) -> &dyn AccessPolicy {
        self.inner.access.as_ref()
    }
}
