use serde::Deserialize;
use tikibar_core::error::{Result, TikibarError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TikibarConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    pub toolbar: ToolbarSection,

    #[serde(default)]
    pub sampler: SamplerSection,

    #[serde(default)]
    pub cache: CacheSection,
}

impl TikibarConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TikibarError::UnsupportedVersion);
        }
        self.toolbar.validate()?;
        self.sampler.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolbarSection {
    /// Feature flag. When unset, the toolbar follows `debug`.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Development mode: relaxes the HTTPS requirements and enables the
    /// toolbar when no explicit flag is set.
    #[serde(default)]
    pub debug: bool,

    /// Key for cookie and nonce signatures.
    pub secret_key: String,

    #[serde(default = "default_release")]
    pub release: String,

    /// `Domain` attribute of the token cookie.
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Second host that should receive the toolbar token too.
    #[serde(default)]
    pub api_domain: Option<String>,

    /// Path prefixes that are never profiled.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Code base root used to shorten view file paths.
    #[serde(default)]
    pub filepath: Option<String>,

    #[serde(default)]
    pub source_control_url: Option<String>,

    #[serde(default)]
    pub log_search_url: Option<String>,

    /// Request header whose presence marks a staff user (set by an
    /// authenticating proxy).
    #[serde(default)]
    pub staff_header: Option<String>,

    #[serde(default = "default_storage_timeout_secs")]
    pub storage_timeout_secs: u64,

    #[serde(default = "default_max_metrics_bytes")]
    pub max_metrics_bytes: usize,

    #[serde(default = "default_history_len")]
    pub history_len: usize,

    #[serde(default = "default_anger_threshold_ms")]
    pub anger_threshold_ms: f64,
}

impl ToolbarSection {
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.len() < 16 {
            return Err(TikibarError::BadRequest(
                "toolbar.secret_key must be at least 16 bytes".into(),
            ));
        }
        if !(1..=86_400).contains(&self.storage_timeout_secs) {
            return Err(TikibarError::BadRequest(
                "toolbar.storage_timeout_secs must be between 1 and 86400".into(),
            ));
        }
        if self.max_metrics_bytes < 1024 {
            return Err(TikibarError::BadRequest(
                "toolbar.max_metrics_bytes must be at least 1024".into(),
            ));
        }
        if !(1..=100).contains(&self.history_len) {
            return Err(TikibarError::BadRequest(
                "toolbar.history_len must be between 1 and 100".into(),
            ));
        }
        if self.anger_threshold_ms.is_nan() || self.anger_threshold_ms < 0.0 {
            return Err(TikibarError::BadRequest(
                "toolbar.anger_threshold_ms must be a non-negative number".into(),
            ));
        }
        if self.blacklist.iter().any(|p| !p.starts_with('/')) {
            return Err(TikibarError::BadRequest(
                "toolbar.blacklist entries must start with '/'".into(),
            ));
        }
        Ok(())
    }

    /// Effective feature flag.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(self.debug)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplerSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sampler_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SamplerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_sampler_interval_ms(),
        }
    }
}

impl SamplerSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.interval_ms) {
            return Err(TikibarError::BadRequest(
                "sampler.interval_ms must be between 1 and 1000".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_cache_max_entries(),
        }
    }
}

impl CacheSection {
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(TikibarError::BadRequest("cache.max_entries must be positive".into()));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_release() -> String {
    "master".into()
}
fn default_storage_timeout_secs() -> u64 {
    3000
}
fn default_max_metrics_bytes() -> usize {
    1000 * 1024
}
fn default_history_len() -> usize {
    15
}
fn default_anger_threshold_ms() -> f64 {
    500.0
}
fn default_sampler_interval_ms() -> u64 {
    10
}
fn default_cache_max_entries() -> usize {
    10_000
}
