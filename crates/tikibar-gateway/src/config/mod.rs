//! Toolbar config loader (strict parsing).

pub mod schema;

use std::fs;

use tikibar_core::error::{Result, TikibarError};

pub use schema::{CacheSection, SamplerSection, ServerSection, TikibarConfig, ToolbarSection};

pub fn load_from_file(path: &str) -> Result<TikibarConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TikibarError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TikibarConfig> {
    let cfg: TikibarConfig = serde_yaml::from_str(s)
        .map_err(|e| TikibarError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
