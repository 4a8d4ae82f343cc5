//! Cache backend used to hand metrics from the profiled request to the
//! toolbar view.
//!
//! The host application can plug in its own shared cache (memcached, redis)
//! by implementing [`CacheBackend`]; [`MemoryCache`] covers single-process
//! deployments and tests.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use tikibar_core::Result;

pub use memory::MemoryCache;

/// Key of one request's metrics blob.
pub fn metrics_key(correlation_id: &str) -> String {
    format!("tikibar:{correlation_id}")
}

/// Key of a user's request history.
pub fn history_key(token: &str) -> String {
    format!("tikibar:history:{token}")
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}
