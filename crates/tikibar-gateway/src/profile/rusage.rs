//! Process resource usage snapshots.

use serde_json::{json, Value};

/// CPU seconds and peak resident set size of the whole process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
    pub user_cpu: f64,
    pub system_cpu: f64,
    pub max_rss_kb: u64,
}

impl ResourceUsage {
    #[cfg(unix)]
    pub fn now() -> Self {
        // SAFETY: `getrusage` only writes into the zeroed struct we own.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
        if rc != 0 {
            return Self::default();
        }
        Self {
            user_cpu: timeval_secs(usage.ru_utime),
            system_cpu: timeval_secs(usage.ru_stime),
            max_rss_kb: max_rss_kb(usage.ru_maxrss),
        }
    }

    #[cfg(not(unix))]
    pub fn now() -> Self {
        Self::default()
    }
}

#[cfg(unix)]
fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

#[cfg(all(unix, target_os = "macos"))]
fn max_rss_kb(raw: libc::c_long) -> u64 {
    // Reported in bytes on macOS.
    (raw.max(0) as u64) / 1024
}

#[cfg(all(unix, not(target_os = "macos")))]
fn max_rss_kb(raw: libc::c_long) -> u64 {
    raw.max(0) as u64
}

/// Memory metric for a request: peak RSS before, after, and the growth.
pub fn memory_metric(start: &ResourceUsage, end: &ResourceUsage) -> Value {
    json!({
        "start_kb": start.max_rss_kb,
        "end_kb": end.max_rss_kb,
        "growth_kb": end.max_rss_kb.saturating_sub(start.max_rss_kb),
    })
}
