//! Access control for the toolbar.
//!
//! Who gets profiled, and who may look at the result, is decided by a best-effort
//! scheme rather than a real security boundary:
//! - a feature flag plus a staff check, supplied by the host ([`AccessPolicy`]);
//! - a signed `tikibar_active` cookie holding a random per-user token;
//! - a second, salted `tikiok` cookie bound to the same token, required to
//!   view data, so a token lifted from a plain-HTTP cookie is not enough.

pub mod cookies;
pub mod ssl;
pub mod token;

use axum::http::{request::Parts, HeaderMap, Method, Request, Uri};

use crate::config::ToolbarSection;

pub use ssl::ssl_required;
pub use token::TokenGate;

pub const TIKI_COOKIE: &str = "tikibar_active";
pub const VIEW_COOKIE: &str = "tikiok";
pub const HTTPS_SALT: &str = "tiki-salt-extra-https";
/// Lifetime of an enabled token, in seconds.
pub const ENABLED_MAX_AGE: u64 = 60 * 60;
/// Lifetime of the "disabled by user" marker, in seconds.
pub const DISABLED_MAX_AGE: u64 = 30 * 24 * 60 * 60;
pub const DISABLED_MARKER: &str = "disabled";

/// Borrowed view of the request line and headers.
#[derive(Debug, Clone, Copy)]
pub struct RequestHead<'a> {
    pub method: &'a Method,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
}

impl<'a> RequestHead<'a> {
    pub fn new(method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self { method, uri, headers }
    }

    pub fn of<B>(req: &'a Request<B>) -> Self {
        Self::new(req.method(), req.uri(), req.headers())
    }

    pub fn from_parts(parts: &'a Parts) -> Self {
        Self::new(&parts.method, &parts.uri, &parts.headers)
    }

    pub fn path(&self) -> &'a str {
        self.uri.path()
    }

    /// Path plus query string.
    pub fn full_path(&self) -> String {
        self.uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| self.uri.path().to_string())
    }

    /// HTTPS either directly or behind a proxy that sets `X-Forwarded-Proto`.
    pub fn is_secure(&self) -> bool {
        if self.uri.scheme_str() == Some("https") {
            return true;
        }
        self.headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("https"))
    }

    pub fn host(&self) -> Option<&'a str> {
        self.uri.host().or_else(|| {
            self.headers
                .get(axum::http::header::HOST)
                .and_then(|v| v.to_str().ok())
        })
    }
}

/// Host-supplied gating: feature flag and staff check.
pub trait AccessPolicy: Send + Sync {
    fn feature_enabled(&self, req: &RequestHead<'_>) -> bool;
    fn is_staff(&self, req: &RequestHead<'_>) -> bool;
}

/// Policy driven by static config: the flag falls back to `debug`, and staff
/// are recognized by a header set upstream.
#[derive(Debug, Clone)]
pub struct ConfigAccessPolicy {
    enabled: bool,
    debug: bool,
    staff_header: Option<String>,
}

impl ConfigAccessPolicy {
    pub fn from_config(cfg: &ToolbarSection) -> Self {
        Self {
            enabled: cfg.is_enabled(),
            debug: cfg.debug,
            staff_header: cfg.staff_header.clone(),
        }
    }
}

impl AccessPolicy for ConfigAccessPolicy {
    fn feature_enabled(&self, _req: &RequestHead<'_>) -> bool {
        self.enabled
    }

    fn is_staff(&self, req: &RequestHead<'_>) -> bool {
        if self.debug {
            return true;
        }
        match &self.staff_header {
            Some(h) => req.headers.contains_key(h.as_str()),
            None => false,
        }
    }
}
