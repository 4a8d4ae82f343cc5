//! Shared helpers for the gateway integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    response::Response,
};

use tikibar_core::timing::epoch_seconds;
use tikibar_gateway::access::ConfigAccessPolicy;
use tikibar_gateway::cache::MemoryCache;
use tikibar_gateway::{config, AppState};

pub const SECRET: &str = "test-secret-0123456789";

/// Debug deployment: plain http allowed, everyone is staff.
pub fn debug_yaml() -> String {
    format!(
        r#"
version: 1
toolbar:
  debug: true
  secret_key: "{SECRET}"
  release: "web-2026.10-abc123"
  blacklist: ["/static/"]
"#
    )
}

/// Production-like deployment: https required, staff marked by a header.
pub fn prod_yaml(extra: &str) -> String {
    format!(
        r#"
version: 1
toolbar:
  enabled: true
  secret_key: "{SECRET}"
  staff_header: "x-staff"
{extra}"#
    )
}

pub fn state(yaml: &str) -> (AppState, Arc<MemoryCache>) {
    let cfg = config::load_from_str(yaml).unwrap();
    let cache = Arc::new(MemoryCache::new(cfg.cache.max_entries));
    let access = Arc::new(ConfigAccessPolicy::from_config(&cfg.toolbar));
    let state = AppState::with_backends(cfg, cache.clone(), access).unwrap();
    (state, cache)
}

pub fn now() -> u64 {
    epoch_seconds() as u64
}

/// Request `Cookie` header built from a response's `Set-Cookie` values.
pub fn as_request_cookies(set: &HeaderMap) -> String {
    set.get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Opt a user in; returns their `Cookie` header and token.
pub fn opt_in(state: &AppState, with_view_cookie: bool) -> (String, String) {
    let mut out = HeaderMap::new();
    let token = state
        .gate()
        .set_active_on_response(&mut out, with_view_cookie, now())
        .unwrap();
    (as_request_cookies(&out), token)
}

pub fn get(uri: &str, cookies: Option<&str>) -> Request<Body> {
    let mut b = Request::builder()
        .uri(uri)
        .header(header::HOST, "example.com");
    if let Some(c) = cookies {
        b = b.header(header::COOKIE, c);
    }
    b.body(Body::empty()).unwrap()
}

pub async fn body_string(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
