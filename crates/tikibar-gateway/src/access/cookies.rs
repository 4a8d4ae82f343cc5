//! Cookie header parsing and signed `Set-Cookie` values.

use axum::http::{header, HeaderMap, HeaderValue};

use tikibar_core::signing::Signer;
use tikibar_core::{Result, TikibarError};

/// First value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().trim_matches('"'))
}

/// Read and verify a signed cookie. Missing, tampered and stale cookies all
/// read as `None`.
pub fn signed_cookie(
    headers: &HeaderMap,
    signer: &Signer,
    name: &str,
    salt: &str,
    max_age: u64,
    now: u64,
) -> Option<String> {
    let raw = cookie_value(headers, name)?;
    signer
        .unsign(raw, &cookie_salt(name, salt), Some(max_age), now)
        .ok()
}

fn cookie_salt(name: &str, salt: &str) -> String {
    format!("{name}{salt}")
}

/// Attributes of an outgoing cookie.
#[derive(Debug, Clone, Default)]
pub struct CookieOptions<'a> {
    pub domain: Option<&'a str>,
    pub max_age: Option<u64>,
    pub secure: bool,
    pub http_only: bool,
}

/// Build a `Set-Cookie` header value carrying a signed `value`.
pub fn signed_set_cookie(
    signer: &Signer,
    name: &str,
    value: &str,
    salt: &str,
    now: u64,
    opts: &CookieOptions<'_>,
) -> Result<HeaderValue> {
    let signed = signer.sign(value, &cookie_salt(name, salt), now)?;
    let mut cookie = format!("{name}={signed}; Path=/; SameSite=Lax");
    if let Some(domain) = opts.domain {
        cookie.push_str("; Domain=");
        cookie.push_str(domain);
    }
    if let Some(max_age) = opts.max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if opts.secure {
        cookie.push_str("; Secure");
    }
    if opts.http_only {
        cookie.push_str("; HttpOnly");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| TikibarError::Internal(format!("invalid cookie header: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        h
    }

    #[test]
    fn finds_cookie_among_many() {
        let h = headers("a=1; tikibar_active=xyz; b=2");
        assert_eq!(cookie_value(&h, "tikibar_active"), Some("xyz"));
        assert_eq!(cookie_value(&h, "tikiok"), None);
    }

    #[test]
    fn signed_cookie_round_trip() {
        let signer = Signer::new("0123456789abcdef");
        let set = signed_set_cookie(&signer, "c", "tok", "", 100, &CookieOptions::default()).unwrap();
        let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
        let h = headers(&pair);
        assert_eq!(signed_cookie(&h, &signer, "c", "", 60, 120).as_deref(), Some("tok"));
        assert_eq!(signed_cookie(&h, &signer, "c", "", 10, 120), None);
        assert_eq!(signed_cookie(&h, &signer, "c", "salty", 60, 120), None);
    }

    #[test]
    fn set_cookie_attributes() {
        let signer = Signer::new("0123456789abcdef");
        let opts = CookieOptions {
            domain: Some("example.com"),
            max_age: Some(30),
            secure: true,
            http_only: true,
        };
        let v = signed_set_cookie(&signer, "c", "tok", "", 1, &opts).unwrap();
        let s = v.to_str().unwrap();
        assert!(s.starts_with("c=tok:1:"));
        assert!(s.contains("; Domain=example.com"));
        assert!(s.contains("; Max-Age=30"));
        assert!(s.ends_with("; Secure; HttpOnly"));
    }
}
