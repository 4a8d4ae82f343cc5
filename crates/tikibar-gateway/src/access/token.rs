//! Toolbar token cookies: issue, read, and validate.

use axum::http::{header, HeaderMap};

use tikibar_core::signing::Signer;
use tikibar_core::Result;

use super::cookies::{signed_cookie, signed_set_cookie, CookieOptions};
use super::{
    RequestHead, DISABLED_MARKER, DISABLED_MAX_AGE, ENABLED_MAX_AGE, HTTPS_SALT, TIKI_COOKIE,
    VIEW_COOKIE,
};

/// Reads and writes the toolbar cookies for one deployment.
#[derive(Debug, Clone)]
pub struct TokenGate {
    signer: Signer,
    blacklist: Vec<String>,
    cookie_domain: Option<String>,
}

impl TokenGate {
    pub fn new(signer: Signer, blacklist: Vec<String>, cookie_domain: Option<String>) -> Self {
        Self {
            signer,
            blacklist,
            cookie_domain,
        }
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    pub fn is_blacklisted(&self, path: &str) -> bool {
        self.blacklist.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Whether this request's user opted in to data collection.
    ///
    /// Blacklisted paths never collect, and a "disabled" marker cookie wins
    /// over an enabled token.
    pub fn should_collect(&self, req: &RequestHead<'_>, now: u64) -> bool {
        if self.is_blacklisted(req.path()) {
            return false;
        }
        let disabled = signed_cookie(req.headers, &self.signer, TIKI_COOKIE, "", DISABLED_MAX_AGE, now);
        if disabled.as_deref() == Some(DISABLED_MARKER) {
            return false;
        }
        let enabled = signed_cookie(req.headers, &self.signer, TIKI_COOKIE, "", ENABLED_MAX_AGE, now);
        matches!(enabled.as_deref(), Some(tok) if !tok.is_empty() && tok != DISABLED_MARKER)
    }

    /// The user's token, usable for *storing* data and for links back to the
    /// user. Never sufficient to *show* data; see [`Self::toolbar_token_for_view`].
    pub fn toolbar_token(&self, req: &RequestHead<'_>, now: u64) -> Option<String> {
        if !self.should_collect(req, now) {
            return None;
        }
        signed_cookie(req.headers, &self.signer, TIKI_COOKIE, "", ENABLED_MAX_AGE, now)
    }

    /// The token, only if the salted view cookie carries the same one.
    pub fn toolbar_token_for_view(&self, req: &RequestHead<'_>, now: u64) -> Option<String> {
        let token = self.toolbar_token(req, now)?;
        let from_view = signed_cookie(
            req.headers,
            &self.signer,
            VIEW_COOKIE,
            HTTPS_SALT,
            ENABLED_MAX_AGE,
            now,
        )?;
        (from_view == token).then_some(token)
    }

    /// Issue a fresh token. The view cookie is only set over HTTPS (or in
    /// debug mode), since setting it over plain HTTP would defeat its purpose.
    pub fn set_active_on_response(
        &self,
        out: &mut HeaderMap,
        secure_or_debug: bool,
        now: u64,
    ) -> Result<String> {
        let token = uuid::Uuid::new_v4().simple().to_string();

        let token_opts = CookieOptions {
            domain: self.cookie_domain.as_deref(),
            ..CookieOptions::default()
        };
        out.append(
            header::SET_COOKIE,
            signed_set_cookie(&self.signer, TIKI_COOKIE, &token, "", now, &token_opts)?,
        );

        if secure_or_debug {
            let view_opts = CookieOptions {
                http_only: true,
                ..CookieOptions::default()
            };
            out.append(
                header::SET_COOKIE,
                signed_set_cookie(&self.signer, VIEW_COOKIE, &token, HTTPS_SALT, now, &view_opts)?,
            );
        }
        Ok(token)
    }

    pub fn set_disabled_by_user(&self, out: &mut HeaderMap, now: u64) -> Result<()> {
        let opts = CookieOptions {
            max_age: Some(DISABLED_MAX_AGE),
            secure: true,
            ..CookieOptions::default()
        };
        out.append(
            header::SET_COOKIE,
            signed_set_cookie(&self.signer, TIKI_COOKIE, DISABLED_MARKER, "", now, &opts)?,
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method, Uri};

    fn gate() -> TokenGate {
        TokenGate::new(
            Signer::new("0123456789abcdef"),
            vec!["/static/".into()],
            None,
        )
    }

    /// Turn `Set-Cookie` values into a request `Cookie` header.
    fn as_request_cookies(set: &HeaderMap) -> HeaderMap {
        let joined = set
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().split(';').next().unwrap().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, HeaderValue::from_str(&joined).unwrap());
        h
    }

    #[test]
    fn issued_token_is_readable_and_viewable() {
        let g = gate();
        let mut out = HeaderMap::new();
        let token = g.set_active_on_response(&mut out, true, 1_000).unwrap();
        assert_eq!(out.get_all(header::SET_COOKIE).iter().count(), 2);

        let h = as_request_cookies(&out);
        let (m, u) = (Method::GET, "/page".parse::<Uri>().unwrap());
        let req = RequestHead::new(&m, &u, &h);
        assert!(g.should_collect(&req, 1_010));
        assert_eq!(g.toolbar_token(&req, 1_010), Some(token.clone()));
        assert_eq!(g.toolbar_token_for_view(&req, 1_010), Some(token));
        // Stale after an hour.
        assert_eq!(g.toolbar_token(&req, 1_000 + ENABLED_MAX_AGE + 1), None);
    }

    #[test]
    fn view_cookie_required_to_view() {
        let g = gate();
        let mut out = HeaderMap::new();
        g.set_active_on_response(&mut out, false, 1_000).unwrap();
        let h = as_request_cookies(&out);
        let (m, u) = (Method::GET, "/".parse::<Uri>().unwrap());
        let req = RequestHead::new(&m, &u, &h);
        assert!(g.toolbar_token(&req, 1_000).is_some());
        assert!(g.toolbar_token_for_view(&req, 1_000).is_none());
    }

    #[test]
    fn blacklist_and_disabled_marker_win() {
        let g = gate();
        let mut out = HeaderMap::new();
        g.set_active_on_response(&mut out, true, 1_000).unwrap();
        let h = as_request_cookies(&out);
        let m = Method::GET;
        let u: Uri = "/static/app.css".parse().unwrap();
        assert!(!g.should_collect(&RequestHead::new(&m, &u, &h), 1_000));

        let mut off = HeaderMap::new();
        g.set_disabled_by_user(&mut off, 1_000).unwrap();
        let h = as_request_cookies(&off);
        let u: Uri = "/".parse().unwrap();
        let req = RequestHead::new(&m, &u, &h);
        assert!(!g.should_collect(&req, 1_000 + ENABLED_MAX_AGE * 2));
        assert!(g.toolbar_token(&req, 1_000).is_none());
    }
}
