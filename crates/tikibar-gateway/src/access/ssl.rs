//! HTTPS enforcement for the toolbar routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

use super::RequestHead;

/// Permanently redirect plain-HTTP requests to HTTPS, except in debug mode.
pub async fn ssl_required(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let head = RequestHead::of(&req);
    if head.is_secure() || state.debug() {
        return next.run(req).await;
    }

    match https_url(&head) {
        Some(url) => {
            tracing::debug!(%url, "redirecting toolbar request to https");
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, url)]).into_response()
        }
        None => (StatusCode::BAD_REQUEST, "missing host").into_response(),
    }
}

/// Same location with the `https` scheme.
pub fn https_url(head: &RequestHead<'_>) -> Option<String> {
    let host = head.uri.authority().map(|a| a.as_str()).or_else(|| head.host())?;
    Some(format!("https://{host}{}", head.full_path()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method, Uri};

    #[test]
    fn https_url_from_host_header() {
        let m = Method::GET;
        let u: Uri = "/tikibar/?correlation_id=abc".parse().unwrap();
        let mut h = HeaderMap::new();
        h.insert(header::HOST, HeaderValue::from_static("example.com:8080"));
        assert_eq!(
            https_url(&RequestHead::new(&m, &u, &h)).as_deref(),
            Some("https://example.com:8080/tikibar/?correlation_id=abc")
        );
    }

    #[test]
    fn https_url_needs_a_host() {
        let m = Method::GET;
        let u: Uri = "/x".parse().unwrap();
        let h = HeaderMap::new();
        assert_eq!(https_url(&RequestHead::new(&m, &u, &h)), None);
    }
}
