//! Toolbar views, mounted under `/tikibar` behind [`crate::access::ssl_required`].
//!
//! Every response here carries `x-suppress-tikibar: 1` so the profiling
//! middleware neither injects into nor records the toolbar's own pages.

pub mod cross_domain;
pub mod html;
pub mod panel;
pub mod settings;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::middleware::SUPPRESS_HEADER;

pub use cross_domain::{set_for_api_domain, set_token};
pub use panel::tikibar;
pub use settings::{tikibar_off, tikibar_on, tikibar_settings};

/// Mark a response as produced by the toolbar itself.
pub fn tiki_response(res: impl IntoResponse) -> Response {
    let mut res = res.into_response();
    res.headers_mut()
        .insert(SUPPRESS_HEADER, HeaderValue::from_static("1"));
    res
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(v) => (StatusCode::FOUND, [(header::LOCATION, v)]).into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "invalid redirect location").into_response(),
    }
}
