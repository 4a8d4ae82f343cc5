//! Sharing the toolbar token with a separate API domain.
//!
//! The settings page loads `set-for-api-domain` as an image; it redirects to
//! the API domain's `set-token` with a short-lived signed nonce, which
//! answers with a transparent GIF and fresh toolbar cookies for that domain.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method, Uri},
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::Deserialize;

use tikibar_core::timing::epoch_seconds;
use tikibar_core::TikibarError;

use crate::access::RequestHead;
use crate::app_state::AppState;
use crate::error::{HttpError, HttpResult};

use super::{found, tiki_response};

pub const NONCE_PREFIX: &str = "tikibar-nonce:";
/// Seconds a nonce stays valid.
pub const NONCE_MAX_AGE: u64 = 10;
const NONCE_SALT: &str = "";

const PIXEL_GIF_B64: &str = "R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

#[derive(Debug, Default, Deserialize)]
pub struct NonceQuery {
    #[serde(default)]
    pub nonce: String,
}

pub async fn set_for_api_domain(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let Some(api_domain) = state.toolbar_cfg().api_domain.as_deref() else {
        return Err(HttpError::not_found("No API domain defined"));
    };
    let head = RequestHead::new(&method, &uri, &headers);
    if !state.access().feature_enabled(&head) {
        return Err(HttpError::not_found("Tikibar is turned off"));
    }
    if !state.access().is_staff(&head) {
        return Ok(tiki_response("You must be signed in as staff"));
    }

    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let signed = state.gate().signer().sign(
        &format!("{NONCE_PREFIX}{nonce}"),
        NONCE_SALT,
        epoch_seconds() as u64,
    )?;
    Ok(tiki_response(found(&format!(
        "https://{api_domain}/tikibar/set-token/?nonce={signed}"
    ))))
}

pub async fn set_token(
    State(state): State<AppState>,
    Query(q): Query<NonceQuery>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResult<Response> {
    if q.nonce.is_empty() {
        return Ok(tiki_response("Could not set, no nonce"));
    }
    let now = epoch_seconds() as u64;
    let valid = state
        .gate()
        .signer()
        .unsign(&q.nonce, NONCE_SALT, Some(NONCE_MAX_AGE), now)
        .is_ok_and(|v| v.starts_with(NONCE_PREFIX));
    if !valid {
        return Ok(tiki_response("Could not set, invalid nonce"));
    }

    let gif = STANDARD
        .decode(PIXEL_GIF_B64)
        .map(Bytes::from)
        .map_err(|e| HttpError(TikibarError::Internal(format!("pixel decode failed: {e}"))))?;
    let mut res = tiki_response(([(header::CONTENT_TYPE, "image/gif")], gif));
    let head = RequestHead::new(&method, &uri, &headers);
    let secure_or_debug = head.is_secure() || state.debug();
    state
        .gate()
        .set_active_on_response(res.headers_mut(), secure_or_debug, now)?;
    Ok(res)
}
