//! Settings page and the on/off switches.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method, Uri},
    response::{Html, Response},
};
use serde::Deserialize;

use tikibar_core::timing::epoch_seconds;

use crate::access::RequestHead;
use crate::app_state::AppState;
use crate::error::{HttpError, HttpResult};

use super::{found, html, tiki_response};

#[derive(Debug, Default, Deserialize)]
pub struct SettingsQuery {
    #[serde(default)]
    pub set_for_api_domain: String,
}

pub async fn tikibar_settings(
    State(state): State<AppState>,
    Query(q): Query<SettingsQuery>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let head = RequestHead::new(&method, &uri, &headers);
    if !state.access().feature_enabled(&head) {
        return Err(HttpError::not_found("Tikibar is turned off"));
    }
    if !state.access().is_staff(&head) {
        return Err(HttpError::not_found("Staff required"));
    }

    let is_active = state
        .gate()
        .toolbar_token(&head, epoch_seconds() as u64)
        .is_some();
    let cross_domain = q.set_for_api_domain == "1" && state.toolbar_cfg().api_domain.is_some();
    Ok(tiki_response(Html(html::settings(is_active, cross_domain))))
}

/// GET shows the switch; POST turns the toolbar on for this user.
pub async fn tikibar_on(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let head = RequestHead::new(&method, &uri, &headers);
    if !state.access().is_staff(&head) {
        return Ok(tiki_response("You must be signed in as staff"));
    }
    if method != Method::POST {
        return Ok(tiki_response(Html(html::turn_on())));
    }

    let mut res = tiki_response(found("/tikibar/settings/?set_for_api_domain=1"));
    let secure_or_debug = head.is_secure() || state.debug();
    state
        .gate()
        .set_active_on_response(res.headers_mut(), secure_or_debug, epoch_seconds() as u64)?;
    tracing::info!(secure = secure_or_debug, "tikibar enabled for user");
    Ok(res)
}

/// GET shows the switch; POST marks the toolbar as disabled by the user.
pub async fn tikibar_off(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let head = RequestHead::new(&method, &uri, &headers);
    if !state.access().feature_enabled(&head) {
        return Err(HttpError::not_found("Tikibar is turned off"));
    }
    if method != Method::POST {
        return Ok(tiki_response(Html(html::turn_off())));
    }

    let mut res = tiki_response(Html(html::TURNED_OFF));
    state
        .gate()
        .set_disabled_by_user(res.headers_mut(), epoch_seconds() as u64)?;
    Ok(res)
}
