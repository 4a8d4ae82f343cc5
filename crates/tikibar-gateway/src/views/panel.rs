//! `GET /tikibar/`: the toolbar for one correlation id.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, Method, Uri},
    response::{Html, Response},
};
use serde::Deserialize;

use tikibar_core::history::RequestHistory;
use tikibar_core::metrics::ToolbarMetrics;
use tikibar_core::panel::{Panel, PanelContext};
use tikibar_core::timing::epoch_seconds;

use crate::access::RequestHead;
use crate::app_state::AppState;
use crate::cache::{history_key, metrics_key};
use crate::error::HttpResult;

use super::{html, tiki_response};

#[derive(Debug, Default, Deserialize)]
pub struct PanelQuery {
    #[serde(default)]
    pub correlation_id: String,
    #[serde(default)]
    pub render: String,
    #[serde(default)]
    pub template: String,
}

pub async fn tikibar(
    State(state): State<AppState>,
    Query(q): Query<PanelQuery>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> HttpResult<Response> {
    let head = RequestHead::new(&method, &uri, &headers);
    if !state.access().feature_enabled(&head) {
        return Ok(tiki_response("Tikibar is turned off"));
    }

    let now = epoch_seconds();
    let Some(token) = state.gate().toolbar_token_for_view(&head, now as u64) else {
        return Ok(tiki_response("No tiki-token!"));
    };

    if q.correlation_id.is_empty() {
        return Ok(tiki_response(""));
    }

    let panel = load_panel(&state, &q.correlation_id, &token, now).await?;

    if !q.render.is_empty() {
        let page = if q.template == "minibar" {
            html::minibar(panel.as_ref())
        } else {
            html::tikibar(panel.as_ref())
        };
        return Ok(tiki_response(Html(page)));
    }

    let body = serde_json::to_string_pretty(&panel)?;
    Ok(tiki_response(([(header::CONTENT_TYPE, "application/json")], body)))
}

/// Rebuild the panel from the cache. `None` when the request's data has
/// expired or never arrived.
pub async fn load_panel(
    state: &AppState,
    correlation_id: &str,
    token: &str,
    now: f64,
) -> HttpResult<Option<Panel>> {
    let cache = state.cache();
    let Some(raw) = cache.get(&metrics_key(correlation_id)).await? else {
        return Ok(None);
    };
    let metrics: ToolbarMetrics = match serde_json::from_str(&raw) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, correlation_id, "unreadable metrics blob");
            return Ok(None);
        }
    };

    let stored = cache.get(&history_key(token)).await?;
    let history = RequestHistory::decode(stored.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "unreadable request history");
            RequestHistory::default()
        })
        .into_entries();

    let cfg = state.toolbar_cfg();
    let ctx = PanelContext {
        correlation_id: correlation_id.to_string(),
        history,
        now,
        anger_threshold_ms: cfg.anger_threshold_ms,
        source_control_url: cfg.source_control_url.clone(),
        log_search_url: cfg.log_search_url.clone(),
    };
    Ok(Some(Panel::build(metrics, ctx)))
}
