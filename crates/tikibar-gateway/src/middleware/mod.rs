//! Request interceptor: wraps every host request, collects its metrics when
//! the user opted in, and hands them to the toolbar views via the cache.
//!
//! Install with `axum::middleware::from_fn_with_state(state, profile_request)`
//! as an outer `layer` (see [`crate::router::profiled`]).

pub mod inject;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use serde_json::{json, Value};

use tikibar_core::history::{HistoryEntry, RequestHistory};
use tikibar_core::timing::epoch_seconds;

use crate::access::RequestHead;
use crate::app_state::AppState;
use crate::cache::{history_key, metrics_key};
use crate::profile::{rusage::memory_metric, ResourceUsage, Sampler};
use crate::toolbar::Toolbar;

/// Responses carrying this header are neither injected nor kept in history.
pub const SUPPRESS_HEADER: &str = "x-suppress-tikibar";
pub const TIME_HEADER: &str = "x-tiki-time";
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Correlation id of the request, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What the response phase needs from the request.
struct RequestSummary {
    method: String,
    full_path: String,
    secure: bool,
    token: Option<String>,
}

pub async fn profile_request(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::generate();
    let req_start = epoch_seconds();
    let usage_start = ResourceUsage::now();
    req.extensions_mut().insert(correlation_id.clone());

    let summary = {
        let head = RequestHead::of(&req);
        if !state.access().feature_enabled(&head) {
            None
        } else {
            Some(RequestSummary {
                method: head.method.to_string(),
                full_path: head.full_path(),
                secure: head.is_secure(),
                token: state.gate().toolbar_token(&head, req_start as u64),
            })
        }
    };
    let Some(summary) = summary else {
        let toolbar = Toolbar::inactive(correlation_id.as_str());
        req.extensions_mut().insert(toolbar.clone());
        return toolbar.scope(next.run(req)).await;
    };

    let cfg = state.toolbar_cfg();
    let toolbar = Toolbar::new(
        correlation_id.as_str(),
        summary.token.is_some(),
        cfg.max_metrics_bytes,
        cfg.filepath.clone(),
    );
    req.extensions_mut().insert(toolbar.clone());

    if !toolbar.is_active() {
        return toolbar.scope(next.run(req)).await;
    }

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let view = format!("{} {route}", summary.method);
    toolbar.set_view(view.clone(), "");

    let mut sampler = start_sampler(&state, &toolbar);
    let view_frame = toolbar.enter(view);

    let response = toolbar.clone().scope(next.run(req)).await;

    drop(view_frame);
    let req_stop = epoch_seconds();
    let usage_end = ResourceUsage::now();

    toolbar.add_singular_metric("total_time", interval(req_start, req_stop));
    toolbar.add_singular_metric("user_cpu", interval(usage_start.user_cpu, usage_end.user_cpu));
    toolbar.add_singular_metric(
        "system_cpu",
        interval(usage_start.system_cpu, usage_end.system_cpu),
    );
    toolbar.add_singular_metric("memory", memory_metric(&usage_start, &usage_end));
    toolbar.add_singular_metric("release", Value::String(cfg.release.clone()));
    toolbar.add_singular_metric("request_path", Value::String(summary.full_path.clone()));
    if let Some(s) = sampler.as_mut() {
        s.stop();
        toolbar.add_singular_metric("profile", Value::String(s.output_stats()));
        toolbar.add_singular_metric("sample_count", json!(s.sample_count()));
    }

    publish_metrics(&state, &toolbar).await;

    let suppressed = response.headers().contains_key(SUPPRESS_HEADER);
    let mut response = if !suppressed && inject::is_html(&response) {
        let protocol = if state.debug() && !summary.secure { "http" } else { "https" };
        inject::inject_toolbar(response, correlation_id.as_str(), protocol).await
    } else {
        response
    };

    let duration = req_stop - req_start;
    set_tiki_headers(response.headers_mut(), duration, correlation_id.as_str());

    if !suppressed {
        if let Some(token) = summary.token.as_deref() {
            let entry = HistoryEntry {
                d: duration,
                t: req_start,
                u: summary.full_path,
                c: correlation_id.0.clone(),
                v: summary.method,
                s: response.status().as_u16(),
            };
            append_history(&state, token, entry).await;
        }
    }

    response
}

fn interval(start: f64, stop: f64) -> Value {
    json!({ "d": [start, stop] })
}

fn start_sampler(state: &AppState, toolbar: &Toolbar) -> Option<Sampler> {
    let cfg = &state.cfg().sampler;
    if !cfg.enabled {
        return None;
    }
    let mut sampler = Sampler::new(std::time::Duration::from_millis(cfg.interval_ms));
    match sampler.start(toolbar.frames().clone()) {
        Ok(()) => Some(sampler),
        Err(e) => {
            tracing::warn!(error = %e, "failed to start sampler");
            None
        }
    }
}

fn set_tiki_headers(headers: &mut HeaderMap, duration: f64, correlation_id: &str) {
    if let Ok(v) = HeaderValue::from_str(&duration.to_string()) {
        headers.insert(TIME_HEADER, v);
    }
    if let Ok(v) = HeaderValue::from_str(correlation_id) {
        headers.insert(CORRELATION_HEADER, v);
    }
}

async fn publish_metrics(state: &AppState, toolbar: &Toolbar) {
    let blob = match toolbar.write_metrics() {
        Ok(Some(blob)) => blob,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, correlation_id = toolbar.correlation_id(), "failed to serialize metrics");
            return;
        }
    };
    let key = metrics_key(toolbar.correlation_id());
    if let Err(e) = state.cache().set(&key, blob, state.storage_ttl()).await {
        tracing::warn!(error = %e, %key, "failed to store metrics");
    }
}

async fn append_history(state: &AppState, token: &str, entry: HistoryEntry) {
    let cache = state.cache();
    let key = history_key(token);

    let stored = match cache.get(&key).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, %key, "failed to read request history");
            return;
        }
    };
    let mut history = RequestHistory::decode(stored.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, %key, "discarding unreadable request history");
        RequestHistory::default()
    });
    history.push(entry, state.toolbar_cfg().history_len);

    let encoded = match history.encode() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode request history");
            return;
        }
    };
    if let Err(e) = cache.set(&key, encoded, state.storage_ttl()).await {
        tracing::warn!(error = %e, %key, "failed to store request history");
    }
}
