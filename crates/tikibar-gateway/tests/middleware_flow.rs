//! Profiled request -> cache -> toolbar panel, through the real router.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use axum::{
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::get as get_route,
    Extension, Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;

use tikibar_core::history::RequestHistory;
use tikibar_core::metrics::ToolbarMetrics;
use tikibar_gateway::cache::{history_key, metrics_key, CacheBackend};
use tikibar_gateway::obs::LogCaptureLayer;
use tikibar_gateway::{current_toolbar, router, AppState, Toolbar};

mod support;
use support::{body_string, debug_yaml, get, opt_in, state};

const PAGE: &str = "<html><head><title>t</title></head><body>hello</body></html>";

async fn home() -> Html<&'static str> {
    let toolbar = current_toolbar();
    toolbar.sql("SELECT", "SELECT id FROM users", || ());
    toolbar.template("pages/home.html", || ());
    tracing::info!(target: "app", "served home");
    Html(PAGE)
}

async fn api() -> impl IntoResponse {
    current_toolbar()
        .timed_async("remote", "GET users-service/1", async {})
        .await;
    Json(json!({"ok": true}))
}

async fn raw_page() -> impl IntoResponse {
    ([("x-suppress-tikibar", "1")], Html(PAGE))
}

async fn slow() -> Html<&'static str> {
    tokio::time::sleep(Duration::from_millis(30)).await;
    Html(PAGE)
}

async fn css() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css")], "body{}")
}

fn app(state: AppState) -> Router {
    let host = Router::new()
        .route("/", get_route(home))
        .route("/api", get_route(api))
        .route("/raw", get_route(raw_page))
        .route("/slow", get_route(slow))
        .route("/static/app.css", get_route(css));
    router::profiled(host, state)
}

fn correlation_id(res: &axum::response::Response) -> String {
    res.headers()["x-correlation-id"].to_str().unwrap().to_string()
}

#[tokio::test]
async fn opted_in_html_request_is_injected_and_stored() {
    let _logs = tracing::subscriber::set_default(tracing_subscriber::registry().with(LogCaptureLayer));
    let (state, cache) = state(&debug_yaml());
    let (cookies, token) = opt_in(&state, true);

    let res = app(state).oneshot(get("/?q=1", Some(&cookies))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::CONTENT_LENGTH).is_none());
    let tiki_time: f64 = res.headers()["x-tiki-time"].to_str().unwrap().parse().unwrap();
    assert!(tiki_time >= 0.0);
    let cid = correlation_id(&res);

    let body = body_string(res).await;
    assert!(body.contains(&format!("<meta name=\"correlation_id\" value=\"{cid}\"></head>")));
    assert!(body.contains("window.TIKI_PROTOCOL = \"http\";"));
    assert!(body.ends_with("</script></body></html>"));

    let blob = cache.get(&metrics_key(&cid)).await.unwrap().expect("metrics stored");
    let m: ToolbarMetrics = serde_json::from_str(&blob).unwrap();
    assert!(m.singular_interval("total_time").is_some());
    assert!(m.singular_interval("user_cpu").is_some());
    assert!(m.singular.contains_key("memory"));
    assert_eq!(m.singular_str("request_path"), Some("/?q=1"));
    assert_eq!(m.singular_str("release"), Some("web-2026.10-abc123"));
    assert_eq!(m.singular_str("view"), Some("GET /"));
    assert_eq!(m.queries["SQL"][0].val, "SELECT id FROM users");
    assert_eq!(m.timed["templates"][0].val, "pages/home.html");
    assert_eq!(m.loglines[0].message, "served home");

    let history = cache.get(&history_key(&token)).await.unwrap();
    let history = RequestHistory::decode(history.as_deref()).unwrap();
    assert_eq!(history.entries().len(), 1);
    let entry = &history.entries()[0];
    assert_eq!(entry.c, cid);
    assert_eq!(entry.u, "/?q=1");
    assert_eq!(entry.v, "GET");
    assert_eq!(entry.s, 200);
}

#[tokio::test]
async fn panel_json_reads_back_the_request() {
    let (state, _cache) = state(&debug_yaml());
    let (cookies, _token) = opt_in(&state, true);
    let app = app(state);

    let first = app.clone().oneshot(get("/", Some(&cookies))).await.unwrap();
    let first_cid = correlation_id(&first);
    let second = app.clone().oneshot(get("/api", Some(&cookies))).await.unwrap();
    let second_cid = correlation_id(&second);
    assert_eq!(body_string(second).await, r#"{"ok":true}"#);

    let res = app
        .clone()
        .oneshot(get(&format!("/tikibar/?correlation_id={second_cid}"), Some(&cookies)))
        .await
        .unwrap();
    assert_eq!(res.headers()["x-suppress-tikibar"], "1");
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    let panel: Value = serde_json::from_str(&body_string(res).await).unwrap();

    assert_eq!(panel["correlation_id"], second_cid);
    assert_eq!(panel["release_hash"], "abc123");
    assert_eq!(panel["request_path"], "/api");
    assert_eq!(panel["timed"]["remote"][0]["val"], "GET users-service/1");
    let history = panel["request_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["c"], first_cid);
    assert!(history[0]["ago"].as_f64().unwrap() >= 0.0);

    let res = app
        .oneshot(get(
            &format!("/tikibar/?correlation_id={first_cid}&render=1&template=minibar"),
            Some(&cookies),
        ))
        .await
        .unwrap();
    let html = body_string(res).await;
    assert!(html.contains("tiki-head"));
    // Toolbar pages are never injected.
    assert!(!html.contains("window.TIKI_PROTOCOL"));
}

#[tokio::test]
async fn requests_without_a_token_pass_through() {
    let (state, cache) = state(&debug_yaml());
    let res = app(state).oneshot(get("/", None)).await.unwrap();

    assert!(res.headers().get("x-correlation-id").is_none());
    assert!(res.headers().get("x-tiki-time").is_none());
    assert_eq!(body_string(res).await, PAGE);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn blacklisted_paths_are_not_profiled() {
    let (state, cache) = state(&debug_yaml());
    let (cookies, _) = opt_in(&state, true);
    let res = app(state)
        .oneshot(get("/static/app.css", Some(&cookies)))
        .await
        .unwrap();
    assert!(res.headers().get("x-tiki-time").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn suppressed_responses_skip_injection_and_history() {
    let (state, cache) = state(&debug_yaml());
    let (cookies, token) = opt_in(&state, true);
    let res = app(state).oneshot(get("/raw", Some(&cookies))).await.unwrap();

    let cid = correlation_id(&res);
    assert_eq!(body_string(res).await, PAGE);
    assert!(cache.get(&metrics_key(&cid)).await.unwrap().is_some());
    assert!(cache.get(&history_key(&token)).await.unwrap().is_none());
}

#[tokio::test]
async fn sampler_output_is_recorded() {
    let yaml = format!("{}sampler:\n  enabled: true\n  interval_ms: 1\n", debug_yaml());
    let (state, cache) = state(&yaml);
    let (cookies, _) = opt_in(&state, true);
    let res = app(state).oneshot(get("/slow", Some(&cookies))).await.unwrap();

    let cid = correlation_id(&res);
    let blob = cache.get(&metrics_key(&cid)).await.unwrap().unwrap();
    let m: ToolbarMetrics = serde_json::from_str(&blob).unwrap();
    let samples = m.singular["sample_count"].as_u64().unwrap();
    let profile = m.singular_str("profile").unwrap();
    assert!(samples > 0);
    assert!(profile.starts_with("\"GET /slow "));

    let mut counted = 0;
    for entry in profile.split("\",\"") {
        let entry = entry.trim_matches('"');
        let (stack, count) = entry.rsplit_once(' ').unwrap();
        assert!(stack.starts_with("GET /slow"), "unexpected stack {stack:?}");
        counted += count.parse::<u64>().unwrap();
    }
    assert_eq!(counted, samples);
}

#[tokio::test]
async fn disabled_flag_still_hands_handlers_a_toolbar() {
    let yaml = format!(
        "version: 1\ntoolbar:\n  debug: true\n  enabled: false\n  secret_key: \"{}\"\n",
        support::SECRET
    );
    let (state, _) = state(&yaml);
    let host = Router::new().route(
        "/",
        get_route(|Extension(t): Extension<Toolbar>| async move { t.is_active().to_string() }),
    );
    let res = router::profiled(host, state).oneshot(get("/", None)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "false");
}
