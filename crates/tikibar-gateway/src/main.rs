//! Tikibar demo host.
//!
//! Serves a sample page that renders a template, runs a few queries and two
//! remote calls, with the toolbar mounted alongside.
//! - Config: `$TIKIBAR_CONFIG` (default `tikibar.yaml`)
//! - Toolbar: `/tikibar/settings/` to opt in, then reload `/`

use std::net::SocketAddr;
use std::time::Duration;

use axum::{response::Html, routing::get, Router};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tikibar_core::timing::epoch_seconds;
use tikibar_gateway::{app_state::AppState, config, current_toolbar, obs::LogCaptureLayer, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(LogCaptureLayer)
        .init();

    let path = std::env::var("TIKIBAR_CONFIG").unwrap_or_else(|_| "tikibar.yaml".into());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse()?;

    let state = AppState::new(cfg)?;
    let host = Router::new().route("/", get(home));
    let app = router::profiled(host, state);

    tracing::info!(%listen, config = %path, "tikibar demo starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn home() -> Html<String> {
    let toolbar = current_toolbar();
    toolbar.set_view_callable(&home, file!());
    tracing::info!(user = "demo", "rendering home page");

    toolbar
        .sql_async(
            "SELECT",
            "SELECT id, name, email, created_at FROM users WHERE active = 1 /* home */",
            tokio::time::sleep(Duration::from_millis(4)),
        )
        .await;

    futures_util::future::join(
        toolbar.timed_async("remote", "GET profile-service/me", tokio::time::sleep(Duration::from_millis(12))),
        toolbar.timed_async("remote", "GET feed-service/latest", tokio::time::sleep(Duration::from_millis(8))),
    )
    .await;

    let start = epoch_seconds();
    let session = "demo";
    toolbar.add_query_metric("redis", "GET", format!("session:{session}"), start, epoch_seconds(), false);
    toolbar.sql("UPDATE", "UPDATE users SET last_seen = now() WHERE id = 1", || ());

    let body = toolbar.template("pages/home.html", || {
        "<html><head><title>tikibar demo</title></head>\
         <body><h1>Hello from the tikibar demo</h1></body></html>"
            .to_string()
    });
    Html(body)
}
