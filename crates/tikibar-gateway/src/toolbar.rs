//! Per-request toolbar handle.
//!
//! The profiling middleware creates one [`Toolbar`] per request and makes it
//! reachable two ways: as an axum request extension
//! (`Extension<Toolbar>`), and as the task-local "current toolbar" returned by
//! [`current_toolbar`]. Code without access to the request (a database
//! wrapper, the log capture layer) uses the latter. Work spawned onto other
//! tasks does not inherit the task-local and should receive a clone instead.
//!
//! Every recording call is a no-op when the toolbar is inactive.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use tikibar_core::metrics::{MetricsContainer, SQL, TEMPLATES};
use tikibar_core::timing::epoch_seconds;
use tikibar_core::Result;

use crate::profile::{FrameGuard, FrameStack};

tokio::task_local! {
    static CURRENT_TOOLBAR: Toolbar;
}

/// Correlation id of the toolbar returned outside of any request.
pub const NO_REQUEST: &str = "no-correlation-id-because-no-request";

#[derive(Clone)]
pub struct Toolbar {
    inner: Arc<ToolbarInner>,
}

struct ToolbarInner {
    correlation_id: String,
    active: bool,
    code_root: Option<String>,
    container: Mutex<MetricsContainer>,
    frames: FrameStack,
}

impl std::fmt::Debug for Toolbar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbar")
            .field("correlation_id", &self.inner.correlation_id)
            .field("active", &self.inner.active)
            .finish()
    }
}

impl Toolbar {
    pub fn new(
        correlation_id: impl Into<String>,
        active: bool,
        max_size: usize,
        code_root: Option<String>,
    ) -> Self {
        let correlation_id = correlation_id.into();
        let container = MetricsContainer::new(correlation_id.clone(), active).with_max_size(max_size);
        Self {
            inner: Arc::new(ToolbarInner {
                correlation_id,
                active,
                code_root,
                container: Mutex::new(container),
                frames: FrameStack::new(),
            }),
        }
    }

    pub fn inactive(correlation_id: &str) -> Self {
        Self::new(correlation_id, false, MetricsContainer::DEFAULT_MAX_SIZE, None)
    }

    pub fn correlation_id(&self) -> &str {
        &self.inner.correlation_id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active
    }

    pub fn frames(&self) -> &FrameStack {
        &self.inner.frames
    }

    /// Run `fut` with this toolbar as the current one.
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CURRENT_TOOLBAR.scope(self, fut).await
    }

    fn record(&self, f: impl FnOnce(&mut MetricsContainer)) {
        if !self.inner.active {
            return;
        }
        // A poisoned lock means a recording call panicked; skip rather than
        // propagate into the host request.
        if let Ok(mut c) = self.inner.container.lock() {
            f(&mut c);
        }
    }

    pub fn add_timed_metric(&self, metric_type: &str, val: impl Into<String>, start: f64, stop: f64) {
        self.record(|c| c.add_timed_metric(metric_type, val, start, stop));
    }

    pub fn add_query_metric(
        &self,
        metric_type: &str,
        query_type: impl Into<String>,
        val: impl Into<String>,
        start: f64,
        stop: f64,
        needs_format: bool,
    ) {
        self.record(|c| c.add_query_metric(metric_type, query_type, val, start, stop, needs_format));
    }

    pub fn add_sql_query_metric(
        &self,
        query_type: impl Into<String>,
        val: impl Into<String>,
        start: f64,
        stop: f64,
    ) {
        self.record(|c| c.add_sql_query_metric(query_type, val, start, stop));
    }

    pub fn add_freeform_metric(&self, metric_type: &str, data: Value) {
        self.record(|c| c.add_freeform_metric(metric_type, data));
    }

    pub fn add_singular_metric(&self, metric_type: &str, data: Value) {
        self.record(|c| c.add_singular_metric(metric_type, data));
    }

    pub fn add_logline(&self, level: impl Into<String>, message: impl Into<String>) {
        self.record(|c| c.add_logline(level, message));
    }

    /// Like [`Self::add_logline`] but drops the line instead of waiting when
    /// the container is busy.
    pub fn try_add_logline(&self, level: impl Into<String>, message: impl Into<String>) {
        if !self.inner.active {
            return;
        }
        if let Ok(mut c) = self.inner.container.try_lock() {
            c.add_logline(level, message);
        }
    }

    pub fn add_analytics_action_metric(&self, data: Map<String, Value>) {
        self.record(|c| c.add_analytics_action_metric(data));
    }

    /// Record the handler serving this request. `file` is the handler's
    /// source file (`file!()`); it is shown relative to the configured code
    /// root.
    pub fn set_view_callable<H>(&self, _handler: &H, file: &str) {
        let subpath = find_view_subpath(file, self.inner.code_root.as_deref());
        self.set_view(std::any::type_name::<H>(), subpath);
    }

    pub fn set_view(&self, view: impl Into<String>, filepath: impl Into<String>) {
        self.record(|c| c.set_view_callable(view, filepath));
    }

    /// Enter a named sampler frame.
    pub fn enter(&self, frame: impl Into<String>) -> FrameGuard {
        self.inner.frames.enter(frame)
    }

    /// Time `f` and record it under `metric_type`.
    pub fn timed<T>(&self, metric_type: &str, val: impl Into<String>, f: impl FnOnce() -> T) -> T {
        if !self.is_active() {
            return f();
        }
        let val = val.into();
        let _frame = self.enter(format!("{metric_type}:{val}"));
        let start = epoch_seconds();
        let out = f();
        self.add_timed_metric(metric_type, val, start, epoch_seconds());
        out
    }

    /// Async variant of [`Self::timed`], e.g. for remote-service calls.
    pub async fn timed_async<F: Future>(&self, metric_type: &str, val: impl Into<String>, fut: F) -> F::Output {
        if !self.is_active() {
            return fut.await;
        }
        let val = val.into();
        let _frame = self.enter(format!("{metric_type}:{val}"));
        let start = epoch_seconds();
        let out = fut.await;
        self.add_timed_metric(metric_type, val, start, epoch_seconds());
        out
    }

    /// Time a template render.
    pub fn template<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        self.timed(TEMPLATES, name, f)
    }

    /// Time a SQL query; the text is formatted when the panel renders it.
    pub fn sql<T>(&self, query_type: &str, sql: &str, f: impl FnOnce() -> T) -> T {
        if !self.is_active() {
            return f();
        }
        let _frame = self.enter(format!("{SQL}:{query_type}"));
        let start = epoch_seconds();
        let out = f();
        self.add_sql_query_metric(query_type, sql, start, epoch_seconds());
        out
    }

    /// Async variant of [`Self::sql`].
    pub async fn sql_async<F: Future>(&self, query_type: &str, sql: &str, fut: F) -> F::Output {
        if !self.is_active() {
            return fut.await;
        }
        let _frame = self.enter(format!("{SQL}:{query_type}"));
        let start = epoch_seconds();
        let out = fut.await;
        self.add_sql_query_metric(query_type, sql, start, epoch_seconds());
        out
    }

    /// Apply the size policy and serialize. `None` when inactive.
    pub fn write_metrics(&self) -> Result<Option<String>> {
        if !self.inner.active {
            return Ok(None);
        }
        match self.inner.container.lock() {
            Ok(mut c) => c.write_metrics().map(Some),
            Err(_) => {
                tracing::warn!(
                    correlation_id = %self.inner.correlation_id,
                    "metrics container lock poisoned; dropping metrics"
                );
                Ok(None)
            }
        }
    }
}

/// The toolbar of the request being handled by this task, or an inactive
/// placeholder.
pub fn current_toolbar() -> Toolbar {
    CURRENT_TOOLBAR
        .try_with(Toolbar::clone)
        .unwrap_or_else(|_| Toolbar::inactive(NO_REQUEST))
}

/// `full_path` relative to `root`; empty when no root is configured or the
/// file lives outside it.
pub fn find_view_subpath(full_path: &str, root: Option<&str>) -> String {
    let Some(root) = root else {
        return String::new();
    };
    let full_abs = canonical(full_path);
    let root_abs = canonical(root);

    match full_abs.strip_prefix(&root_abs) {
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => {
            tracing::warn!(
                full = %full_abs.display(),
                root = %root_abs.display(),
                "view filepath not under configured code root"
            );
            String::new()
        }
    }
}

fn canonical(p: &str) -> PathBuf {
    std::fs::canonicalize(p).unwrap_or_else(|_| Path::new(p).to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tikibar_core::metrics::ToolbarMetrics;

    fn decode(t: &Toolbar) -> ToolbarMetrics {
        serde_json::from_str(&t.write_metrics().unwrap().unwrap()).unwrap()
    }

    #[test]
    fn inactive_toolbar_records_nothing() {
        let t = Toolbar::inactive("x");
        assert_eq!(t.sql("SELECT", "select 1", || 5), 5);
        assert_eq!(t.write_metrics().unwrap(), None);
    }

    #[test]
    fn poisoned_container_drops_metrics() {
        let t = Toolbar::new("poisoned", true, 1024 * 1024, None);
        let held = t.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = held.inner.container.lock().unwrap();
            panic!("handler crashed while recording");
        })
        .join();
        assert!(crashed.is_err());
        assert_eq!(t.write_metrics().unwrap(), None);
    }

    #[test]
    fn helpers_record_timings() {
        let t = Toolbar::new("cid", true, 1024 * 1024, None);
        t.template("home.html", || ());
        t.sql("SELECT", "select 1", || ());
        let m = decode(&t);
        assert_eq!(m.timed[TEMPLATES][0].val, "home.html");
        assert_eq!(m.queries[SQL][0].query_type, "SELECT");
        assert!(m.queries[SQL][0].timing.stop() >= m.queries[SQL][0].timing.start());
        assert_eq!(t.frames().depth(), 0);
    }

    #[tokio::test]
    async fn current_toolbar_follows_scope() {
        assert_eq!(current_toolbar().correlation_id(), NO_REQUEST);

        let t = Toolbar::new("scoped", true, 1024 * 1024, None);
        let seen = t
            .clone()
            .scope(async {
                let cur = current_toolbar();
                cur.timed_async("remote", "GET /users", async { 1 }).await;
                cur.correlation_id().to_string()
            })
            .await;
        assert_eq!(seen, "scoped");
        assert_eq!(decode(&t).timed["remote"][0].val, "GET /users");
    }

    #[test]
    fn view_subpath_relative_to_root() {
        assert_eq!(find_view_subpath("/srv/app/views/home.rs", None), "");
        assert_eq!(
            find_view_subpath("/nonexistent-root/app/views/home.rs", Some("/nonexistent-root")),
            "app/views/home.rs"
        );
        assert_eq!(find_view_subpath("/elsewhere/x.rs", Some("/nonexistent-root")), "");
    }
}
