//! Per-request metrics container.
//!
//! A `MetricsContainer` accumulates everything the toolbar knows about one
//! request: timed sub-operations (templates, remote calls), queries grouped by
//! backend, log lines, analytics actions and one-off values. At the end of the
//! request `write_metrics` serializes it under a size ceiling (see
//! [`truncate`]) so the blob fits a shared cache.

pub mod truncate;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::timing::Interval;

/// Metric type used for SQL queries.
pub const SQL: &str = "SQL";
/// Metric type used for template renders.
pub const TEMPLATES: &str = "templates";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetric {
    /// Backend-specific operation kind, e.g. `SELECT` or `GET`.
    pub query_type: String,
    pub val: String,
    /// Whether the panel should run the text through the SQL formatter.
    pub needs_format: bool,
    pub timing: Interval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedMetric {
    pub val: String,
    pub timing: Interval,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub level: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsAction {
    pub name: String,
    /// Sorted `key:value` lines.
    pub formatted: String,
}

/// Everything recorded for one request, in its cached form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolbarMetrics {
    #[serde(default)]
    pub queries: BTreeMap<String, Vec<QueryMetric>>,
    #[serde(default)]
    pub timed: BTreeMap<String, Vec<TimedMetric>>,
    #[serde(default)]
    pub freeform: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub loglines: Vec<LogLine>,
    #[serde(default)]
    pub analytics: Vec<AnalyticsAction>,
    #[serde(default)]
    pub analytics_raw: Vec<Value>,
    #[serde(default)]
    pub singular: BTreeMap<String, Value>,
}

impl ToolbarMetrics {
    /// Serialized size in bytes, the measure the size ceiling applies to.
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(serde_json::to_vec(self)?.len())
    }

    pub fn singular_interval(&self, key: &str) -> Option<Interval> {
        self.singular
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn singular_str(&self, key: &str) -> Option<&str> {
        self.singular.get(key).and_then(Value::as_str)
    }
}

/// Accumulator for one request's metrics.
#[derive(Debug, Clone)]
pub struct MetricsContainer {
    correlation_id: String,
    active: bool,
    max_size: usize,
    metrics: ToolbarMetrics,
}

impl MetricsContainer {
    /// If the metrics serialize longer than this, parts are dropped so the
    /// blob still fits a cache entry.
    pub const DEFAULT_MAX_SIZE: usize = 1000 * 1024;

    pub fn new(correlation_id: impl Into<String>, active: bool) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            active,
            max_size: Self::DEFAULT_MAX_SIZE,
            metrics: ToolbarMetrics::default(),
        }
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn metrics(&self) -> &ToolbarMetrics {
        &self.metrics
    }

    /// Record the handler serving this request and its code-base-relative path.
    pub fn set_view_callable(&mut self, view: impl Into<String>, filepath: impl Into<String>) {
        self.add_singular_metric("view", Value::String(view.into()));
        self.add_singular_metric("view_filepath", Value::String(filepath.into()));
    }

    pub fn add_timed_metric(
        &mut self,
        metric_type: &str,
        val: impl Into<String>,
        start: f64,
        stop: f64,
    ) {
        self.metrics
            .timed
            .entry(metric_type.to_string())
            .or_default()
            .push(TimedMetric {
                val: val.into(),
                timing: Interval::new(start, stop),
            });
    }

    pub fn add_query_metric(
        &mut self,
        metric_type: &str,
        query_type: impl Into<String>,
        val: impl Into<String>,
        start: f64,
        stop: f64,
        needs_format: bool,
    ) {
        self.metrics
            .queries
            .entry(metric_type.to_string())
            .or_default()
            .push(QueryMetric {
                query_type: query_type.into(),
                val: val.into(),
                needs_format,
                timing: Interval::new(start, stop),
            });
    }

    pub fn add_sql_query_metric(
        &mut self,
        query_type: impl Into<String>,
        val: impl Into<String>,
        start: f64,
        stop: f64,
    ) {
        self.add_query_metric(SQL, query_type, val, start, stop, true);
    }

    pub fn add_freeform_metric(&mut self, metric_type: &str, data: Value) {
        self.metrics
            .freeform
            .entry(metric_type.to_string())
            .or_default()
            .push(data);
    }

    /// Set a one-off value, replacing any previous value of that type.
    pub fn add_singular_metric(&mut self, metric_type: &str, data: Value) {
        self.metrics.singular.insert(metric_type.to_string(), data);
    }

    pub fn add_logline(&mut self, level: impl Into<String>, message: impl Into<String>) {
        self.metrics.loglines.push(LogLine {
            level: level.into(),
            message: message.into(),
        });
    }

    /// Record an analytics action.
    ///
    /// The action name is the first element of `data["actions"]` (a plain
    /// string is accepted too). A sorted `key:value` rendering is kept for
    /// display and the raw object for JSON export.
    pub fn add_analytics_action_metric(&mut self, data: Map<String, Value>) {
        let name = match data.get("actions") {
            Some(Value::Array(items)) => items.first().map(value_text).unwrap_or_default(),
            Some(other) => value_text(other),
            None => String::new(),
        };
        let formatted = format_analytics_action(&data);
        self.metrics.analytics.push(AnalyticsAction {
            name: name.clone(),
            formatted,
        });

        let mut raw = Map::new();
        raw.insert(name, Value::Object(data));
        self.metrics.analytics_raw.push(Value::Object(raw));
    }

    /// Apply the size policy and serialize.
    pub fn write_metrics(&mut self) -> Result<String> {
        truncate::fit_to_size(&mut self.metrics, self.max_size)?;
        Ok(serde_json::to_string(&self.metrics)?)
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Render analytics data as `key:value` lines in key order.
pub fn format_analytics_action(data: &Map<String, Value>) -> String {
    let mut keys: Vec<&String> = data.keys().collect();
    keys.sort();
    keys.iter()
        .map(|k| format!("{}:{}", k, data.get(*k).map(value_text).unwrap_or_default()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn singular_metric_overwrites() {
        let mut c = MetricsContainer::new("cid", true);
        c.add_singular_metric("release", json!("a"));
        c.add_singular_metric("release", json!("b"));
        assert_eq!(c.metrics().singular_str("release"), Some("b"));
    }

    #[test]
    fn sql_queries_are_grouped_and_flagged() {
        let mut c = MetricsContainer::new("cid", true);
        c.add_sql_query_metric("SELECT", "select 1", 1.0, 1.1);
        c.add_query_metric("redis", "GET", "user:1", 1.0, 1.01, false);
        let m = c.metrics();
        assert!(m.queries["SQL"][0].needs_format);
        assert!(!m.queries["redis"][0].needs_format);
    }

    #[test]
    fn analytics_name_and_formatting() {
        let mut c = MetricsContainer::new("cid", true);
        let data = json!({
            "path": "/",
            "actions": ["PageViewAction"],
            "correlation_id": "abc"
        });
        let Value::Object(map) = data else { unreachable!() };
        c.add_analytics_action_metric(map);

        let a = &c.metrics().analytics[0];
        assert_eq!(a.name, "PageViewAction");
        assert_eq!(
            a.formatted,
            "actions:[\"PageViewAction\"]\ncorrelation_id:abc\npath:/"
        );
        assert!(c.metrics().analytics_raw[0].get("PageViewAction").is_some());
    }

    #[test]
    fn stored_blob_round_trips() {
        let mut c = MetricsContainer::new("cid", true);
        c.add_timed_metric(TEMPLATES, "index.html", 1.0, 1.2);
        c.add_logline("INFO", "hello");
        let s = c.write_metrics().unwrap();
        let back: ToolbarMetrics = serde_json::from_str(&s).unwrap();
        assert_eq!(&back, c.metrics());
    }
}
