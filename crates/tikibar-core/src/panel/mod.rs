//! Panel reconstruction: turn a stored metrics blob into display-ready data.
//!
//! The panel is what the toolbar view serves, either as JSON or rendered to
//! HTML. Intervals are expanded to millisecond timings, queries of every
//! backend are flattened into one start-ordered list, and every timed list is
//! laid out as proportional bars (see [`bars`]).

pub mod bars;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::history::HistoryEntry;
use crate::html::{escape, slasherize};
use crate::metrics::{AnalyticsAction, LogLine, TimedMetric, ToolbarMetrics, TEMPLATES};
use crate::sql::reformat_sql;
use crate::timing::{Interval, Timing};

pub use bars::{Bar, MAX_PERCENT, PALETTE};

/// Requests slower than this are flagged.
pub const DEFAULT_ANGER_THRESHOLD_MS: f64 = 500.0;

/// Singular metrics the panel lifts into typed fields.
const CONSUMED_SINGULAR: &[&str] = &[
    "total_time",
    "user_cpu",
    "system_cpu",
    "memory",
    "release",
    "request_path",
    "view",
    "view_filepath",
    "profile",
    "sample_count",
];

/// Inputs to [`Panel::build`] that do not come from the stored blob.
#[derive(Debug, Clone)]
pub struct PanelContext {
    pub correlation_id: String,
    /// The user's request history, oldest first, as stored.
    pub history: Vec<HistoryEntry>,
    pub now: f64,
    pub anger_threshold_ms: f64,
    pub source_control_url: Option<String>,
    pub log_search_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    /// Seconds since the request started.
    pub ago: f64,
    /// Duration in milliseconds.
    pub ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBar {
    pub name: String,
    pub ms: f64,
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRow {
    pub sql: String,
    #[serde(rename = "type")]
    pub query_type: String,
    pub metric_type: String,
    pub timing: Timing,
    pub bar: Bar,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimedRow {
    pub val: String,
    pub timing: Timing,
    pub bar: Bar,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemplateRow {
    pub filepath: String,
    pub filepath_with_slashes: String,
    pub timing: Timing,
    pub bar: Bar,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Panel {
    pub correlation_id: String,
    pub release: String,
    pub release_hash: String,
    pub request_path: Option<String>,
    pub view: Option<String>,
    pub view_filepath: Option<String>,
    pub view_filepath_with_slashes: Option<String>,

    pub total_time: Timing,
    pub user_cpu: Option<Timing>,
    pub system_cpu: Option<Timing>,
    pub memory: Option<Value>,
    pub angry: bool,

    pub bars: Vec<CategoryBar>,
    pub queries: Vec<QueryRow>,
    pub query_time_ms: f64,
    pub templates: Vec<TemplateRow>,
    /// Timed metrics other than templates, e.g. remote-service calls.
    pub timed: BTreeMap<String, Vec<TimedRow>>,

    pub loglines: Vec<LogLine>,
    pub analytics: Vec<AnalyticsAction>,
    pub analytics_raw: Vec<Value>,
    pub freeform: BTreeMap<String, Vec<Value>>,
    pub profile: Option<String>,
    pub sample_count: Option<u64>,
    /// Singular metrics without a dedicated field.
    pub extra: BTreeMap<String, Value>,

    pub request_history: Vec<HistoryRow>,
    pub source_control_url: Option<String>,
    pub log_search_url: Option<String>,
}

impl Panel {
    pub fn build(metrics: ToolbarMetrics, ctx: PanelContext) -> Self {
        let total_time = metrics
            .singular_interval("total_time")
            .map(|iv| iv.expand())
            .unwrap_or(Timing { start: 0.0, end: 0.0, duration: 0.0 });

        let (queries, bars, query_time_ms) = build_queries(&metrics, total_time.duration);

        let mut templates = Vec::new();
        let mut timed = BTreeMap::new();
        for (metric_type, items) in &metrics.timed {
            if metric_type == TEMPLATES {
                templates = build_timed(items)
                    .into_iter()
                    .map(|row| TemplateRow {
                        filepath_with_slashes: slasherize(&row.val),
                        filepath: row.val,
                        timing: row.timing,
                        bar: row.bar,
                        color: row.color,
                    })
                    .collect();
            } else {
                timed.insert(metric_type.clone(), build_timed(items));
            }
        }

        let release = metrics.singular_str("release").unwrap_or("master").to_string();
        let release_hash = release.rsplit('-').next().unwrap_or_default().to_string();
        let view_filepath = metrics
            .singular_str("view_filepath")
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let request_history = ctx
            .history
            .into_iter()
            .rev()
            .filter(|e| e.c != ctx.correlation_id)
            .map(|entry| HistoryRow {
                ago: ctx.now - entry.t,
                ms: entry.d * 1000.0,
                entry,
            })
            .collect();

        let extra = metrics
            .singular
            .iter()
            .filter(|(k, _)| !CONSUMED_SINGULAR.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Panel {
            correlation_id: ctx.correlation_id,
            release_hash,
            release,
            request_path: metrics.singular_str("request_path").map(str::to_string),
            view: metrics.singular_str("view").map(str::to_string),
            view_filepath_with_slashes: view_filepath.as_deref().map(slasherize),
            view_filepath,
            angry: total_time.duration > ctx.anger_threshold_ms,
            total_time,
            user_cpu: metrics.singular_interval("user_cpu").map(|iv| iv.expand()),
            system_cpu: metrics.singular_interval("system_cpu").map(|iv| iv.expand()),
            memory: metrics.singular.get("memory").cloned(),
            bars,
            queries,
            query_time_ms,
            templates,
            timed,
            profile: metrics.singular_str("profile").map(str::to_string),
            sample_count: metrics.singular.get("sample_count").and_then(Value::as_u64),
            extra,
            loglines: metrics.loglines,
            analytics: metrics.analytics,
            analytics_raw: metrics.analytics_raw,
            freeform: metrics.freeform,
            request_history,
            source_control_url: ctx.source_control_url,
            log_search_url: ctx.log_search_url,
        }
    }
}

fn build_queries(metrics: &ToolbarMetrics, total_ms: f64) -> (Vec<QueryRow>, Vec<CategoryBar>, f64) {
    let mut rows = Vec::new();
    let mut intervals = Vec::new();
    let mut categories = Vec::new();
    let mut query_time_ms = 0.0;

    for (metric_type, items) in &metrics.queries {
        let mut metric_ms = 0.0;
        for q in items {
            let sql = if q.needs_format { reformat_sql(&q.val) } else { escape(&q.val) };
            metric_ms += q.timing.duration_ms();
            intervals.push(q.timing);
            rows.push((metric_type.clone(), q.query_type.clone(), sql, q.timing));
        }
        categories.push((metric_type.clone(), metric_ms));
        query_time_ms += metric_ms;
    }
    categories.push(("Other".to_string(), (total_ms - query_time_ms).max(0.0)));

    let bars: Vec<CategoryBar> = categories
        .into_iter()
        .zip(PALETTE.iter().cycle())
        .map(|((name, ms), color)| CategoryBar {
            width: bars::share_percent(ms, total_ms),
            name,
            ms,
            color: (*color).to_string(),
        })
        .collect();

    let layout = bars::layout(&intervals);
    let mut slots: Vec<Option<_>> = rows.into_iter().map(Some).collect();
    let queries = bars::start_order(&intervals)
        .into_iter()
        .filter_map(|i| {
            let (metric_type, query_type, sql, timing) = slots[i].take()?;
            Some(QueryRow {
                color: bars::color_for(&sql),
                sql,
                query_type,
                metric_type,
                timing: timing.expand(),
                bar: layout[i],
            })
        })
        .collect();

    (queries, bars, query_time_ms)
}

fn build_timed(items: &[TimedMetric]) -> Vec<TimedRow> {
    let intervals: Vec<Interval> = items.iter().map(|t| t.timing).collect();
    let layout = bars::layout(&intervals);
    bars::start_order(&intervals)
        .into_iter()
        .map(|i| TimedRow {
            val: items[i].val.clone(),
            timing: items[i].timing.expand(),
            bar: layout[i],
            color: bars::color_for(&items[i].val),
        })
        .collect()
}
