//! Best-effort size policy applied before metrics are handed to the cache.
//!
//! Each pass runs only while the serialized blob is still larger than the
//! ceiling, and each one throws away more detail:
//! 1. log lines are replaced by a single marker line;
//! 2. SQL text loses its `/* ... */` comment and is cut to 50 characters;
//! 3. SQL text is blanked.
//!
//! Timings are never touched. If the blob is still too large after the last
//! pass it is published as is.

use crate::error::Result;

use super::{LogLine, ToolbarMetrics, SQL};

/// Characters of SQL kept by the second pass.
pub const SQL_PREVIEW_CHARS: usize = 50;

pub const LOGS_DROPPED_MESSAGE: &str = "Logs too big for cache";

/// Degrade `metrics` until it serializes within `max_size` bytes or nothing is
/// left to drop. Returns the number of passes applied.
pub fn fit_to_size(metrics: &mut ToolbarMetrics, max_size: usize) -> Result<usize> {
    let passes: [fn(&mut ToolbarMetrics); 3] = [drop_loglines, shorten_sql, blank_sql];

    let mut applied = 0;
    for pass in passes {
        if metrics.encoded_len()? <= max_size {
            break;
        }
        pass(metrics);
        applied += 1;
    }

    if applied > 0 {
        tracing::warn!(passes = applied, max_size, "toolbar metrics truncated to fit cache");
    }
    Ok(applied)
}

fn drop_loglines(metrics: &mut ToolbarMetrics) {
    metrics.loglines = vec![LogLine {
        level: "ERROR".into(),
        message: LOGS_DROPPED_MESSAGE.into(),
    }];
}

fn shorten_sql(metrics: &mut ToolbarMetrics) {
    if let Some(queries) = metrics.queries.get_mut(SQL) {
        for q in queries.iter_mut() {
            q.val = sql_preview(&q.val);
        }
    }
}

fn blank_sql(metrics: &mut ToolbarMetrics) {
    if let Some(queries) = metrics.queries.get_mut(SQL) {
        for q in queries.iter_mut() {
            q.val.clear();
        }
    }
}

/// Strip the comment span and keep a short prefix.
pub fn sql_preview(sql: &str) -> String {
    let stripped = strip_comment_span(sql);
    let mut out: String = stripped.chars().take(SQL_PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

/// Remove everything from the first `/*` to the last `*/` on the same line,
/// provided the comment has a non-empty body.
fn strip_comment_span(sql: &str) -> String {
    sql.split('\n')
        .map(|line| {
            let Some(open) = line.find("/*") else {
                return line.to_string();
            };
            match line.rfind("*/") {
                Some(close) if close > open + 2 => {
                    format!("{}{}", &line[..open], &line[close + 2..])
                }
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
