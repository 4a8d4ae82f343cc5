//! HTML pages served by the toolbar views.
//!
//! `Panel` string fields that end in markup (`sql`, `*_with_slashes`) are
//! already escaped; everything else is escaped here.

use std::fmt::Write;

use tikibar_core::html::escape;
use tikibar_core::panel::{Bar, Panel, TimedRow};

const STYLE: &str = "\
body{margin:0;font:12px/1.4 Menlo,Consolas,monospace;background:#1d1f21;color:#c5c8c6}\
a{color:#81a2be}\
.tiki-head{display:flex;gap:16px;align-items:center;padding:8px 12px;background:#282a2e}\
.tiki-angry{color:#f53522;font-weight:bold}\
.tiki-summary{display:flex;height:10px;margin:4px 12px}\
.tiki-summary span{display:block;height:100%}\
.tiki-section{padding:6px 12px}\
.tiki-section h3{margin:4px 0;font-size:12px;text-transform:uppercase;color:#969896}\
.tiki-row{display:flex;gap:8px;align-items:center}\
.tiki-track{position:relative;flex:0 0 200px;height:8px;background:#373b41}\
.tiki-track span{position:absolute;top:0;height:100%;min-width:1px}\
.tiki-ms{flex:0 0 70px;text-align:right}\
.tiki-slash{color:#969896}\
pre{margin:0;white-space:pre-wrap}";

/// Tell the parent page how tall this frame wants to be.
const HEIGHT_SCRIPT: &str = "<script>(function(){function h(){window.parent.postMessage(\
JSON.stringify({tiki_msg_type:'height',height:document.body.scrollHeight}),'*');}\
window.addEventListener('load',h);})();</script>";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title>\
         <style>{STYLE}</style></head><body>{body}</body></html>",
        escape(title)
    )
}

fn ms(v: f64) -> String {
    format!("{v:.1}ms")
}

fn track(bar: &Bar, color: &str) -> String {
    format!(
        "<div class=\"tiki-track\"><span style=\"left:{:.2}%;width:{:.2}%;background:{}\"></span></div>",
        bar.left,
        bar.width,
        escape(color)
    )
}

fn head(panel: &Panel) -> String {
    let mut out = String::from("<div class=\"tiki-head\">");
    let class = if panel.angry { " class=\"tiki-angry\"" } else { "" };
    let _ = write!(out, "<span{class}>{}</span>", ms(panel.total_time.duration));
    if let Some(cpu) = &panel.user_cpu {
        let _ = write!(out, "<span>cpu {}</span>", ms(cpu.duration));
    }
    let _ = write!(
        out,
        "<span>sql {} ({} queries)</span>",
        ms(panel.query_time_ms),
        panel.queries.len()
    );
    if let Some(path) = &panel.request_path {
        let _ = write!(out, "<span>{}</span>", escape(path));
    }
    if let Some(view) = &panel.view {
        let _ = write!(out, "<span>{}</span>", escape(view));
    }
    match &panel.source_control_url {
        Some(url) => {
            let _ = write!(
                out,
                "<a href=\"{}{}\">{}</a>",
                escape(url),
                escape(&panel.release_hash),
                escape(&panel.release)
            );
        }
        None => {
            let _ = write!(out, "<span>{}</span>", escape(&panel.release));
        }
    }
    if let Some(url) = &panel.log_search_url {
        let _ = write!(
            out,
            "<a href=\"{}{}\">logs</a>",
            escape(url),
            escape(&panel.correlation_id)
        );
    }
    out.push_str("</div><div class=\"tiki-summary\">");
    for bar in &panel.bars {
        let _ = write!(
            out,
            "<span title=\"{} {}\" style=\"width:{:.2}%;background:{}\"></span>",
            escape(&bar.name),
            ms(bar.ms),
            bar.width,
            escape(&bar.color)
        );
    }
    out.push_str("</div>");
    out
}

fn timed_rows(out: &mut String, title: &str, rows: &[TimedRow]) {
    if rows.is_empty() {
        return;
    }
    let _ = write!(out, "<div class=\"tiki-section\"><h3>{}</h3>", escape(title));
    for row in rows {
        let _ = write!(
            out,
            "<div class=\"tiki-row\">{}<span class=\"tiki-ms\">{}</span><pre>{}</pre></div>",
            track(&row.bar, &row.color),
            ms(row.timing.duration),
            escape(&row.val)
        );
    }
    out.push_str("</div>");
}

/// Full toolbar for one request.
pub fn tikibar(panel: Option<&Panel>) -> String {
    let Some(panel) = panel else {
        return page("tikibar", "<div class=\"tiki-head\">No data for this request (yet).</div>");
    };
    let mut out = head(panel);

    if let Some(fp) = &panel.view_filepath_with_slashes {
        let _ = write!(out, "<div class=\"tiki-section\"><h3>view</h3><pre>{fp}</pre></div>");
    }

    if !panel.queries.is_empty() {
        out.push_str("<div class=\"tiki-section\"><h3>queries</h3>");
        for q in &panel.queries {
            let _ = write!(
                out,
                "<div class=\"tiki-row\">{}<span class=\"tiki-ms\">{}</span><span>{} {}</span><pre>{}</pre></div>",
                track(&q.bar, &q.color),
                ms(q.timing.duration),
                escape(&q.metric_type),
                escape(&q.query_type),
                q.sql
            );
        }
        out.push_str("</div>");
    }

    if !panel.templates.is_empty() {
        out.push_str("<div class=\"tiki-section\"><h3>templates</h3>");
        for t in &panel.templates {
            let _ = write!(
                out,
                "<div class=\"tiki-row\">{}<span class=\"tiki-ms\">{}</span><pre>{}</pre></div>",
                track(&t.bar, &t.color),
                ms(t.timing.duration),
                t.filepath_with_slashes
            );
        }
        out.push_str("</div>");
    }

    for (metric_type, rows) in &panel.timed {
        timed_rows(&mut out, metric_type, rows);
    }

    if !panel.loglines.is_empty() {
        out.push_str("<div class=\"tiki-section\"><h3>log</h3>");
        for line in &panel.loglines {
            let _ = write!(out, "<pre>{} {}</pre>", escape(&line.level), escape(&line.message));
        }
        out.push_str("</div>");
    }

    if !panel.analytics.is_empty() {
        out.push_str("<div class=\"tiki-section\"><h3>analytics</h3>");
        for a in &panel.analytics {
            let _ = write!(out, "<pre><b>{}</b>\n{}</pre>", escape(&a.name), escape(&a.formatted));
        }
        out.push_str("</div>");
    }

    if let Some(profile) = panel.profile.as_deref().filter(|p| !p.is_empty()) {
        let _ = write!(
            out,
            "<div class=\"tiki-section\"><h3>profile ({} samples)</h3><pre>{}</pre></div>",
            panel.sample_count.unwrap_or_default(),
            escape(profile)
        );
    }

    if !panel.request_history.is_empty() {
        out.push_str("<div class=\"tiki-section\"><h3>history</h3>");
        for row in &panel.request_history {
            let _ = write!(
                out,
                "<div class=\"tiki-row\"><span class=\"tiki-ms\">{}</span><span>{} {}</span>\
                 <a href=\"/tikibar/?correlation_id={}&amp;render=1\">{}</a><span>{:.0}s ago</span></div>",
                ms(row.ms),
                row.entry.s,
                escape(&row.entry.v),
                escape(&row.entry.c),
                escape(&row.entry.u),
                row.ago
            );
        }
        out.push_str("</div>");
    }

    out.push_str(HEIGHT_SCRIPT);
    page("tikibar", &out)
}

/// One-line summary bar; links to the full toolbar.
pub fn minibar(panel: Option<&Panel>) -> String {
    let Some(panel) = panel else {
        return page("tikibar", "");
    };
    let mut out = head(panel);
    let _ = write!(
        out,
        "<div class=\"tiki-section\"><a href=\"/tikibar/?correlation_id={}&amp;render=1\">details</a> \
         <a href=\"/tikibar/settings/\" target=\"_top\">settings</a></div>",
        escape(&panel.correlation_id)
    );
    out.push_str(HEIGHT_SCRIPT);
    page("tikibar", &out)
}

pub fn settings(is_active: bool, set_for_api_domain: bool) -> String {
    let state = if is_active { "on" } else { "off" };
    let mut body = format!(
        "<div class=\"tiki-section\"><h3>tikibar settings</h3><p>Tikibar is currently <b>{state}</b> for you.</p>\
         <form method=\"post\" action=\"/tikibar/on/\"><button>Turn on</button></form>\
         <form method=\"post\" action=\"/tikibar/off/\"><button>Turn off</button></form></div>"
    );
    if set_for_api_domain {
        body.push_str("<img src=\"/tikibar/set-for-api-domain/\" width=\"1\" height=\"1\" alt=\"\">");
    }
    page("tikibar settings", &body)
}

pub fn turn_on() -> String {
    page(
        "tikibar on",
        "<div class=\"tiki-section\"><form method=\"post\" action=\"/tikibar/on/\">\
         <button>Turn on tikibar</button></form></div>",
    )
}

pub fn turn_off() -> String {
    page(
        "tikibar off",
        "<div class=\"tiki-section\"><form method=\"post\" action=\"/tikibar/off/\">\
         <button>Turn off tikibar</button></form></div>",
    )
}

/// Answer to a successful "off" POST: hides the toolbar frame in the parent.
pub const TURNED_OFF: &str = "\n            Tikibar is now off <a href=\"/\">Go home</a><script>window.parent.postMessage(JSON.stringify({'tiki_msg_type': 'hide'}), '*');</script>\n        ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_panel_pages() {
        assert!(tikibar(None).contains("No data"));
        assert!(!minibar(None).contains("tiki-head"));
    }

    #[test]
    fn settings_page_reports_state() {
        assert!(settings(true, false).contains("<b>on</b>"));
        assert!(!settings(true, false).contains("set-for-api-domain"));
        assert!(settings(false, true).contains("set-for-api-domain"));
    }
}
