//! SQL pretty-printing for the panel.
//!
//! The formatter is a small lexer, not a parser: it strips comments, escapes
//! text for HTML, bolds keywords, collapses long select lists to `***` and
//! spaces out comma-separated lists.

use crate::html::escape;

const KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CREATE", "CROSS", "DELETE",
    "DESC", "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FOR", "FROM", "FULL", "GROUP",
    "HAVING", "ILIKE", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS", "JOIN", "LEFT", "LIKE",
    "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "RETURNING", "RIGHT", "SELECT",
    "SET", "TABLE", "THEN", "TRUE", "UNION", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

/// Minimum select-list length (in characters) that gets collapsed.
const MIN_COLLAPSED_COLUMNS: usize = 10;

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Format SQL into panel HTML.
pub fn reformat_sql(sql: &str) -> String {
    let highlighted = highlight(sql);
    collapse_select_lists(&highlighted).replace(',', ", ")
}

fn highlight(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len() + 32);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c == '-' && next == Some('-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            separate(&mut out);
            continue;
        }

        if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i = (i + 2).min(chars.len());
            separate(&mut out);
            continue;
        }

        if c == '\'' || c == '"' || c == '`' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            i = (i + 1).min(chars.len());
            let literal: String = chars[start..i].iter().collect();
            out.push_str(&escape(&literal));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if is_keyword(&word) {
                out.push_str("<strong>");
                out.push_str(&escape(&word));
                out.push_str("</strong>");
            } else {
                out.push_str(&escape(&word));
            }
            continue;
        }

        if c.is_whitespace() {
            // Whitespace runs become one space.
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            separate(&mut out);
            continue;
        }

        out.push_str(&escape(&c.to_string()));
        i += 1;
    }

    out.trim().to_string()
}

fn separate(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

/// Replace the column list of each `SELECT ... FROM` with `***`.
fn collapse_select_lists(html: &str) -> String {
    const OPEN: &str = "select</strong> ";
    const CLOSE: &str = " <strong>from";

    // ASCII lowercasing keeps byte offsets identical.
    let lower = html.to_ascii_lowercase();
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;

    while let Some(rel) = lower[pos..].find(OPEN) {
        let select_at = pos + rel;
        let cols_at = select_at + OPEN.len();

        let min_end = lower[cols_at..]
            .char_indices()
            .nth(MIN_COLLAPSED_COLUMNS - 1)
            .map(|(i, c)| cols_at + i + c.len_utf8());
        let from_at = min_end.and_then(|m| lower[m..].find(CLOSE).map(|r| m + r));

        match from_at {
            Some(from_at) => {
                out.push_str(&html[pos..cols_at]);
                out.push_str("***");
                pos = from_at;
            }
            None => {
                out.push_str(&html[pos..cols_at]);
                pos = cols_at;
            }
        }
    }

    out.push_str(&html[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bolds_keywords_and_strips_comments() {
        let out = reformat_sql("/* svc=web */ select id from users -- trailing\nwhere id = 1");
        assert_eq!(
            out,
            "<strong>select</strong> id <strong>from</strong> users <strong>where</strong> id = 1"
        );
    }

    #[test]
    fn collapses_long_select_lists() {
        let out = reformat_sql("SELECT users.id,users.name,users.email FROM users");
        assert_eq!(out, "<strong>SELECT</strong> *** <strong>FROM</strong> users");
    }

    #[test]
    fn short_select_list_is_kept() {
        let out = reformat_sql("SELECT a,b FROM t");
        assert_eq!(out, "<strong>SELECT</strong> a, b <strong>FROM</strong> t");
    }

    #[test]
    fn literals_are_escaped_not_bolded() {
        let out = reformat_sql("update t set name = '<b>from</b>'");
        assert!(out.contains("&#x27;&lt;b&gt;from&lt;/b&gt;&#x27;"));
        assert!(out.starts_with("<strong>update</strong> t <strong>set</strong>"));
    }
}
