//! HTML text helpers shared by the panel and the views.

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Escape each `/`-separated segment and join them with a styled separator,
/// so long paths can wrap at slashes.
pub fn slasherize(path: &str) -> String {
    path.split('/')
        .map(escape)
        .collect::<Vec<_>>()
        .join("<span class=\"tiki-slash\">/</span>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    }

    #[test]
    fn slasherize_segments() {
        assert_eq!(
            slasherize("app/<v>.rs"),
            "app<span class=\"tiki-slash\">/</span>&lt;v&gt;.rs"
        );
    }
}
