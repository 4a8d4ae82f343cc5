//! Injection of the toolbar client into HTML responses.

use axum::{
    body::Body,
    http::header,
    response::Response,
};

use tikibar_core::html::escape;

/// Client script that opens the toolbar iframe for the page's correlation id.
pub const CLIENT_JS: &str = include_str!("../../static/tikibar.js");

pub fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"))
}

/// Add the correlation id meta tag before `</head>` and the client script
/// before `</body>`.
pub fn inject_html(html: &str, correlation_id: &str, protocol: &str) -> String {
    let meta = format!(
        "<meta name=\"correlation_id\" value=\"{}\"></head>",
        escape(correlation_id)
    );
    let script = format!(
        "<script>window.TIKI_PROTOCOL = \"{protocol}\";</script>\n\
         <script type=\"text/javascript\" charset=\"utf-8\">{CLIENT_JS}</script></body>"
    );
    html.replace("</head>", &meta).replace("</body>", &script)
}

/// Buffer a response body and inject the toolbar. Empty and non-UTF-8 bodies
/// pass through unchanged.
pub async fn inject_toolbar(response: Response, correlation_id: &str, protocol: &str) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer html response for toolbar injection");
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    if bytes.is_empty() {
        return Response::from_parts(parts, Body::from(bytes));
    }
    let Ok(html) = std::str::from_utf8(&bytes) else {
        return Response::from_parts(parts, Body::from(bytes));
    };

    let injected = inject_html(html, correlation_id, protocol);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(injected))
}
