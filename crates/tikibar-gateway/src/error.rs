//! HTTP mapping of [`TikibarError`] for the toolbar views.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tikibar_core::TikibarError;

use crate::middleware::SUPPRESS_HEADER;

/// Error returned by toolbar handlers.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct HttpError(#[from] pub TikibarError);

impl From<serde_json::Error> for HttpError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.into())
    }
}

impl HttpError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(TikibarError::NotFound(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TikibarError::BadRequest(_) | TikibarError::UnsupportedVersion => StatusCode::BAD_REQUEST,
            TikibarError::NotFound(_) => StatusCode::NOT_FOUND,
            TikibarError::Forbidden(_)
            | TikibarError::InvalidSignature
            | TikibarError::SignatureExpired => StatusCode::FORBIDDEN,
            TikibarError::Cache(_) | TikibarError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "toolbar view failed");
        }
        let body = Json(json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        }));
        let mut res = (status, body).into_response();
        res.headers_mut()
            .insert(SUPPRESS_HEADER, HeaderValue::from_static("1"));
        res
    }
}

pub type HttpResult<T> = std::result::Result<T, HttpError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(HttpError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(HttpError(TikibarError::SignatureExpired).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            HttpError(TikibarError::Cache("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_responses_are_suppressed() {
        let res = HttpError::not_found("Tikibar is turned off").into_response();
        assert_eq!(res.headers().get(SUPPRESS_HEADER).unwrap(), "1");
    }
}
