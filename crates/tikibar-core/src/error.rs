//! Shared error type across Tikibar crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Toolbar is disabled or the resource does not exist.
    NotFound,
    /// Caller is not allowed to see the toolbar.
    Forbidden,
    /// A signed value failed verification.
    InvalidSignature,
    /// A signed value verified but is older than allowed.
    SignatureExpired,
    /// The cache backend failed.
    Cache,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::InvalidSignature => "INVALID_SIGNATURE",
            ClientCode::SignatureExpired => "SIGNATURE_EXPIRED",
            ClientCode::Cache => "CACHE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TikibarError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum TikibarError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature expired")]
    SignatureExpired,
    #[error("cache: {0}")]
    Cache(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl TikibarError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TikibarError::BadRequest(_) => ClientCode::BadRequest,
            TikibarError::NotFound(_) => ClientCode::NotFound,
            TikibarError::Forbidden(_) => ClientCode::Forbidden,
            TikibarError::InvalidSignature => ClientCode::InvalidSignature,
            TikibarError::SignatureExpired => ClientCode::SignatureExpired,
            TikibarError::Cache(_) => ClientCode::Cache,
            TikibarError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            TikibarError::Internal(_) => ClientCode::Internal,
        }
    }
}

impl From<serde_json::Error> for TikibarError {
    fn from(e: serde_json::Error) -> Self {
        TikibarError::Internal(format!("json: {e}"))
    }
}
