//! Error types for the xasset SDK

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, XassetError>;

/// Every failure the SDK can report.
///
/// Variants are grouped the same way callers usually react to them:
/// input errors are programming mistakes, format and trust errors come from
/// parsing or checking an `Authorization` token, key errors come from the
/// ECDSA layer and the remaining variants belong to the HTTP transport.
#[derive(Debug, Error)]
pub enum XassetError {
    /// Missing or empty caller-supplied parameter
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Client configuration is unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// Authorization token does not have exactly six `/`-separated fields
    #[error("malformed authorization token")]
    MalformedToken,

    /// Authorization token carries an unknown protocol version tag
    #[error("unsupported authorization version")]
    UnsupportedVersion,

    /// Expiration field is not an integer in `[0, 3600]`
    #[error("authorization expiration out of range")]
    ExpirationOutOfRange,

    /// Date field is not an ISO-8601 UTC timestamp
    #[error("authorization date field is not a valid ISO-8601 date")]
    BadDateField,

    /// Token is older than its expiration window
    #[error("authorization token expired")]
    Expired,

    /// Signed header list does not cover `host`
    #[error("signed headers do not include host")]
    MissingHostInSignedHeaders,

    /// Recomputed signature differs from the one in the token
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Malformed private or public key material
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Malformed ECDSA signature encoding
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service answered with a non-200 status code
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Service answered 200 but reported a non-zero errno
    #[error("server error {errno}: {errmsg} (request_id: {request_id})")]
    Server {
        errno: i64,
        errmsg: String,
        request_id: String,
    },
}

impl XassetError {
    /// Create an invalid parameter error
    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::InvalidParam(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid key error
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Create an invalid signature error
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::InvalidSignature(message.into())
    }

    /// Stable tag for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidParam(_) => "invalid_param",
            Self::Config(_) => "config",
            Self::MalformedToken => "malformed_token",
            Self::UnsupportedVersion => "unsupported_version",
            Self::ExpirationOutOfRange => "expiration_out_of_range",
            Self::BadDateField => "bad_date_field",
            Self::Expired => "expired",
            Self::MissingHostInSignedHeaders => "missing_host_in_signed_headers",
            Self::SignatureMismatch => "signature_mismatch",
            Self::InvalidKey(_) => "invalid_key",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::Http(_) => "http",
            Self::Json(_) => "json",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::Server { .. } => "server",
        }
    }

    /// Whether the error came from parsing an authorization token.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken
                | Self::UnsupportedVersion
                | Self::ExpirationOutOfRange
                | Self::BadDateField
        )
    }

    /// Whether the error is a cryptographic or temporal rejection.
    pub fn is_trust_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::MissingHostInSignedHeaders | Self::SignatureMismatch
        )
    }
}
