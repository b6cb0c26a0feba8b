//! Request authentication for the xasset service
//!
//! Every HTTP call to the service carries an `Authorization` header of the form
//!
//! ```text
//! bce-auth-v1/{accessKeyId}/{isoDate}/{expireSeconds}/{signedHeaders}/{signatureHex}
//! ```
//!
//! # Architecture
//!
//! - [`canonical`] - deterministic serialization of method, path, query and headers
//! - [`signer`] - signing key derivation and token assembly
//! - [`verifier`] - token parsing, expiry check and signature recomputation
//! - [`clock`] - injectable wall clock
//!
//! # Examples
//!
//! ```
//! use xasset_sdk::auth::{Credentials, SignOptions, Signer, Verifier};
//!
//! # fn example() -> xasset_sdk::Result<()> {
//! let credentials = Credentials::new(1, "AK", "SK");
//! let signer = Signer::new(credentials.clone(), SignOptions::default());
//!
//! let mut request = http::Request::post("http://host/path?b=2&a=1")
//!     .header("host", "host")
//!     .body(())
//!     .unwrap();
//! signer.authorize(&mut request)?;
//!
//! Verifier::new(credentials).verify(&request)?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeSet;

pub mod canonical;
pub mod clock;
pub mod signer;
pub mod verifier;


pub use canonical::CanonicalRequest;
pub use clock::{Clock, FixedClock, SystemClock};
pub use signer::Signer;
pub use verifier::{AuthorizationToken, Verifier};

/// Protocol revision tag, the first field of every token
pub const AUTH_VERSION: &str = "bce-auth-v1";

/// Expiration applied when the caller asks for less than one second
pub const DEFAULT_EXPIRE_SECONDS: i64 = 1800;

/// Largest expiration a verifier accepts
pub const MAX_EXPIRE_SECONDS: i64 = 3600;

/// Joins the parts of a canonical request
pub const SIGN_JOINER: &str = "\n";

/// Joins signed header names inside a token
pub const SIGN_HEADER_JOINER: &str = ";";

/// Name of the header carrying the token
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Header that is always signed
pub const HOST_HEADER: &str = "host";

const ISO8601_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Headers signed by the client when nothing else is configured
pub fn default_headers_to_sign() -> BTreeSet<String> {
    ["host", "content-length", "content-type", "content-md5"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Account credentials issued by the service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Application id, also embedded in generated asset ids
    pub app_id: i64,
    /// Access key id, sent in clear inside every token
    pub access_key_id: String,
    /// Secret access key, never leaves the process
    pub secret_access_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Create new credentials
    pub fn new(
        app_id: i64,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            app_id,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Reject credentials that cannot produce a meaningful signature
    pub fn validate(&self) -> crate::Result<()> {
        if self.access_key_id.is_empty() {
            return Err(crate::XassetError::invalid_param("access key id is empty"));
        }
        if self.secret_access_key.is_empty() {
            return Err(crate::XassetError::invalid_param(
                "secret access key is empty",
            ));
        }
        Ok(())
    }
}

/// Per-call signing knobs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOptions {
    /// Lower-cased header names to sign. `None` signs `host` only.
    pub headers_to_sign: Option<BTreeSet<String>>,
    /// Unix seconds used as the sign date, `0` means now
    pub timestamp: i64,
    /// Token lifetime; values below one fall back to [`DEFAULT_EXPIRE_SECONDS`]
    pub expire_seconds: i64,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            headers_to_sign: Some(default_headers_to_sign()),
            timestamp: 0,
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }
}

impl SignOptions {
    /// Set the header names to sign
    pub fn with_headers_to_sign<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers_to_sign = Some(
            headers
                .into_iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        );
        self
    }

    /// Pin the sign date
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the token lifetime
    pub fn with_expire_seconds(mut self, expire_seconds: i64) -> Self {
        self.expire_seconds = expire_seconds;
        self
    }

    /// Header set actually used by the canonical request builder
    pub fn effective_headers_to_sign(&self) -> BTreeSet<String> {
        match &self.headers_to_sign {
            Some(headers) => headers.iter().map(|h| h.to_ascii_lowercase()).collect(),
            None => BTreeSet::from([HOST_HEADER.to_string()]),
        }
    }

    /// Expiration actually written into the token
    pub fn effective_expire_seconds(&self) -> i64 {
        if self.expire_seconds < 1 {
            DEFAULT_EXPIRE_SECONDS
        } else {
            self.expire_seconds
        }
    }
}

/// Format a UTC instant as `YYYY-MM-DDThh:mm:ssZ`
pub fn format_iso8601(time: &DateTime<Utc>) -> String {
    time.format(ISO8601_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DDThh:mm:ssZ` timestamp
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, ISO8601_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn keyed_mac(key: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size")
}

/// Lower-case hex HMAC-SHA256 of `message` under `key`
pub fn hmac_sha256_hex(key: &str, message: &str) -> String {
    let mut mac = keyed_mac(key);
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature against `HMAC(key, message)`.
///
/// Only the exact lower-case form produced by [`hmac_sha256_hex`] matches.
pub(crate) fn hmac_sha256_matches(key: &str, message: &str, signature_hex: &str) -> bool {
    let lower_hex = signature_hex.len() == 64
        && signature_hex
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if !lower_hex {
        return false;
    }
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac = keyed_mac(key);
    mac.update(message.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
