//! Authorization token verification

use super::canonical::CanonicalRequest;
use super::clock::{Clock, SystemClock};
use super::{
    hmac_sha256_hex, hmac_sha256_matches, parse_iso8601, Credentials, AUTHORIZATION_HEADER,
    AUTH_VERSION, HOST_HEADER, MAX_EXPIRE_SECONDS, SIGN_HEADER_JOINER,
};
use crate::{Result, XassetError};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A parsed `Authorization` header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationToken {
    pub access_key_id: String,
    pub sign_date: DateTime<Utc>,
    pub expire_seconds: i64,
    /// Header names as listed in the token; treat as untrusted
    pub signed_headers: Vec<String>,
    pub signature: String,
    scope: String,
}

impl AuthorizationToken {
    /// Parse a token, checking its shape in protocol order: field count,
    /// version tag, expiration range, then date.
    pub fn parse(token: &str) -> Result<Self> {
        let fields: Vec<&str> = token.split('/').collect();
        let [version, access_key_id, date, expire, signed_headers, signature] = fields[..]
        else {
            return Err(XassetError::MalformedToken);
        };

        if version != AUTH_VERSION {
            return Err(XassetError::UnsupportedVersion);
        }

        let expire_seconds = expire
            .parse::<i32>()
            .map(i64::from)
            .map_err(|_| XassetError::ExpirationOutOfRange)?;
        if !(0..=MAX_EXPIRE_SECONDS).contains(&expire_seconds) {
            return Err(XassetError::ExpirationOutOfRange);
        }

        let sign_date = parse_iso8601(date).ok_or(XassetError::BadDateField)?;

        Ok(Self {
            access_key_id: access_key_id.to_string(),
            sign_date,
            expire_seconds,
            signed_headers: signed_headers
                .split(SIGN_HEADER_JOINER)
                .map(String::from)
                .collect(),
            signature: signature.to_string(),
            scope: fields[..4].join("/"),
        })
    }

    /// The first four fields, exactly as received; input of the signing key
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Unix second after which the token is rejected
    pub fn expires_at(&self) -> i64 {
        self.sign_date.timestamp() + self.expire_seconds
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at() < now
    }
}

/// Checks `Authorization` headers of incoming requests.
#[derive(Clone)]
pub struct Verifier {
    credentials: Credentials,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("credentials", &self.credentials)
            .field("clock", &"<clock>")
            .finish()
    }
}

impl Verifier {
    /// Create a verifier reading the system clock
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for the expiry check
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Verify the request's own `Authorization` header
    pub fn verify<B>(&self, request: &http::Request<B>) -> Result<()> {
        let result = self.check(request);
        if let Err(err) = &result {
            match err {
                XassetError::Expired => {
                    tracing::warn!(kind = err.kind(), "rejected expired authorization token")
                }
                XassetError::SignatureMismatch => {
                    tracing::warn!(kind = err.kind(), "rejected tampered or forged request")
                }
                _ => tracing::warn!(kind = err.kind(), "rejected authorization token"),
            }
        }
        result
    }

    fn check<B>(&self, request: &http::Request<B>) -> Result<()> {
        self.credentials.validate()?;

        let header = request
            .headers()
            .get(AUTHORIZATION_HEADER)
            .map(|value| value.to_str().map_err(|_| XassetError::MalformedToken))
            .transpose()?
            .unwrap_or_default();
        let token = AuthorizationToken::parse(header)?;

        if token.is_expired_at(self.clock.unix_seconds()) {
            return Err(XassetError::Expired);
        }

        let headers_to_sign: BTreeSet<String> = token.signed_headers.iter().cloned().collect();
        if !headers_to_sign.contains(HOST_HEADER) {
            return Err(XassetError::MissingHostInSignedHeaders);
        }

        let signing_key = hmac_sha256_hex(&self.credentials.secret_access_key, token.scope());
        let canonical = CanonicalRequest::build(request, &headers_to_sign);
        if !hmac_sha256_matches(&signing_key, &canonical.to_string(), &token.signature) {
            return Err(XassetError::SignatureMismatch);
        }

        tracing::debug!(access_key_id = %token.access_key_id, "authorization token verified");
        Ok(())
    }
}
