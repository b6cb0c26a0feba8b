//! Request signing

use super::canonical::CanonicalRequest;
use super::clock::{Clock, SystemClock};
use super::{
    format_iso8601, hmac_sha256_hex, Credentials, SignOptions, AUTHORIZATION_HEADER,
    AUTH_VERSION,
};
use crate::{Result, XassetError};
use chrono::DateTime;
use http::HeaderValue;
use std::sync::Arc;

/// Produces `Authorization` tokens for outbound requests.
///
/// Signing is deterministic: identical credentials, options, request and sign
/// date always yield the same token.
#[derive(Clone)]
pub struct Signer {
    credentials: Credentials,
    options: SignOptions,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("credentials", &self.credentials)
            .field("options", &self.options)
            .field("clock", &"<clock>")
            .finish()
    }
}

impl Signer {
    /// Create a signer reading the system clock
    pub fn new(credentials: Credentials, options: SignOptions) -> Self {
        Self {
            credentials,
            options,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used when the options carry no timestamp
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Options this signer was built with
    pub fn options(&self) -> &SignOptions {
        &self.options
    }

    /// Sign `request` with the configured options
    pub fn sign<B>(&self, request: &http::Request<B>) -> Result<String> {
        self.sign_with(request, &self.options)
    }

    /// Sign `request` with a one-off set of options
    pub fn sign_with<B>(&self, request: &http::Request<B>, options: &SignOptions) -> Result<String> {
        self.credentials.validate()?;
        if !request.headers().contains_key(http::header::HOST) {
            return Err(XassetError::invalid_param("request has no host header"));
        }

        let timestamp = if options.timestamp != 0 {
            options.timestamp
        } else {
            self.clock.unix_seconds()
        };
        let sign_date = DateTime::from_timestamp(timestamp, 0)
            .map(|time| format_iso8601(&time))
            .ok_or_else(|| {
                XassetError::invalid_param(format!("timestamp {timestamp} out of range"))
            })?;
        let expire_seconds = options.effective_expire_seconds();

        let scope = format!(
            "{}/{}/{}/{}",
            AUTH_VERSION, self.credentials.access_key_id, sign_date, expire_seconds
        );
        let signing_key = hmac_sha256_hex(&self.credentials.secret_access_key, &scope);

        let canonical = CanonicalRequest::build(request, &options.effective_headers_to_sign());
        let signature = hmac_sha256_hex(&signing_key, &canonical.to_string());
        let signed_headers = canonical.signed_headers_str();

        tracing::debug!(
            access_key_id = %self.credentials.access_key_id,
            sign_date = %sign_date,
            expire_seconds,
            signed_headers = %signed_headers,
            "signed request"
        );

        Ok(format!("{}/{}/{}", scope, signed_headers, signature))
    }

    /// Sign `request` and store the token in its `Authorization` header
    pub fn authorize<B>(&self, request: &mut http::Request<B>) -> Result<()> {
        let token = self.sign(request)?;
        let value = HeaderValue::from_str(&token).map_err(|e| {
            XassetError::invalid_param(format!("token is not a valid header value: {}", e))
        })?;
        request.headers_mut().insert(AUTHORIZATION_HEADER, value);
        Ok(())
    }
}
