//! Client configuration
//!
//! ```
//! use xasset_sdk::XassetConfig;
//! use std::time::Duration;
//!
//! # fn example() -> xasset_sdk::Result<()> {
//! let config = XassetConfig::new("http://127.0.0.1:8360")
//!     .with_credentials(110380, "AK", "SK")
//!     .with_timeout(Duration::from_secs(5));
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use crate::auth::{Credentials, SignOptions};
use crate::{Result, XassetError};
use std::time::Duration;

/// Public xasset endpoint
pub const DEFAULT_ENDPOINT: &str = "http://120.48.16.137:8360";

/// Sent as `User-Agent` on every request
pub const DEFAULT_USER_AGENT: &str = "xasset-sdk-rust";

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default read/write timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

pub const ENV_ENDPOINT: &str = "XASSET_ENDPOINT";
pub const ENV_APP_ID: &str = "XASSET_APP_ID";
pub const ENV_ACCESS_KEY_ID: &str = "XASSET_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "XASSET_SECRET_ACCESS_KEY";

/// Settings for [`crate::XassetClient`]
#[derive(Clone, PartialEq, Eq)]
pub struct XassetConfig {
    /// Scheme, host and port of the service
    pub endpoint: String,
    /// `User-Agent` header value
    pub user_agent: String,
    /// Account used to sign requests
    pub credentials: Option<Credentials>,
    /// Signing options applied to every request
    pub sign_options: SignOptions,
    /// TCP connect timeout, zero means default
    pub connect_timeout: Duration,
    /// Whole-request timeout, zero means default
    pub timeout: Duration,
}

impl std::fmt::Debug for XassetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials has its own redacting Debug
        f.debug_struct("XassetConfig")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("credentials", &self.credentials)
            .field("sign_options", &self.sign_options)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl XassetConfig {
    /// Config for `endpoint` with every other setting at its default
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: None,
            sign_options: SignOptions::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a config from `XASSET_*` environment variables.
    ///
    /// A missing endpoint falls back to [`DEFAULT_ENDPOINT`]; credentials are
    /// set only when both keys are present. Call [`XassetConfig::validate`]
    /// before use.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup(ENV_ENDPOINT)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let mut config = Self::new(endpoint);

        let app_id = match lookup(ENV_APP_ID) {
            Some(value) => value.trim().parse::<i64>().map_err(|_| {
                XassetError::config(format!("{} is not an integer: {}", ENV_APP_ID, value))
            })?,
            None => 0,
        };
        if let (Some(ak), Some(sk)) = (lookup(ENV_ACCESS_KEY_ID), lookup(ENV_SECRET_ACCESS_KEY)) {
            config = config.with_credentials(app_id, ak, sk);
        }
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(XassetError::config("Endpoint cannot be empty"));
        }

        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(XassetError::config(
                "Endpoint must start with http:// or https://",
            ));
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or_else(|| XassetError::config("Credentials are not set"))?;
        if credentials.access_key_id.is_empty() {
            return Err(XassetError::config("Access key id cannot be empty"));
        }
        if credentials.secret_access_key.is_empty() {
            return Err(XassetError::config("Secret access key cannot be empty"));
        }

        Ok(())
    }

    /// Set the endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the signing account
    pub fn with_credentials(
        mut self,
        app_id: i64,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(app_id, access_key_id, secret_access_key));
        self
    }

    /// Set the signing options
    pub fn with_sign_options(mut self, sign_options: SignOptions) -> Self {
        self.sign_options = sign_options;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect timeout with zero replaced by the default
    pub fn effective_connect_timeout(&self) -> Duration {
        if self.connect_timeout.is_zero() {
            DEFAULT_CONNECT_TIMEOUT
        } else {
            self.connect_timeout
        }
    }

    /// Request timeout with zero replaced by the default
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

impl Default for XassetConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = XassetConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.connect_timeout, Duration::from_millis(1000));
        assert_eq!(config.timeout, Duration::from_millis(3000));
        assert_eq!(config.sign_options, SignOptions::default());
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_validate() {
        let config = XassetConfig::default().with_credentials(1, "AK", "SK");
        assert!(config.validate().is_ok());

        let missing = XassetConfig::default();
        assert!(matches!(missing.validate(), Err(XassetError::Config(_))));

        for endpoint in ["", "ftp://example.com", "example.com"] {
            let config = XassetConfig::new(endpoint).with_credentials(1, "AK", "SK");
            assert!(matches!(config.validate(), Err(XassetError::Config(_))));
        }

        let no_ak = XassetConfig::default().with_credentials(1, "", "SK");
        assert!(matches!(no_ak.validate(), Err(XassetError::Config(_))));
        let no_sk = XassetConfig::default().with_credentials(1, "AK", "");
        assert!(matches!(no_sk.validate(), Err(XassetError::Config(_))));
    }

    #[test]
    fn test_zero_timeouts_fall_back() {
        let config = XassetConfig::default()
            .with_connect_timeout(Duration::ZERO)
            .with_timeout(Duration::ZERO);
        assert_eq!(config.effective_connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);

        let config = config.with_timeout(Duration::from_secs(9));
        assert_eq!(config.effective_timeout(), Duration::from_secs(9));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = XassetConfig::default().with_credentials(1, "AK", "super-secret");
        let debug = format!("{:?}", config);
        assert!(debug.contains("AK"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_from_lookup() {
        let config = XassetConfig::from_lookup(env(&[
            (ENV_ENDPOINT, "https://xasset.example.com"),
            (ENV_APP_ID, "110380"),
            (ENV_ACCESS_KEY_ID, "AK"),
            (ENV_SECRET_ACCESS_KEY, "SK"),
        ]))
        .unwrap();
        assert_eq!(config.endpoint, "https://xasset.example.com");
        assert_eq!(config.credentials, Some(Credentials::new(110380, "AK", "SK")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_partial() {
        let config = XassetConfig::from_lookup(env(&[(ENV_ACCESS_KEY_ID, "AK")])).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert!(config.credentials.is_none());

        let err = XassetConfig::from_lookup(env(&[(ENV_APP_ID, "abc")])).unwrap_err();
        assert!(matches!(err, XassetError::Config(_)));
    }
}
