//! Signed HTTP client for the xasset service
//!
//! Every call is a form-encoded `POST`. The client stamps the request with
//! `Timestamp` and `Content-Md5` headers, signs it with the configured
//! [`Signer`](crate::auth::Signer) and unwraps the JSON envelope the service
//! answers with:
//!
//! ```text
//! {"request_id": "...", "errno": 0, "errmsg": "succ", ...payload}
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use serde::Deserialize;
//! use xasset_sdk::client::{encode_form, XassetClient};
//! use xasset_sdk::XassetConfig;
//!
//! #[derive(Deserialize)]
//! struct Stoken {
//!     access_info: serde_json::Value,
//! }
//!
//! # async fn example() -> xasset_sdk::Result<()> {
//! let config = XassetConfig::default().with_credentials(110380, "AK", "SK");
//! let client = XassetClient::new(config)?;
//!
//! let body = encode_form([("addr", "TeyyPLpp9L7QAcxHangtcHTu7HUZ6iydY")]);
//! let stoken: Stoken = client.post_form("/xasset/file/v1/getstoken", &body).await?;
//! println!("{}", stoken.access_info);
//! # Ok(())
//! # }
//! ```

use crate::auth::clock::{Clock, SystemClock};
use crate::auth::{Credentials, Signer};
use crate::config::XassetConfig;
use crate::{Result, XassetError};
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::{HeaderMap, Method};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;


/// Content type of every request body
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=utf-8";

/// Unix seconds at which the request was built
pub const TIMESTAMP_HEADER: &str = "timestamp";

/// Hex MD5 of the request body
pub const CONTENT_MD5_HEADER: &str = "content-md5";

/// Response header carrying the server-side trace id
pub const TRACE_ID_HEADER: &str = "xasset-trace-id";

const DEFAULT_TRACE_ID: &str = "0";

/// Fields present in every service response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResponse {
    #[serde(default)]
    pub request_id: String,
    /// `0` on success
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// Raw outcome of a signed request
#[derive(Debug, Clone)]
pub struct RequestResult {
    pub http_code: u16,
    pub req_url: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl RequestResult {
    /// Server trace id, `"0"` when the header is absent
    pub fn trace_id(&self) -> &str {
        self.headers
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_TRACE_ID)
    }
}

/// Encode key/value pairs as an `application/x-www-form-urlencoded` body
pub fn encode_form<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Client for the xasset HTTP API
#[derive(Clone)]
pub struct XassetClient {
    endpoint: String,
    user_agent: String,
    credentials: Credentials,
    signer: Signer,
    clock: Arc<dyn Clock>,
    client: Client,
}

impl std::fmt::Debug for XassetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XassetClient")
            .field("endpoint", &self.endpoint)
            .field("user_agent", &self.user_agent)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl XassetClient {
    /// Create a new client
    pub fn new(config: XassetConfig) -> Result<Self> {
        config.validate()?;
        let credentials = config
            .credentials
            .clone()
            .ok_or_else(|| XassetError::config("Credentials are not set"))?;

        let client = Client::builder()
            .connect_timeout(config.effective_connect_timeout())
            .timeout(config.effective_timeout())
            .build()
            .map_err(|e| XassetError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            user_agent: config.user_agent,
            signer: Signer::new(credentials.clone(), config.sign_options),
            credentials,
            clock: Arc::new(SystemClock),
            client,
        })
    }

    /// Replace the clock used for `Timestamp` headers and sign dates
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.signer = self.signer.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    /// Base URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Account the client signs for
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Build the signed request for `uri` without sending it
    pub fn build_request(&self, uri: &str, body: &str) -> Result<http::Request<String>> {
        let url = Url::parse(&format!("{}{}", self.endpoint, uri))
            .map_err(|e| XassetError::invalid_param(format!("bad request url: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| XassetError::invalid_param("request url has no host"))?;

        let mut request = http::Request::builder()
            .method(Method::POST)
            .uri(url.as_str())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(HOST, host)
            .header(TIMESTAMP_HEADER, self.clock.unix_seconds().to_string())
            .header(CONTENT_MD5_HEADER, format!("{:x}", md5::compute(body)))
            .header(USER_AGENT, self.user_agent.as_str())
            .body(body.to_string())
            .map_err(|e| XassetError::invalid_param(format!("bad request: {}", e)))?;

        self.signer.authorize(&mut request)?;
        Ok(request)
    }

    /// Send a signed form `POST` and return the raw response
    pub async fn post(&self, uri: &str, body: &str) -> Result<RequestResult> {
        let request = self.build_request(uri, body)?;
        let req_url = request.uri().to_string();
        tracing::debug!("Sending request to: {}", req_url);

        let response = self
            .client
            .execute(reqwest::Request::try_from(request)?)
            .await?;

        let result = RequestResult {
            http_code: response.status().as_u16(),
            req_url,
            headers: response.headers().clone(),
            body: response.text().await?,
        };
        tracing::debug!(
            http_code = result.http_code,
            trace_id = result.trace_id(),
            "Received response from {}",
            result.req_url
        );
        Ok(result)
    }

    /// Send a signed form `POST` and decode a successful response into `T`.
    ///
    /// Fails unless the service answers HTTP 200 with `errno == 0`. The
    /// envelope fields stay in the body, so `T` may flatten [`BaseResponse`]
    /// to keep them.
    pub async fn post_form<T: DeserializeOwned>(&self, uri: &str, body: &str) -> Result<T> {
        let result = self.post(uri, body).await?;

        if result.http_code != 200 {
            tracing::warn!(
                "Request to {} failed with status: {}. trace_id: {}. Response body: {}",
                result.req_url,
                result.http_code,
                result.trace_id(),
                result.body
            );
            return Err(XassetError::UnexpectedStatus {
                status: result.http_code,
                body: result.body,
            });
        }

        let base: BaseResponse = serde_json::from_str(&result.body).map_err(|e| {
            tracing::warn!(
                "Undecodable response from {}. trace_id: {}. Error: {}",
                result.req_url,
                result.trace_id(),
                e
            );
            e
        })?;
        if base.errno != 0 {
            tracing::warn!(
                "Request to {} rejected. trace_id: {}. request_id: {}. errno: {}. errmsg: {}",
                result.req_url,
                result.trace_id(),
                base.request_id,
                base.errno,
                base.errmsg
            );
            return Err(XassetError::Server {
                errno: base.errno,
                errmsg: base.errmsg,
                request_id: base.request_id,
            });
        }

        Ok(serde_json::from_str(&result.body)?)
    }
}
