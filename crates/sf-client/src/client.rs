//! Single-attempt HTTP transport.
//!
//! [`SfHttpClient`] sends exactly one request and buffers the response. It
//! knows nothing about retries or token refresh; that policy lives in
//! [`crate::SalesforceClient`].

use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBody, RequestBuilder};
use crate::response::Response;
use crate::session::AccessGrant;

/// HTTP client for Salesforce APIs.
///
/// Cheap to clone; clones share the connection pool and cookie store.
#[derive(Debug, Clone)]
pub struct SfHttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl SfHttpClient {
    /// Create a new HTTP client.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed)
            .cookie_store(config.cookie_store);

        let inner = builder.build().map_err(|e| {
            Error::with_source(ErrorKind::Configuration(e.to_string()), e)
        })?;

        Ok(Self { inner, config })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one request without any credential.
    ///
    /// Used for the OAuth token endpoint, which authenticates with the
    /// request body rather than a bearer token.
    pub async fn execute_anonymous(
        &self,
        request: &RequestBuilder,
        base_url: &str,
    ) -> Result<Response> {
        let url = request.resolve_url(base_url);
        self.send(request, &url, None, 0).await
    }

    /// Send one request authorized by `grant`.
    ///
    /// Relative targets resolve against the grant's instance URL.
    pub async fn execute_once(
        &self,
        request: &RequestBuilder,
        grant: &AccessGrant,
        call_id: u64,
    ) -> Result<Response> {
        let url = request.resolve_url(grant.instance_url());
        self.send(request, &url, Some(grant.access_token()), call_id)
            .await
    }

    async fn send(
        &self,
        request: &RequestBuilder,
        url: &str,
        bearer: Option<&str>,
        call_id: u64,
    ) -> Result<Response> {
        let mut url = url::Url::parse(url)?;
        if !request.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &request.query_params {
                pairs.append_pair(name, value);
            }
        }

        let mut req = self
            .inner
            .request(request.method.to_reqwest(), url.clone())
            .header("Accept", "application/json")
            .header(
                "Sforce-Call-Options",
                format!("client={}", self.config.user_agent),
            );

        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        if let Some(ref body) = request.body {
            req = match body {
                RequestBody::Json(value) => req
                    .header("Content-Type", "application/json")
                    .body(serde_json::to_vec(value)?),
                RequestBody::Form(data) => {
                    let encoded = serde_urlencoded::to_string(data).map_err(|e| {
                        Error::with_source(ErrorKind::Other(e.to_string()), e)
                    })?;
                    req.header("Content-Type", "application/x-www-form-urlencoded")
                        .body(encoded)
                }
            };
        }

        if self.config.enable_tracing {
            debug!(
                call_id,
                method = request.method.as_str(),
                path = url.path(),
                "Sending request"
            );
        }

        let response = Response::read(req.send().await?).await?;

        if self.config.enable_tracing {
            let status = response.status();
            let length = response.bytes().len();
            if response.is_success() {
                debug!(call_id, status, length, "Response received");
            } else {
                info!(call_id, status, length, "Non-success response");
            }
        }

        Ok(response)
    }
}
