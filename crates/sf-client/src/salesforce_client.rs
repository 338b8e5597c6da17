//! Resilient request engine.
//!
//! `SalesforceClient` is the one place every outgoing call passes through.
//! Per logical call it:
//!
//! 1. takes a sequence number from the session (the `call_id` tracing field),
//! 2. obtains a grant from the [`TokenProvider`],
//! 3. sends one attempt through [`SfHttpClient`],
//! 4. classifies the response with [`crate::classify::classify`].
//!
//! A rejected session is retried exactly once with a fresh grant. Transient
//! conditions (5xx, 429, timeouts, connection failures) are retried with
//! bounded backoff. Retry state is local to the call.
//!
//! ## Security
//!
//! - Access tokens never appear in Debug output or tracing fields
//! - Error messages taken from response bodies are sanitized

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::classify::{classify, sanitize_error_message, Disposition};
use crate::client::SfHttpClient;
use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::RequestBuilder;
use crate::response::Response;
use crate::retry::RetryPolicy;
use crate::session::{Session, TokenProvider};

/// High-level Salesforce API client.
///
/// Cheap to clone; clones share the session, the token provider and the
/// connection pool.
///
/// # Example
///
/// ```rust,ignore
/// let session = Arc::new(Session::builder(url, client_id, refresh).build()?);
/// let tokens = Arc::new(TokenManager::new(session.clone(), http.clone()));
/// let client = SalesforceClient::new(session, tokens, ClientConfig::default())?;
///
/// let limits: serde_json::Value = client.get_json(&client.rest_path("limits")).await?;
/// ```
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    session: Arc<Session>,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("session", &self.session)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    /// Create a client with its own HTTP transport.
    pub fn new(
        session: Arc<Session>,
        tokens: Arc<dyn TokenProvider>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self::with_http(session, tokens, SfHttpClient::new(config)?))
    }

    /// Create a client over an existing transport.
    pub fn with_http(
        session: Arc<Session>,
        tokens: Arc<dyn TokenProvider>,
        http: SfHttpClient,
    ) -> Self {
        Self {
            http,
            session,
            tokens,
        }
    }

    /// The session this client acts for.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The underlying transport.
    pub fn http(&self) -> &SfHttpClient {
        &self.http
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        self.session.api_version()
    }

    /// REST API path, e.g. `rest_path("query")` -> `/services/data/v62.0/query`.
    pub fn rest_path(&self, path: &str) -> String {
        self.session.rest_path(path)
    }

    /// Tooling API path, e.g. `tooling_path("query")` ->
    /// `/services/data/v62.0/tooling/query`.
    pub fn tooling_path(&self, path: &str) -> String {
        self.session
            .rest_path(&format!("tooling/{}", path.trim_start_matches('/')))
    }

    /// Execute one logical call and return the successful response.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let call_id = self.session.next_sequence();
        self.send_call(request, call_id).await
    }

    #[instrument(
        name = "sf_call",
        skip(self, request),
        fields(method = request.method().as_str(), target = %request.target())
    )]
    async fn send_call(&self, request: RequestBuilder, call_id: u64) -> Result<Response> {
        let mut retry_policy = self
            .http
            .config()
            .retry
            .as_ref()
            .map(|c| RetryPolicy::new(c.clone()));
        let mut reauthenticated = false;

        loop {
            let grant = self.tokens.ensure_token().await?;

            let response = match self.http.execute_once(&request, &grant, call_id).await {
                Ok(response) => response,
                Err(err) if err.is_retryable() => {
                    if let Some(ref mut policy) = retry_policy {
                        if let Some(delay) = policy.next_delay(None) {
                            warn!(
                                call_id,
                                attempt = policy.attempt(),
                                delay_ms = delay.as_millis() as u64,
                                error = %err,
                                "Request failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    return Err(err);
                }
                Err(err) => return Err(err),
            };

            match classify(
                response.status(),
                response.bytes(),
                response.retry_after(),
                request.request_purpose(),
            ) {
                Disposition::Success => return Ok(response),
                Disposition::SessionExpired => {
                    if reauthenticated {
                        return Err(Error::authentication(format!(
                            "session rejected again after re-authentication (status {})",
                            response.status()
                        )));
                    }
                    warn!(call_id, status = response.status(), "Session rejected, re-authenticating");
                    self.tokens.invalidate(&grant);
                    reauthenticated = true;
                }
                Disposition::Transient { retry_after } => {
                    if let Some(ref mut policy) = retry_policy {
                        if let Some(delay) = policy.next_delay(retry_after) {
                            warn!(
                                call_id,
                                attempt = policy.attempt(),
                                delay_ms = delay.as_millis() as u64,
                                status = response.status(),
                                "Transient response, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                    return Err(Error::new(ErrorKind::Http {
                        status: response.status(),
                        message: sanitize_error_message(&response.text()),
                    }));
                }
                Disposition::Fatal(err) => return Err(err),
            }
        }
    }

    /// Execute a call and deserialize the JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request).await?.json()
    }

    /// GET with JSON response deserialization.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send_json(RequestBuilder::get(path)).await
    }

    /// POST with JSON body and response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.send_json(RequestBuilder::post(path).json(body)?).await
    }
}
