//! Refresh-token credentials and session loading.
//!
//! [`SalesforceCredentials`] is the durable half of a connection: where the
//! org lives and how to obtain access tokens for it. Loading credentials never
//! touches the network; the first exchange happens when a call needs a token.
//!
//! All credential types implement custom Debug to redact sensitive data.

use sfq_client::{ClientConfig, SalesforceClient, Session, SfHttpClient, DEFAULT_API_VERSION};
use std::sync::Arc;

use crate::error::{Error, ErrorKind, Result};
use crate::token_manager::TokenManager;

/// Refresh-token credentials for one org.
///
/// Sensitive fields (client_secret, refresh_token) are redacted in Debug
/// output to prevent accidental exposure in logs.
#[derive(Clone)]
pub struct SalesforceCredentials {
    instance_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    api_version: String,
    username: Option<String>,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("instance_url", &self.instance_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .finish()
    }
}

impl SalesforceCredentials {
    /// Create credentials with the given values.
    pub fn new(
        instance_url: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            client_id: client_id.into(),
            client_secret: String::new(),
            refresh_token: refresh_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            username: None,
        }
    }

    /// Set the client secret. Empty means none.
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = secret.into();
        self
    }

    /// Change the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// The instance URL.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// The OAuth client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// The username embedded in an SFDX auth URL, if any.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Load credentials from environment variables.
    ///
    /// `SF_AUTH_URL` wins when set. Otherwise required:
    /// - `SF_INSTANCE_URL` or `SALESFORCE_INSTANCE_URL`
    /// - `SF_CLIENT_ID` or `SALESFORCE_CLIENT_ID`
    /// - `SF_REFRESH_TOKEN` or `SALESFORCE_REFRESH_TOKEN`
    ///
    /// Optional:
    /// - `SF_CLIENT_SECRET` or `SALESFORCE_CLIENT_SECRET`
    /// - `SF_API_VERSION` or `SALESFORCE_API_VERSION` (default: "62.0")
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(&format!("SF_{name}"))
                .or_else(|| lookup(&format!("SALESFORCE_{name}")))
                .filter(|v| !v.trim().is_empty())
        };
        let required = |name: &str| {
            var(name).ok_or_else(|| Error::new(ErrorKind::EnvVar(format!("SF_{name}"))))
        };

        let mut creds = match var("AUTH_URL") {
            Some(auth_url) => Self::from_sfdx_auth_url(&auth_url)?,
            None => Self::new(
                required("INSTANCE_URL")?,
                required("CLIENT_ID")?,
                required("REFRESH_TOKEN")?,
            )
            .with_client_secret(var("CLIENT_SECRET").unwrap_or_default()),
        };

        if let Some(version) = var("API_VERSION") {
            creds = creds.with_api_version(version);
        }
        Ok(creds)
    }

    /// Parse an SFDX auth URL.
    ///
    /// The SFDX auth URL format is:
    /// - `force://<client_id>:<client_secret>:<refresh_token>@<instance_url>`
    /// - `force://<client_id>::<refresh_token>@<instance_url>` (empty client_secret)
    /// - `force://<client_id>:<client_secret>:<refresh_token>:<username>@<instance_url>` (with username)
    ///
    /// The instance may omit its scheme, in which case `https://` is assumed.
    pub fn from_sfdx_auth_url(auth_url: &str) -> Result<Self> {
        let url = auth_url.trim().strip_prefix("force://").ok_or_else(|| {
            Error::new(ErrorKind::InvalidInput(
                "Auth URL must start with force://".to_string(),
            ))
        })?;

        // Username cannot contain @: the first @ separates credentials from the instance.
        let (credentials_part, instance) = url.split_once('@').ok_or_else(|| {
            Error::new(ErrorKind::InvalidInput(
                "Invalid auth URL format: missing @".to_string(),
            ))
        })?;

        let cred_parts: Vec<&str> = credentials_part.splitn(4, ':').collect();
        if cred_parts.len() < 3 || cred_parts[0].is_empty() || cred_parts[2].is_empty() {
            return Err(Error::new(ErrorKind::InvalidInput(
                "Invalid auth URL format: expected client_id:client_secret:refresh_token[:username]"
                    .to_string(),
            )));
        }

        let instance_url = if instance.contains("://") {
            instance.to_string()
        } else {
            format!("https://{}", instance)
        };
        url::Url::parse(&instance_url).map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidInput("Invalid auth URL instance".to_string()),
                e,
            )
        })?;

        let mut creds = Self::new(instance_url, cred_parts[0], cred_parts[2])
            .with_client_secret(cred_parts[1]);
        creds.username = cred_parts
            .get(3)
            .filter(|u| !u.is_empty())
            .map(|u| u.to_string());
        Ok(creds)
    }

    /// Build a validated [`Session`] from these credentials.
    pub fn session(&self) -> sfq_client::Result<Session> {
        Session::builder(&self.instance_url, &self.client_id, &self.refresh_token)
            .with_client_secret(&self.client_secret)
            .with_api_version(&self.api_version)
            .build()
    }

    /// Build a ready-to-use client: session, token manager and engine sharing
    /// one transport. No network call happens here.
    pub fn connect(&self, config: ClientConfig) -> sfq_client::Result<SalesforceClient> {
        let session = Arc::new(self.session()?);
        let http = SfHttpClient::new(config)?;
        let tokens = Arc::new(TokenManager::new(Arc::clone(&session), http.clone()));
        Ok(SalesforceClient::with_http(session, tokens, http))
    }
}
