//! Session state and the token seam.
//!
//! A [`Session`] is the durable identity of one org connection. It owns the
//! cached [`AccessGrant`] slot and the request sequence counter; there is no
//! process-wide token cache, so independent sessions never interfere.
//!
//! The grant slot is written only through [`Session::store_grant`] and
//! [`Session::clear_grant`], both whole-value operations, so no reader can
//! observe a half-updated grant. Those writers are meant for a
//! [`TokenProvider`] implementation.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::DEFAULT_API_VERSION;

/// A short-lived access credential.
///
/// Never mutated after creation; a refresh produces a new grant with a higher
/// generation.
#[derive(Clone)]
pub struct AccessGrant {
    access_token: String,
    instance_url: String,
    issued_at: DateTime<Utc>,
    generation: u64,
}

impl std::fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGrant")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("issued_at", &self.issued_at)
            .field("generation", &self.generation)
            .finish()
    }
}

impl AccessGrant {
    /// The bearer token value.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Canonical instance URL confirmed by the token endpoint.
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// When this grant was obtained.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Monotonic per-session counter distinguishing successive grants.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Source of access grants for the request engine.
///
/// `ensure_token` returns the cached grant or obtains a new one.
/// `invalidate` discards `stale` only if it is still the current grant, so a
/// call that observed an old token cannot throw away a sibling's fresh one.
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    fn ensure_token(&self) -> BoxFuture<'_, Result<Arc<AccessGrant>>>;

    fn invalidate(&self, stale: &AccessGrant);
}

/// Durable identity for one org connection.
///
/// Secrets are redacted in Debug output.
pub struct Session {
    instance_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    api_version: String,
    grant: RwLock<Option<Arc<AccessGrant>>>,
    generation: AtomicU64,
    sequence: AtomicU64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance_url", &self.instance_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field("authenticated", &self.current_grant().is_some())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Start building a session.
    pub fn builder(
        instance_url: impl Into<String>,
        client_id: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> SessionBuilder {
        SessionBuilder {
            instance_url: instance_url.into(),
            client_id: client_id.into(),
            client_secret: String::new(),
            refresh_token: refresh_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// The configured instance URL (no trailing slash).
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// OAuth client id.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth client secret; empty for connected apps without one.
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Long-lived refresh token.
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// API version, e.g. `"62.0"`.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// REST base path for this session's API version.
    pub fn rest_path(&self, path: &str) -> String {
        format!(
            "/services/data/v{}/{}",
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Next value of the outgoing-call counter.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The cached grant, if any.
    pub fn current_grant(&self) -> Option<Arc<AccessGrant>> {
        self.grant
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the cached grant with a new one.
    pub fn store_grant(
        &self,
        access_token: impl Into<String>,
        instance_url: impl Into<String>,
    ) -> Arc<AccessGrant> {
        let grant = Arc::new(AccessGrant {
            access_token: access_token.into(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            issued_at: Utc::now(),
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        });

        *self
            .grant
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&grant));
        grant
    }

    /// Discard the cached grant if it is still `stale`. Returns true if the
    /// slot was cleared.
    pub fn clear_grant(&self, stale: &AccessGrant) -> bool {
        let mut slot = self
            .grant
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match slot.as_ref() {
            Some(current) if current.generation == stale.generation => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

/// Builder for [`Session`]. Validation happens in [`SessionBuilder::build`],
/// before any network call.
#[derive(Clone)]
pub struct SessionBuilder {
    instance_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    api_version: String,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("instance_url", &self.instance_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl SessionBuilder {
    /// Set the client secret. Empty means "no secret".
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = secret.into();
        self
    }

    /// Set the API version (e.g. "62.0"; a leading `v` is accepted).
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Validate and build the session.
    pub fn build(self) -> Result<Session> {
        let instance_url = self.instance_url.trim().trim_end_matches('/').to_string();
        let parsed = url::Url::parse(&instance_url)?;
        let local = matches!(parsed.host_str(), Some("localhost") | Some("127.0.0.1"));
        if parsed.scheme() != "https" && !(parsed.scheme() == "http" && local) {
            return Err(Error::configuration(format!(
                "instance URL must use https: {}",
                instance_url
            )));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::configuration("client id must not be empty"));
        }
        if self.refresh_token.trim().is_empty() {
            return Err(Error::configuration("refresh token must not be empty"));
        }

        let api_version = self.api_version.trim_start_matches('v').to_string();
        let valid_version = api_version
            .split_once('.')
            .is_some_and(|(major, minor)| {
                !major.is_empty()
                    && !minor.is_empty()
                    && major.chars().all(|c| c.is_ascii_digit())
                    && minor.chars().all(|c| c.is_ascii_digit())
            });
        if !valid_version {
            return Err(Error::configuration(format!(
                "API version must look like 62.0, got {:?}",
                self.api_version
            )));
        }

        Ok(Session {
            instance_url,
            client_id: self.client_id,
            client_secret: self.client_secret,
            refresh_token: self.refresh_token,
            api_version,
            grant: RwLock::new(None),
            generation: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        })
    }
}
