//! Token lifecycle manager.
//!
//! [`TokenManager`] is the [`TokenProvider`] backed by the refresh-token
//! grant. Refresh happens only when the session has no grant: on first use
//! and after the engine invalidates a rejected grant. There is no
//! speculative refresh.

use futures::future::BoxFuture;
use sfq_client::{AccessGrant, Session, SfHttpClient, TokenProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{Error, ErrorKind};
use crate::oauth::OAuthClient;

/// Single-flight token provider for one [`Session`].
///
/// Concurrent callers that find the slot empty wait on one exchange instead
/// of each starting their own.
pub struct TokenManager {
    session: Arc<Session>,
    oauth: OAuthClient,
    refresh_lock: tokio::sync::Mutex<()>,
    exchanges: AtomicU64,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("session", &self.session)
            .field("exchanges", &self.exchange_count())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager for `session`, exchanging tokens over `http`.
    pub fn new(session: Arc<Session>, http: SfHttpClient) -> Self {
        Self {
            session,
            oauth: OAuthClient::new(http),
            refresh_lock: tokio::sync::Mutex::new(()),
            exchanges: AtomicU64::new(0),
        }
    }

    /// The managed session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Number of token exchanges attempted so far.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Return the cached grant, refreshing if the slot is empty.
    pub async fn access_grant(&self) -> sfq_client::Result<Arc<AccessGrant>> {
        if let Some(grant) = self.session.current_grant() {
            return Ok(grant);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        if let Some(grant) = self.session.current_grant() {
            return Ok(grant);
        }

        self.exchange().await.map_err(Into::into)
    }

    /// Force an exchange, replacing whatever grant is cached. The cached
    /// grant is discarded first, so a failed exchange leaves the slot empty.
    pub async fn refresh(&self) -> sfq_client::Result<Arc<AccessGrant>> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(stale) = self.session.current_grant() {
            self.session.clear_grant(&stale);
        }
        self.exchange().await.map_err(Into::into)
    }

    #[instrument(skip(self), fields(instance_url = %self.session.instance_url()))]
    async fn exchange(&self) -> crate::Result<Arc<AccessGrant>> {
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let token = self
            .oauth
            .refresh_token(&self.session)
            .await
            .map_err(|e| {
                warn!(error = %e, "Token exchange failed");
                let invalid_grant = matches!(
                    &e.kind,
                    ErrorKind::OAuth { error, .. } if error == "invalid_grant"
                );
                if invalid_grant {
                    Error::new(ErrorKind::OAuth {
                        error: "invalid_grant".to_string(),
                        description: format!(
                            "Refresh token expired or invalid. Generate a fresh SF_AUTH_URL using: \
                            `sf org display --verbose --json | jq -r '.result.sfdxAuthUrl'`. \
                            Original error: {}",
                            e
                        ),
                    })
                } else {
                    e
                }
            })?;

        let grant = self
            .session
            .store_grant(token.access_token, token.instance_url);
        if grant.instance_url() != self.session.instance_url() {
            info!(
                canonical = grant.instance_url(),
                "Token endpoint returned a different instance URL"
            );
        }
        info!(generation = grant.generation(), "Access token refreshed");
        Ok(grant)
    }
}

impl TokenProvider for TokenManager {
    fn ensure_token(&self) -> BoxFuture<'_, sfq_client::Result<Arc<AccessGrant>>> {
        Box::pin(self.access_grant())
    }

    fn invalidate(&self, stale: &AccessGrant) {
        if self.session.clear_grant(stale) {
            info!(generation = stale.generation(), "Access grant invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(server: &MockServer) -> Arc<TokenManager> {
        let session = Arc::new(
            Session::builder(server.uri(), "client", "refresh")
                .build()
                .unwrap(),
        );
        Arc::new(TokenManager::new(
            session,
            SfHttpClient::default_client().unwrap(),
        ))
    }

    async fn mount_counting_token_endpoint(server: &MockServer) -> Arc<AtomicU32> {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let uri = server.uri();
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(move |_: &wiremock::Request| {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(50))
                    .set_body_json(serde_json::json!({
                        "access_token": format!("token-{n}"),
                        "instance_url": uri.clone(),
                    }))
            })
            .mount(server)
            .await;
        counter
    }

    #[tokio::test]
    async fn test_grant_is_cached() {
        let server = MockServer::start().await;
        let counter = mount_counting_token_endpoint(&server).await;
        let tokens = manager(&server);

        let first = tokens.ensure_token().await.unwrap();
        let second = tokens.ensure_token().await.unwrap();

        assert_eq!(first.access_token(), "token-1");
        assert_eq!(second.generation(), first.generation());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.exchange_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let server = MockServer::start().await;
        let counter = mount_counting_token_endpoint(&server).await;
        let tokens = manager(&server);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tokens = tokens.clone();
                tokio::spawn(async move { tokens.ensure_token().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().access_token(), "token-1");
        }

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_exchange() {
        let server = MockServer::start().await;
        let counter = mount_counting_token_endpoint(&server).await;
        let tokens = manager(&server);

        let first = tokens.ensure_token().await.unwrap();
        tokens.invalidate(&first);
        let second = tokens.ensure_token().await.unwrap();

        assert_eq!(second.access_token(), "token-2");
        assert!(second.generation() > first.generation());
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // A stale invalidate after the refresh is ignored.
        tokens.invalidate(&first);
        assert_eq!(
            tokens.session().current_grant().unwrap().access_token(),
            "token-2"
        );
    }

    #[tokio::test]
    async fn test_failed_exchange_is_authentication_and_leaves_slot_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "expired access/refresh token"
            })))
            .mount(&server)
            .await;
        let tokens = manager(&server);

        let err = tokens.ensure_token().await.unwrap_err();
        assert!(err.is_auth_error(), "unexpected error: {err:?}");
        assert!(err.to_string().contains("invalid_grant"));
        assert!(tokens.session().current_grant().is_none());
    }

    #[tokio::test]
    async fn test_failed_forced_refresh_discards_previous_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-1",
                "instance_url": server.uri()
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "expired access/refresh token"
            })))
            .mount(&server)
            .await;
        let tokens = manager(&server);

        assert_eq!(tokens.ensure_token().await.unwrap().access_token(), "token-1");
        let err = tokens.refresh().await.unwrap_err();

        assert!(err.is_auth_error(), "unexpected error: {err:?}");
        assert!(tokens.session().current_grant().is_none());
        assert_eq!(tokens.exchange_count(), 2);
    }

    #[tokio::test]
    async fn test_canonical_instance_url_is_recorded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "instance_url": "https://canonical.my.salesforce.com/"
            })))
            .mount(&server)
            .await;
        let tokens = manager(&server);

        let grant = tokens.refresh().await.unwrap();
        assert_eq!(grant.instance_url(), "https://canonical.my.salesforce.com");
        assert_eq!(tokens.session().instance_url(), server.uri());
    }
}
