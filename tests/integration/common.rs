//! Shared fixtures: a wiremock-backed org and live-org credentials.

use serde_json::json;
use sfq::{ClientConfig, RetryConfig, SalesforceClient, SalesforceCredentials};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// A mock org whose token endpoint issues `token-1`, `token-2`, ... and
/// counts exchanges.
pub struct MockOrg {
    pub server: MockServer,
    pub exchanges: Arc<AtomicU32>,
}

impl MockOrg {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let exchanges = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&exchanges);
        let instance_url = server.uri();

        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .respond_with(move |_: &Request| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                ResponseTemplate::new(200).set_body_json(json!({
                    "access_token": format!("token-{n}"),
                    "instance_url": instance_url,
                    "token_type": "Bearer",
                    "issued_at": "1700000000000"
                }))
            })
            .mount(&server)
            .await;

        Self { server, exchanges }
    }

    pub fn exchanges(&self) -> u32 {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn credentials(&self) -> SalesforceCredentials {
        SalesforceCredentials::new(self.server.uri(), "test-client", "test-refresh")
            .with_client_secret("test-secret")
    }

    /// A client with fast retries so transient paths finish quickly.
    pub fn client(&self) -> SalesforceClient {
        self.credentials()
            .connect(fast_retry_config())
            .expect("mock credentials are valid")
    }
}

pub fn fast_retry_config() -> ClientConfig {
    ClientConfig::builder()
        .with_retry(
            RetryConfig::default()
                .with_max_attempts(2)
                .with_initial_delay(Duration::from_millis(1))
                .with_max_delay(Duration::from_millis(10)),
        )
        .build()
}

/// Credentials for the live-org suite.
///
/// Live tests are `#[ignore]`d; when run explicitly they must fail loudly
/// rather than skip.
pub fn live_credentials() -> SalesforceCredentials {
    let auth_url = match std::env::var("SF_AUTH_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => panic!(
            "\n\n\
            SF_AUTH_URL is not set.\n\
            \n\
            Live integration tests require a Salesforce org authentication URL:\n\
              1. Authenticate to an org: sf org login web -d\n\
              2. Get the auth URL:       sf org display --verbose\n\
              3. Export it:              export SF_AUTH_URL='force://...'\n\n"
        ),
    };

    SalesforceCredentials::from_sfdx_auth_url(&auth_url)
        .unwrap_or_else(|e| panic!("SF_AUTH_URL could not be parsed: {e}"))
}
