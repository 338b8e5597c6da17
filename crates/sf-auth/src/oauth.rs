//! OAuth 2.0 refresh-token grant.
//!
//! The only flow this crate performs: exchange a long-lived refresh token for
//! a short-lived access token at `{instance}/services/oauth2/token`.

use serde::{Deserialize, Serialize};
use sfq_client::{RequestBuilder, Session, SfHttpClient};
use tracing::instrument;

use crate::error::{Error, ErrorKind, Result};

/// Token endpoint path, relative to the session's configured instance URL.
pub const TOKEN_PATH: &str = "/services/oauth2/token";

/// OAuth client for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: SfHttpClient,
}

impl OAuthClient {
    /// Create an OAuth client over a transport.
    pub fn new(http: SfHttpClient) -> Self {
        Self { http }
    }

    /// Exchange the session's refresh token for an access token.
    ///
    /// The session is not logged and the secrets never enter tracing fields.
    #[instrument(skip(self, session), fields(instance_url = %session.instance_url()))]
    pub async fn refresh_token(&self, session: &Session) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("client_id".to_string(), session.client_id().to_string()),
        ];

        if !session.client_secret().is_empty() {
            params.push((
                "client_secret".to_string(),
                session.client_secret().to_string(),
            ));
        }
        params.push((
            "refresh_token".to_string(),
            session.refresh_token().to_string(),
        ));

        let request = RequestBuilder::post(TOKEN_PATH).form(params);
        let response = self
            .http
            .execute_anonymous(&request, session.instance_url())
            .await?;

        if !response.is_success() {
            let error = serde_json::from_slice::<OAuthErrorResponse>(response.bytes())
                .unwrap_or_else(|_| OAuthErrorResponse {
                    error: format!("http_{}", response.status()),
                    error_description: "token endpoint rejected the request".to_string(),
                });
            return Err(Error::new(ErrorKind::OAuth {
                error: error.error,
                description: error.error_description,
            }));
        }

        let token: TokenResponse = serde_json::from_slice(response.bytes()).map_err(|e| {
            Error::with_source(
                ErrorKind::InvalidResponse("token response is not valid JSON".to_string()),
                e,
            )
        })?;
        token.validate()?;
        Ok(token)
    }
}

/// Token response from OAuth.
///
/// Sensitive fields like `access_token` are redacted in Debug output to
/// prevent accidental exposure in logs.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(default)]
    pub access_token: String,
    /// Canonical instance URL.
    #[serde(default)]
    pub instance_url: String,
    /// User ID URL.
    #[serde(default)]
    pub id: Option<String>,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: Option<String>,
    /// Scopes granted.
    #[serde(default)]
    pub scope: Option<String>,
    /// Signature for verification.
    #[serde(default)]
    pub signature: Option<String>,
    /// Issued at timestamp (epoch millis as a string).
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("instance_url", &self.instance_url)
            .field("id", &self.id)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl TokenResponse {
    fn validate(&self) -> Result<()> {
        if self.access_token.is_empty() {
            return Err(Error::new(ErrorKind::InvalidResponse(
                "missing access_token".to_string(),
            )));
        }
        if self.instance_url.is_empty() {
            return Err(Error::new(ErrorKind::InvalidResponse(
                "missing instance_url".to_string(),
            )));
        }
        Ok(())
    }
}

/// OAuth error response.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session(server: &MockServer, secret: &str) -> Session {
        Session::builder(server.uri(), "my_client", "my_refresh")
            .with_client_secret(secret)
            .build()
            .unwrap()
    }

    fn oauth() -> OAuthClient {
        OAuthClient::new(SfHttpClient::default_client().unwrap())
    }

    #[tokio::test]
    async fn test_refresh_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=my_client"))
            .and(body_string_contains("client_secret=shh"))
            .and(body_string_contains("refresh_token=my_refresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "00Dxx!fresh",
                "instance_url": "https://na9.salesforce.com",
                "token_type": "Bearer",
                "issued_at": "1700000000000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = oauth().refresh_token(&session(&server, "shh")).await.unwrap();
        assert_eq!(token.access_token, "00Dxx!fresh");
        assert_eq!(token.instance_url, "https://na9.salesforce.com");
    }

    #[tokio::test]
    async fn test_empty_secret_is_omitted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "instance_url": server.uri()
            })))
            .mount(&server)
            .await;

        oauth().refresh_token(&session(&server, "")).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&received[0].body).into_owned();
        assert!(!body.contains("client_secret"), "body was {body}");
    }

    #[tokio::test]
    async fn test_oauth_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "expired access/refresh token"
            })))
            .mount(&server)
            .await;

        let err = oauth().refresh_token(&session(&server, "")).await.unwrap_err();
        match err.kind {
            ErrorKind::OAuth { error, .. } => assert_eq!(error, "invalid_grant"),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_fields_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"access_token": "tok"})),
            )
            .mount(&server)
            .await;

        let err = oauth().refresh_token(&session(&server, "")).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidResponse(_)));
    }

    #[test]
    fn test_token_response_debug_redacts_tokens() {
        let token = TokenResponse {
            access_token: "secret_access_token".to_string(),
            instance_url: "https://na1.salesforce.com".to_string(),
            id: None,
            token_type: Some("Bearer".to_string()),
            scope: None,
            signature: Some("sig".to_string()),
            issued_at: None,
        };
        let debug = format!("{:?}", token);
        assert!(!debug.contains("secret_access_token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
