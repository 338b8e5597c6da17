//! Token lifecycle through the request engine.

use super::common::MockOrg;
use serde_json::{json, Value};
use sfq::{SalesforceCredentials, SalesforceRestClient};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn empty_page() -> Value {
    json!({"totalSize": 0, "done": true, "records": []})
}

fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!([{
        "errorCode": "INVALID_SESSION_ID",
        "message": "Session expired or invalid"
    }]))
}

#[tokio::test]
async fn test_first_call_exchanges_once_and_caches() {
    let org = MockOrg::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(3)
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    for _ in 0..3 {
        client.query::<Value>("SELECT Id FROM Account").await.unwrap();
    }
    assert_eq!(org.exchanges(), 1);
}

#[tokio::test]
async fn test_expired_session_refreshes_exactly_once() {
    let org = MockOrg::start().await;
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .respond_with(move |req: &Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            match req.headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer token-2") => ResponseTemplate::new(200).set_body_json(empty_page()),
                _ => expired(),
            }
        })
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    client.query::<Value>("SELECT Id FROM Account").await.unwrap();

    assert_eq!(org.exchanges(), 2);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_second_rejection_is_terminal() {
    let org = MockOrg::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .respond_with(expired())
        .expect(2)
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    let err = client
        .query::<Value>("SELECT Id FROM Account")
        .await
        .unwrap_err();

    assert!(err.is_auth_error(), "unexpected error: {err:?}");
    assert_eq!(org.exchanges(), 2);
}

#[tokio::test]
async fn test_racing_calls_share_the_refresh() {
    let org = MockOrg::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .respond_with(|req: &Request| {
            match req.headers.get("authorization").and_then(|v| v.to_str().ok()) {
                Some("Bearer token-1") => expired(),
                _ => ResponseTemplate::new(200).set_body_json(empty_page()),
            }
        })
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    let (a, b) = tokio::join!(
        client.query::<Value>("SELECT Id FROM Account"),
        client.query::<Value>("SELECT Id FROM Contact"),
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
    assert_eq!(org.exchanges(), 2);
}

#[tokio::test]
async fn test_requests_follow_canonical_instance_url() {
    let login = MockServer::start().await;
    let instance = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "instance_url": format!("{}/", instance.uri())
        })))
        .expect(1)
        .mount(&login)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(1)
        .mount(&instance)
        .await;

    let creds = SalesforceCredentials::new(login.uri(), "test-client", "test-refresh");
    let client = SalesforceRestClient::connect(&creds, super::common::fast_retry_config()).unwrap();
    client.query::<Value>("SELECT Id FROM Account").await.unwrap();

    let grant = client.inner().session().current_grant().unwrap();
    assert_eq!(grant.instance_url(), instance.uri());
    assert_eq!(client.inner().session().instance_url(), login.uri());
}

#[tokio::test]
async fn test_sfdx_auth_url_end_to_end() {
    let org = MockOrg::start().await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .mount(&org.server)
        .await;

    let auth_url = format!("force://test-client:test-secret:test-refresh@{}", org.server.uri());
    let creds = SalesforceCredentials::from_sfdx_auth_url(&auth_url).unwrap();
    let client = SalesforceRestClient::connect(&creds, super::common::fast_retry_config()).unwrap();
    client.query::<Value>("SELECT Id FROM Account").await.unwrap();

    let token_request = org
        .server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.url.path() == "/services/oauth2/token")
        .unwrap();
    let form = String::from_utf8(token_request.body).unwrap();
    assert!(form.contains("grant_type=refresh_token"));
    assert!(form.contains("client_secret=test-secret"));
    assert!(form.contains("refresh_token=test-refresh"));
}

#[tokio::test]
async fn test_failed_exchange_surfaces_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "expired access/refresh token"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v62.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(empty_page()))
        .expect(0)
        .mount(&server)
        .await;

    let creds = SalesforceCredentials::new(server.uri(), "test-client", "test-refresh");
    let client = SalesforceRestClient::connect(&creds, super::common::fast_retry_config()).unwrap();
    let err = client
        .query::<Value>("SELECT Id FROM Account")
        .await
        .unwrap_err();
    assert!(err.is_auth_error(), "unexpected error: {err:?}");
}
