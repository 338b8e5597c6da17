//! Read-only checks against a real org. Run with
//! `cargo test --test integration live -- --ignored`.

use super::common::live_credentials;
use serde_json::Value;
use sfq::{ClientConfig, SalesforceRestClient, StreamingConfig, Subscription};
use std::time::Duration;

#[tokio::test]
#[ignore = "requires SF_AUTH_URL"]
async fn test_live_batch_query() {
    let creds = live_credentials();
    let client = SalesforceRestClient::connect(&creds, ClientConfig::default())
        .expect("client should build");

    let results = client
        .batch_query([
            ("users", "SELECT Id, Name FROM User LIMIT 5"),
            ("profiles", "SELECT Id, Name FROM Profile LIMIT 5"),
            ("roles", "SELECT Id FROM UserRole LIMIT 5"),
            ("groups", "SELECT Id FROM Group LIMIT 5"),
            ("orgs", "SELECT Id FROM Organization"),
            ("permission_sets", "SELECT Id FROM PermissionSet LIMIT 5"),
            ("record_types", "SELECT Id FROM RecordType LIMIT 5"),
            ("broken", "SELECT Id FROM NoSuchObject__c"),
        ])
        .await
        .expect("composite round trip should succeed");

    assert_eq!(results.len(), 8);
    let users = results["users"].as_ref().expect("users query should succeed");
    assert!(users.total_size > 0, "every org has at least one user");
    for name in ["profiles", "roles", "groups", "orgs", "permission_sets", "record_types"] {
        assert!(results[name].is_ok(), "{name}: {:?}", results[name]);
    }
    assert!(results["broken"].is_err());
}

#[tokio::test]
#[ignore = "requires SF_AUTH_URL"]
async fn test_live_query_all() {
    let creds = live_credentials();
    let client = SalesforceRestClient::connect(&creds, ClientConfig::default())
        .expect("client should build");

    let users: Vec<Value> = client
        .query_all("SELECT Id FROM User")
        .await
        .expect("query should succeed");
    assert!(!users.is_empty());
}

#[tokio::test]
#[ignore = "requires SF_AUTH_URL"]
async fn test_live_subscription_handshakes() {
    let creds = live_credentials();
    let client = creds
        .connect(ClientConfig::default())
        .expect("client should build");

    let config = StreamingConfig::builder()
        .with_poll_wait(Duration::from_secs(5))
        .with_deadline(Duration::from_secs(10))
        .build();
    let mut subscription = Subscription::new(client, "/data/ChangeEvents", config)
        .expect("channel is valid");

    // A quiet org yields nothing; reaching the deadline without error is
    // the check.
    while let Some(event) = subscription.next().await {
        event.expect("subscription should not fail");
    }
    assert!(subscription.state().is_terminal());
    assert!(subscription.client_id().is_none());
}
