//! Batched queries and record collections through the public facade.

use super::common::MockOrg;
use serde_json::{json, Value};
use sfq::client::security::soql;
use sfq::SalesforceRestClient;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, Request, ResponseTemplate};

/// Answers every composite sub-request with one record named after the SOQL
/// it ran, except queries on `Nope__c`, which the org rejects.
fn composite_org(req: &Request) -> ResponseTemplate {
    let body: Value = serde_json::from_slice(&req.body).unwrap();
    let responses: Vec<Value> = body["compositeRequest"]
        .as_array()
        .unwrap()
        .iter()
        .map(|sub| {
            let reference_id = sub["referenceId"].as_str().unwrap();
            let url = sub["url"].as_str().unwrap();
            if url.contains("Nope__c") {
                json!({
                    "body": [{
                        "errorCode": "INVALID_TYPE",
                        "message": "sObject type 'Nope__c' is not supported."
                    }],
                    "httpHeaders": {},
                    "httpStatusCode": 400,
                    "referenceId": reference_id
                })
            } else {
                json!({
                    "body": {"totalSize": 1, "done": true, "records": [{"Ref": reference_id}]},
                    "httpHeaders": {},
                    "httpStatusCode": 200,
                    "referenceId": reference_id
                })
            }
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "compositeResponse": responses }))
}

#[tokio::test]
async fn test_dashboard_batch_isolates_failures() {
    let org = MockOrg::start().await;
    Mock::given(method("POST"))
        .and(path("/services/data/v62.0/composite"))
        .respond_with(composite_org)
        .expect(1)
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    let name = soql::escape_string("O'Brien & Sons");
    let results = client
        .batch_query([
            ("accounts", format!("SELECT Id FROM Account WHERE Name = '{name}'")),
            ("contacts", "SELECT Id FROM Contact LIMIT 5".to_string()),
            ("broken", "SELECT Id FROM Nope__c".to_string()),
        ])
        .await
        .unwrap();

    assert_eq!(
        results.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["accounts", "broken", "contacts"]
    );
    assert_eq!(results["accounts"].as_ref().unwrap().records[0]["Ref"], "accounts");
    assert_eq!(results["contacts"].as_ref().unwrap().records[0]["Ref"], "contacts");

    let err = results["broken"].as_ref().unwrap_err();
    assert!(err.is_query_error(), "unexpected error: {err:?}");
    assert_eq!(err.error_code(), Some("INVALID_TYPE"));
}

#[tokio::test]
async fn test_batch_survives_session_expiry() {
    let org = MockOrg::start().await;
    Mock::given(method("POST"))
        .and(path("/services/data/v62.0/composite"))
        .and(header("authorization", "Bearer token-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!([{
            "errorCode": "INVALID_SESSION_ID",
            "message": "Session expired or invalid"
        }])))
        .expect(1)
        .mount(&org.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/services/data/v62.0/composite"))
        .and(header("authorization", "Bearer token-2"))
        .respond_with(composite_org)
        .expect(1)
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    let results = client
        .batch_query([("accounts", "SELECT Id FROM Account")])
        .await
        .unwrap();

    assert!(results["accounts"].is_ok());
    assert_eq!(org.exchanges(), 2);
}

#[tokio::test]
async fn test_create_then_delete_reports_per_record_outcomes() {
    let org = MockOrg::start().await;
    Mock::given(method("POST"))
        .and(path("/services/data/v62.0/composite/sobjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "001000000000001AAA", "success": true, "errors": []},
            {"success": false, "errors": [{
                "statusCode": "REQUIRED_FIELD_MISSING",
                "message": "Required fields are missing: [Name]",
                "fields": ["Name"]
            }]}
        ])))
        .expect(1)
        .mount(&org.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/services/data/v62.0/composite/sobjects"))
        .and(query_param("ids", "001000000000001AAA"))
        .and(query_param("allOrNone", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "001000000000001AAA", "success": true, "errors": []}
        ])))
        .expect(1)
        .mount(&org.server)
        .await;

    let client = SalesforceRestClient::new(org.client());
    let created = client
        .create("Account", &[json!({"Name": "Acme"}), json!({"Industry": "Energy"})])
        .await
        .unwrap();

    assert_eq!(created.len(), 2);
    let id = created[0].as_ref().unwrap().clone();
    let rejected = created[1].as_ref().unwrap_err();
    assert!(rejected.is_crud_error());
    assert_eq!(rejected.error_code(), Some("REQUIRED_FIELD_MISSING"));

    let deleted = client.delete(&[id.as_str()]).await.unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].as_ref().unwrap(), "001000000000001AAA");

    let sent = org.server.received_requests().await.unwrap();
    let create_body: Value = sent
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path().ends_with("composite/sobjects"))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(create_body["allOrNone"], false);
    assert_eq!(create_body["records"][0]["attributes"]["type"], "Account");
}
