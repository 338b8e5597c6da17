//! Streaming subscriptions against a fake Bayeux endpoint.

use super::common::MockOrg;
use futures::StreamExt;
use serde_json::{json, Value};
use sfq::{ReplayFrom, StreamingConfig, Subscription};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, Request, Respond, ResponseTemplate};

const CHANNEL: &str = "/data/AccountChangeEvent";

/// What the fake endpoint observed.
#[derive(Default)]
struct Observed {
    handshakes: Vec<String>,
    markers: Vec<i64>,
    connects_by_client: Vec<String>,
}

/// A Bayeux endpoint whose first access token expires after one delivery.
///
/// With `token-1` the first connect delivers replay 1 and the second is
/// refused with a 401. The engine then re-authenticates and repeats the
/// connect with the old client id, which the server no longer knows; the
/// subscription must handshake again and resume after replay 1.
#[derive(Clone, Default)]
struct ExpiringOrg(Arc<Mutex<Observed>>);

fn bearer(req: &Request) -> String {
    req.headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_start_matches("Bearer ")
        .to_string()
}

fn change_event(replay_id: i64) -> Value {
    json!({
        "channel": CHANNEL,
        "data": {
            "schema": "IeRuaY6cbI_HsV8Rv1Mc5g",
            "payload": {
                "ChangeEventHeader": {"changeType": "UPDATE", "entityName": "Account"},
                "Name": format!("Account {replay_id}")
            },
            "event": {"replayId": replay_id}
        }
    })
}

fn connect_ok() -> Value {
    json!({"channel": "/meta/connect", "successful": true, "advice": {"reconnect": "retry", "interval": 0}})
}

impl Respond for ExpiringOrg {
    fn respond(&self, req: &Request) -> ResponseTemplate {
        let token = bearer(req);
        let body: Value = serde_json::from_slice(&req.body).unwrap();
        let msg = &body[0];
        let channel = msg["channel"].as_str().unwrap();
        let mut observed = self.0.lock().unwrap();

        let reply = match channel {
            "/meta/handshake" => {
                let client_id = format!("client-{token}");
                observed.handshakes.push(client_id.clone());
                json!([{"channel": channel, "successful": true, "clientId": client_id}])
            }
            "/meta/subscribe" => {
                let marker = msg["ext"]["replay"][CHANNEL].as_i64().unwrap();
                observed.markers.push(marker);
                json!([{"channel": channel, "successful": true, "subscription": CHANNEL}])
            }
            "/meta/connect" => {
                let client_id = msg["clientId"].as_str().unwrap().to_string();
                observed.connects_by_client.push(client_id.clone());
                let seen = observed
                    .connects_by_client
                    .iter()
                    .filter(|c| **c == client_id)
                    .count();

                match (token.as_str(), client_id.as_str(), seen) {
                    ("token-1", _, 1) => json!([change_event(1), connect_ok()]),
                    ("token-1", _, _) => {
                        return ResponseTemplate::new(401).set_body_json(json!([{
                            "errorCode": "INVALID_SESSION_ID",
                            "message": "Session expired or invalid"
                        }]));
                    }
                    (_, "client-token-1", _) => json!([{
                        "channel": "/meta/connect",
                        "successful": false,
                        "error": "403::Unknown client",
                        "advice": {"reconnect": "handshake", "interval": 0}
                    }]),
                    // Redelivery of 1 must be dropped by the subscription.
                    (_, _, 1) => json!([change_event(1), change_event(2), connect_ok()]),
                    _ => json!([{"channel": "/meta/connect", "successful": true, "advice": {"reconnect": "none"}}]),
                }
            }
            "/meta/disconnect" => json!([{"channel": channel, "successful": true}]),
            other => panic!("unexpected channel {other}"),
        };
        ResponseTemplate::new(200).set_body_json(reply)
    }
}

#[tokio::test]
async fn test_expired_session_resumes_after_last_replay() {
    let org = MockOrg::start().await;
    let fake = ExpiringOrg::default();
    Mock::given(method("POST"))
        .and(path("/cometd/62.0"))
        .respond_with(fake.clone())
        .mount(&org.server)
        .await;

    let subscription = Subscription::new(org.client(), CHANNEL, StreamingConfig::default()).unwrap();
    let events: Vec<_> = tokio::time::timeout(
        Duration::from_secs(10),
        subscription.into_stream().collect::<Vec<_>>(),
    )
    .await
    .expect("stream should end once the server says none");

    let replay_ids: Vec<Option<i64>> = events
        .iter()
        .map(|e| e.as_ref().unwrap().replay_id)
        .collect();
    assert_eq!(replay_ids, vec![Some(1), Some(2)]);

    let first = events[0].as_ref().unwrap();
    assert_eq!(first.payload["Name"], "Account 1");
    assert_eq!(first.payload["ChangeEventHeader"]["changeType"], "UPDATE");

    let observed = fake.0.lock().unwrap();
    assert_eq!(observed.handshakes, vec!["client-token-1", "client-token-2"]);
    assert_eq!(observed.markers, vec![-1, 1]);
    assert_eq!(org.exchanges(), 2);
}

#[tokio::test]
async fn test_replay_all_with_deadline_stops_cleanly() {
    let org = MockOrg::start().await;
    Mock::given(method("POST"))
        .and(path("/cometd/62.0"))
        .respond_with(|req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let channel = body[0]["channel"].as_str().unwrap().to_string();
            let reply = match channel.as_str() {
                "/meta/handshake" => json!([{"channel": channel, "successful": true, "clientId": "abc"}]),
                "/meta/subscribe" => {
                    assert_eq!(body[0]["ext"]["replay"][CHANNEL], -2);
                    json!([{"channel": channel, "successful": true, "subscription": CHANNEL}])
                }
                _ => json!([connect_ok()]),
            };
            // Quiet channel: every connect is held briefly and returns nothing.
            ResponseTemplate::new(200)
                .set_body_json(reply)
                .set_delay(Duration::from_millis(50))
        })
        .mount(&org.server)
        .await;

    let config = StreamingConfig::builder()
        .with_replay(ReplayFrom::All)
        .with_deadline(Duration::from_millis(300))
        .build();
    let mut subscription = Subscription::new(org.client(), CHANNEL, config).unwrap();

    let next = tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("deadline should end the stream");
    assert!(next.is_none());
    assert!(subscription.state().is_terminal());
    assert_eq!(subscription.last_replay_id(), None);
}
