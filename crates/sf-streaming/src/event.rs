//! Delivered events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One event delivered on a subscribed channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub channel: String,
    /// `data.event.replayId`, when the platform sent one.
    pub replay_id: Option<i64>,
    /// `data.payload` for platform and change events, `data.sobject` for
    /// PushTopic events, otherwise the whole `data` object.
    pub payload: Value,
    pub created_date: Option<DateTime<Utc>>,
}

impl StreamEvent {
    /// Build an event from a data message's `data` field.
    pub fn from_data(channel: &str, data: Value) -> Self {
        let event = data.get("event");
        let replay_id = event.and_then(|e| e.get("replayId")).and_then(Value::as_i64);
        let created_date = event
            .and_then(|e| e.get("createdDate"))
            .or_else(|| data.get("payload").and_then(|p| p.get("CreatedDate")))
            .and_then(Value::as_str)
            .and_then(parse_timestamp);

        let payload = match data {
            Value::Object(mut map) => {
                if let Some(payload) = map.remove("payload") {
                    payload
                } else if let Some(sobject) = map.remove("sobject") {
                    sobject
                } else {
                    Value::Object(map)
                }
            }
            other => other,
        };

        Self {
            channel: channel.to_string(),
            replay_id,
            payload,
            created_date,
        }
    }
}

/// Platform timestamps come as RFC 3339 (`...Z`) or with a `+0000` offset.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
