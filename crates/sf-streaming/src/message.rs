//! Bayeux protocol messages.
//!
//! Every exchange is a JSON array of messages POSTed to `/cometd/{version}`.
//! One struct covers both directions; absent fields are omitted on the wire.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const HANDSHAKE_CHANNEL: &str = "/meta/handshake";
pub const SUBSCRIBE_CHANNEL: &str = "/meta/subscribe";
pub const CONNECT_CHANNEL: &str = "/meta/connect";
pub const DISCONNECT_CHANNEL: &str = "/meta/disconnect";

const BAYEUX_VERSION: &str = "1.0";
const LONG_POLLING: &str = "long-polling";

/// One Bayeux message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<Advice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Message {
    /// Capability negotiation; the reply carries the `clientId`.
    pub fn handshake(id: String) -> Self {
        Self {
            channel: HANDSHAKE_CHANNEL.to_string(),
            id: Some(id),
            version: Some(BAYEUX_VERSION.to_string()),
            minimum_version: Some(BAYEUX_VERSION.to_string()),
            supported_connection_types: Some(vec![LONG_POLLING.to_string()]),
            ..Default::default()
        }
    }

    /// Subscribe to `channel`, replaying after `marker`.
    pub fn subscribe(id: String, client_id: &str, channel: &str, marker: i64) -> Self {
        let mut replay = Map::new();
        replay.insert(channel.to_string(), json!(marker));
        Self {
            channel: SUBSCRIBE_CHANNEL.to_string(),
            id: Some(id),
            client_id: Some(client_id.to_string()),
            subscription: Some(channel.to_string()),
            ext: Some(json!({ "replay": replay })),
            ..Default::default()
        }
    }

    /// One long poll.
    pub fn connect(id: String, client_id: &str) -> Self {
        Self {
            channel: CONNECT_CHANNEL.to_string(),
            id: Some(id),
            client_id: Some(client_id.to_string()),
            connection_type: Some(LONG_POLLING.to_string()),
            ..Default::default()
        }
    }

    pub fn disconnect(id: String, client_id: &str) -> Self {
        Self {
            channel: DISCONNECT_CHANNEL.to_string(),
            id: Some(id),
            client_id: Some(client_id.to_string()),
            ..Default::default()
        }
    }

    /// Meta messages are protocol replies; everything else carries data.
    pub fn is_meta(&self) -> bool {
        self.channel.starts_with("/meta/")
    }

    pub fn is_successful(&self) -> bool {
        self.successful == Some(true)
    }

    /// The numeric prefix of a Bayeux error such as `403::Unknown client`.
    pub fn error_status(&self) -> Option<u16> {
        let error = self.error.as_deref()?;
        let (code, _) = error.split_once("::")?;
        code.trim().parse().ok()
    }

    /// The error text, or a placeholder when the server sent none.
    pub fn error_message(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| format!("{} was not successful", self.channel))
    }
}

/// Server guidance on how to continue after a meta reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<Reconnect>,
    /// Milliseconds to wait before the next connect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    /// Milliseconds the server may hold a connect open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// The `advice.reconnect` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reconnect {
    /// Connect again with the same client id after `interval`.
    Retry,
    /// Drop the client id and start over from the handshake.
    Handshake,
    /// Stop.
    None,
    /// A value this client does not know; handled like `Retry`.
    #[serde(other)]
    Unknown,
}

/// Where a subscription starts reading the channel's retained events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplayFrom {
    /// Every retained event (`-2`).
    All,
    /// Only events published after subscribing (`-1`).
    #[default]
    New,
    /// Events strictly after this replay id.
    Marker(i64),
}

impl ReplayFrom {
    /// The value sent in the subscribe `ext.replay` map.
    pub fn marker(&self) -> i64 {
        match self {
            ReplayFrom::All => -2,
            ReplayFrom::New => -1,
            ReplayFrom::Marker(id) => *id,
        }
    }
}
