//! # sfq-streaming
//!
//! Salesforce Streaming API subscriptions over Bayeux long polling.
//!
//! A [`Subscription`] walks the handshake, subscribe and connect exchange
//! through the resilient request engine in `sfq-client`, so expired sessions
//! and transient failures are handled there. Events are produced lazily: no
//! network activity happens until the consumer asks for the next one.
//!
//! ## Replay
//!
//! Each delivered event carries a replay id. The subscription remembers the
//! last one it handed out and never yields an event at or below it. To resume
//! after a restart, build a new subscription with
//! [`ReplayFrom::Marker`] set to the last id you processed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use futures::StreamExt;
//! use sfq_auth::SalesforceCredentials;
//! use sfq_client::ClientConfig;
//! use sfq_streaming::{ReplayFrom, StreamingConfig, Subscription};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sfq_client::Error> {
//!     let client = SalesforceCredentials::from_env()?.connect(ClientConfig::default())?;
//!     let config = StreamingConfig::builder().with_replay(ReplayFrom::All).build();
//!
//!     let stream = Subscription::new(client, "/data/AccountChangeEvent", config)?.into_stream();
//!     futures::pin_mut!(stream);
//!     while let Some(event) = stream.next().await {
//!         println!("{}", event?.payload);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod event;
mod message;
mod subscription;

pub use config::{
    StreamingConfig, StreamingConfigBuilder, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_POLL_WAIT,
};
pub use event::StreamEvent;
pub use message::{Advice, Message, Reconnect, ReplayFrom};
pub use subscription::{ConnectionState, PollOutcome, Subscription};
