//! # sfq-client
//!
//! Session state and the resilient request engine shared by every sfq API
//! crate.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Application Layer                        │
//! │        (sfq-rest batch queries, sfq-streaming polls)        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SalesforceClient                          │
//! │  - One logical call per send()                              │
//! │  - Single re-authentication on a rejected session           │
//! │  - Bounded backoff on 5xx / 429 / transport failures        │
//! │  - Ordered classification table (classify)                  │
//! └─────────────────────────────────────────────────────────────┘
//!            │                                  │
//!            ▼                                  ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │      TokenProvider       │   │         SfHttpClient         │
//! │  (sfq-auth TokenManager) │   │  one attempt, buffered body  │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! A [`Session`] holds the identity and the cached [`AccessGrant`]; the
//! engine only ever sees grants through the [`TokenProvider`] seam.

mod client;
mod config;
mod error;
mod request;
mod response;
mod retry;
mod salesforce_client;
mod session;

pub mod classify;
pub mod security;

pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBody, RequestBuilder, RequestMethod, RequestPurpose};
pub use response::Response;
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use salesforce_client::SalesforceClient;
pub use session::{AccessGrant, Session, SessionBuilder, TokenProvider};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// Client identifier sent as User-Agent and in `Sforce-Call-Options`.
pub const USER_AGENT: &str = concat!("sfq/", env!("CARGO_PKG_VERSION"));
