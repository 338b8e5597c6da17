//! # sfq
//!
//! An async Salesforce client core for Rust: token lifecycle, a resilient
//! request engine, composite batch queries and Streaming API subscriptions.
//!
//! ## Security
//!
//! - Sensitive data (tokens, secrets) are redacted in Debug output
//! - Tracing/logging skips credential parameters
//! - Error messages sanitize any credential data
//!
//! ## Crates
//!
//! - **sfq-client** - Session state, retrying request engine, error taxonomy
//! - **sfq-auth** - OAuth refresh-token grant, single-flight token manager, credentials loading
//! - **sfq-rest** - Composite batch queries, SOQL query, SObject Collections
//! - **sfq-streaming** - Bayeux long-polling subscriptions with replay
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sfq::{ClientConfig, SalesforceCredentials, SalesforceRestClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sfq::Error> {
//!     // SF_AUTH_URL, or SF_INSTANCE_URL + SF_CLIENT_ID + SF_REFRESH_TOKEN
//!     let creds = SalesforceCredentials::from_env()?;
//!     let client = SalesforceRestClient::connect(&creds, ClientConfig::default())?;
//!
//!     let results = client
//!         .batch_query([
//!             ("accounts", "SELECT Id, Name FROM Account LIMIT 10"),
//!             ("contacts", "SELECT Id, Email FROM Contact LIMIT 10"),
//!         ])
//!         .await?;
//!
//!     for (name, result) in results {
//!         match result {
//!             Ok(page) => println!("{name}: {} records", page.total_size),
//!             Err(e) => eprintln!("{name}: {e}"),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "auth")]
pub use sfq_auth as auth;
#[cfg(feature = "client")]
pub use sfq_client as client;
#[cfg(feature = "rest")]
pub use sfq_rest as rest;
#[cfg(feature = "streaming")]
pub use sfq_streaming as streaming;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use sfq_auth::{SalesforceCredentials, TokenManager};
#[cfg(feature = "client")]
pub use sfq_client::{ClientConfig, Error, ErrorKind, Result, RetryConfig, SalesforceClient};
#[cfg(feature = "rest")]
pub use sfq_rest::{BatchResults, QueryResult, SalesforceRestClient};
#[cfg(feature = "streaming")]
pub use sfq_streaming::{ReplayFrom, StreamEvent, StreamingConfig, Subscription};
