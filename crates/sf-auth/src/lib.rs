//! # sfq-auth
//!
//! Token lifecycle for sfq: the OAuth refresh-token grant and the
//! [`TokenManager`] that plugs into [`sfq_client::SalesforceClient`] through
//! the [`sfq_client::TokenProvider`] seam.
//!
//! ## Security
//!
//! - Sensitive data (tokens, secrets) are redacted in Debug output
//! - Tracing/logging skips credential parameters
//! - Error messages sanitize any credential data
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfq_auth::SalesforceCredentials;
//! use sfq_client::ClientConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sfq_client::Error> {
//!     // SF_AUTH_URL, or SF_INSTANCE_URL + SF_CLIENT_ID + SF_REFRESH_TOKEN
//!     let client = SalesforceCredentials::from_env()?.connect(ClientConfig::default())?;
//!
//!     let limits: serde_json::Value = client.get_json(&client.rest_path("limits")).await?;
//!     Ok(())
//! }
//! ```

mod credentials;
mod error;
mod oauth;
mod token_manager;

pub use credentials::SalesforceCredentials;
pub use error::{Error, ErrorKind, Result};
pub use oauth::{OAuthClient, TokenResponse, TOKEN_PATH};
pub use token_manager::TokenManager;

