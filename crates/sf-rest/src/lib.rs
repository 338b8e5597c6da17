//! # sfq-rest
//!
//! Salesforce REST API operations for sfq, built on the resilient request
//! engine in `sfq-client`.
//!
//! ## Features
//!
//! - **Batch Query** - N independent SOQL queries in one Composite API round
//!   trip, each result keyed by name with per-query failure isolation
//! - **SOQL Query** - Execute queries with pagination
//! - **SObject Collections** - Create, update and delete up to 200 records per
//!   request with per-record outcomes
//! - **Platform Events** - Publish one or many events and list the event
//!   types an org defines
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfq_auth::SalesforceCredentials;
//! use sfq_client::ClientConfig;
//! use sfq_rest::SalesforceRestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sfq_rest::Error> {
//!     let creds = SalesforceCredentials::from_env()?;
//!     let client = SalesforceRestClient::connect(&creds, ClientConfig::default())?;
//!
//!     let results = client
//!         .batch_query([
//!             ("open_cases", "SELECT Id FROM Case WHERE IsClosed = false"),
//!             ("new_leads", "SELECT Id FROM Lead WHERE CreatedDate = TODAY"),
//!         ])
//!         .await?;
//!
//!     let ids = client
//!         .create("Account", &[serde_json::json!({"Name": "New Account"})])
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

mod client;
mod collections;
mod composite;
mod events;
mod query;

// Main client
pub use client::SalesforceRestClient;

// Collection operations
pub use collections::{CollectionRequest, CollectionResult, RecordError, MAX_COLLECTION_RECORDS};

// Composite API
pub use composite::{
    pair_responses, validate_names, BatchResults, CompositeRequest, CompositeResponse,
    CompositeSubrequest, CompositeSubresponse, MAX_QUERY_SUBREQUESTS, MAX_SUBREQUESTS,
};

// Platform events
pub use events::{is_event_name, DescribeGlobalResult, SObjectBasicInfo, EVENT_SUFFIX};

// Query types
pub use query::QueryResult;

// Errors are shared with the engine
pub use sfq_client::{Error, ErrorKind, Result};
