//! Salesforce REST API client.
//!
//! This client wraps `SalesforceClient` from `sfq-client` and provides typed
//! methods for queries, batch queries, SObject Collections and platform events.

use sfq_auth::SalesforceCredentials;
use sfq_client::{ClientConfig, Result, SalesforceClient};

mod collections;
mod composite;
mod events;
mod query;

/// Salesforce REST API client.
///
/// Provides typed methods for:
/// - SOQL queries with pagination
/// - Batch queries through the Composite API
/// - SObject Collections create/update/delete
/// - Platform event publishing and Apex log cleanup
///
/// # Example
///
/// ```rust,ignore
/// use sfq_auth::SalesforceCredentials;
/// use sfq_client::ClientConfig;
/// use sfq_rest::SalesforceRestClient;
///
/// let creds = SalesforceCredentials::from_env()?;
/// let client = SalesforceRestClient::connect(&creds, ClientConfig::default())?;
///
/// let results = client
///     .batch_query([
///         ("accounts", "SELECT Id, Name FROM Account LIMIT 10"),
///         ("contacts", "SELECT Id, Email FROM Contact LIMIT 10"),
///     ])
///     .await?;
///
/// for (name, result) in &results {
///     match result {
///         Ok(page) => println!("{name}: {} records", page.total_size),
///         Err(e) => println!("{name}: {e}"),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceRestClient {
    client: SalesforceClient,
}

impl SalesforceRestClient {
    /// Create a REST client from an existing SalesforceClient.
    pub fn new(client: SalesforceClient) -> Self {
        Self { client }
    }

    /// Create a REST client from an existing SalesforceClient.
    pub fn from_client(client: SalesforceClient) -> Self {
        Self::new(client)
    }

    /// Build a client (session, token manager and engine) from credentials.
    /// No network call happens until the first request.
    pub fn connect(credentials: &SalesforceCredentials, config: ClientConfig) -> Result<Self> {
        Ok(Self::new(credentials.connect(config)?))
    }

    /// Get the underlying SalesforceClient.
    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    /// Get the API version.
    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }
}
