use serde::de::DeserializeOwned;
use sfq_client::{RequestBuilder, RequestPurpose, Result};
use tracing::instrument;

use crate::query::QueryResult;

impl super::SalesforceRestClient {
    /// Execute a SOQL query.
    ///
    /// Returns the first page of results. Use `query_all` for automatic pagination.
    ///
    /// # Security
    ///
    /// **IMPORTANT**: If you are including user-provided values in the WHERE clause,
    /// you MUST escape them to prevent SOQL injection attacks:
    ///
    /// ```rust,ignore
    /// use sfq_client::security::soql;
    ///
    /// // WRONG - vulnerable to injection:
    /// let query = format!("SELECT Id FROM Account WHERE Name = '{}'", user_input);
    ///
    /// // CORRECT - properly escaped:
    /// let safe_value = soql::escape_string(user_input);
    /// let query = format!("SELECT Id FROM Account WHERE Name = '{}'", safe_value);
    /// ```
    #[instrument(skip(self))]
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        let request = RequestBuilder::get(self.client.rest_path("query"))
            .query("q", soql)
            .purpose(RequestPurpose::Query);
        self.client.send_json(request).await
    }

    /// Execute a SOQL query and return all records, following
    /// `nextRecordsUrl` until the platform reports `done`.
    ///
    /// # Security
    ///
    /// Escape user-provided values with `sfq_client::security::soql::escape_string()`.
    /// See `query()` for examples.
    #[instrument(skip(self))]
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let mut page = self.query::<T>(soql).await?;
        let mut records = std::mem::take(&mut page.records);

        while page.has_more() {
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            page = self.query_more::<T>(&next).await?;
            records.append(&mut page.records);
        }

        Ok(records)
    }

    /// Fetch the next page of query results.
    #[instrument(skip(self))]
    pub async fn query_more<T: DeserializeOwned>(
        &self,
        next_records_url: &str,
    ) -> Result<QueryResult<T>> {
        let request = RequestBuilder::get(next_records_url).purpose(RequestPurpose::Query);
        self.client.send_json(request).await
    }

    /// Execute a SOQL query against the Tooling API.
    #[instrument(skip(self))]
    pub async fn tooling_query<T: DeserializeOwned>(&self, soql: &str) -> Result<QueryResult<T>> {
        let request = RequestBuilder::get(self.client.tooling_path("query"))
            .query("q", soql)
            .purpose(RequestPurpose::Query);
        self.client.send_json(request).await
    }
}
