use serde_json::Value;
use sfq_client::{RequestBuilder, RequestPurpose, Result};
use tracing::{debug, instrument};

use crate::composite::{
    pair_responses, validate_names, BatchResults, CompositeRequest, CompositeResponse,
    MAX_QUERY_SUBREQUESTS,
};

impl super::SalesforceRestClient {
    /// Run N independent SOQL queries through the Composite API.
    ///
    /// Each query is keyed by a caller-chosen name, which is also the
    /// sub-request's `referenceId`; names must match `[A-Za-z][A-Za-z0-9_]*`
    /// and be unique. The returned map has exactly the input names as keys.
    /// A failed sub-query is that entry's error and never affects its
    /// siblings. The call itself fails only when a composite round trip
    /// fails.
    ///
    /// The platform accepts at most five query sub-requests per composite
    /// call, so larger batches are sent as sequential chunks of five.
    ///
    /// # Security
    ///
    /// Escape user-provided values with `sfq_client::security::soql::escape_string()`.
    #[instrument(skip(self, queries))]
    pub async fn batch_query<I, K, Q>(&self, queries: I) -> Result<BatchResults>
    where
        I: IntoIterator<Item = (K, Q)>,
        K: Into<String>,
        Q: Into<String>,
    {
        let queries: Vec<(String, String)> = queries
            .into_iter()
            .map(|(name, soql)| (name.into(), soql.into()))
            .collect();
        validate_names(&queries)?;

        let mut results = BatchResults::new();
        if queries.is_empty() {
            return Ok(results);
        }

        let query_path = self.client.rest_path("query");
        let composite_path = self.client.rest_path("composite");

        for chunk in queries.chunks(MAX_QUERY_SUBREQUESTS) {
            debug!(subrequests = chunk.len(), "Sending composite batch");
            let request = RequestBuilder::post(composite_path.as_str())
                .json(&CompositeRequest::queries(&query_path, chunk))?
                .purpose(RequestPurpose::Query);
            let response: CompositeResponse = self.client.send_json(request).await?;
            pair_responses(chunk, response, &mut results);
        }

        Ok(results)
    }

    /// Like [`batch_query`](Self::batch_query), then follows `nextRecordsUrl`
    /// for every successful entry until it is complete. A failure while
    /// paging replaces that entry with the error.
    #[instrument(skip(self, queries))]
    pub async fn batch_query_all<I, K, Q>(&self, queries: I) -> Result<BatchResults>
    where
        I: IntoIterator<Item = (K, Q)>,
        K: Into<String>,
        Q: Into<String>,
    {
        let mut results = self.batch_query(queries).await?;

        for (name, entry) in results.iter_mut() {
            let mut failure = None;
            if let Ok(page) = entry.as_mut() {
                while page.has_more() {
                    let Some(next) = page.next_records_url.take() else {
                        break;
                    };
                    match self.query_more::<Value>(&next).await {
                        Ok(mut more) => {
                            page.records.append(&mut more.records);
                            page.done = more.done;
                            page.next_records_url = more.next_records_url;
                        }
                        Err(e) => {
                            debug!(name = %name, error = %e, "Pagination failed");
                            failure = Some(e);
                            break;
                        }
                    }
                }
            }
            if let Some(e) = failure {
                *entry = Err(e);
            }
        }

        Ok(results)
    }
}
