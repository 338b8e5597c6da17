use serde::Serialize;
use sfq_client::security::{ids, soql};
use sfq_client::{Error, ErrorKind, RequestBuilder, RequestPurpose, Result};
use tracing::instrument;

use crate::collections::{
    stamp_record, CollectionRequest, CollectionResult, MAX_COLLECTION_RECORDS,
};

pub(super) fn check_sobject(sobject: &str) -> Result<()> {
    if soql::is_safe_identifier(sobject) {
        Ok(())
    } else {
        Err(Error::configuration(format!("invalid SObject name {:?}", sobject)))
    }
}

fn check_id(id: &str) -> Result<()> {
    if ids::is_valid_salesforce_id(id) {
        Ok(())
    } else {
        Err(Error::configuration(format!("invalid Salesforce ID {:?}", id)))
    }
}

/// The platform answers one result per record, in request order.
fn outcomes(sent: usize, results: Vec<CollectionResult>) -> Result<Vec<Result<String>>> {
    if results.len() != sent {
        return Err(Error::new(ErrorKind::Api {
            status: 200,
            error_code: "MALFORMED_RESPONSE".to_string(),
            message: format!(
                "collections call returned {} results for {} records",
                results.len(),
                sent
            ),
        }));
    }
    Ok(results
        .into_iter()
        .map(CollectionResult::into_outcome)
        .collect())
}

impl super::SalesforceRestClient {
    /// Create records through SObject Collections, 200 per request, with
    /// `allOrNone: false`. Returns one outcome per record, in input order:
    /// the new id, or a `Crud` error for a rejected row.
    #[instrument(skip(self, records))]
    pub async fn create<T: Serialize>(
        &self,
        sobject: &str,
        records: &[T],
    ) -> Result<Vec<Result<String>>> {
        check_sobject(sobject)?;
        let stamped = records
            .iter()
            .map(|r| stamp_record(sobject, None, r))
            .collect::<Result<Vec<_>>>()?;

        let base = RequestBuilder::post(self.client.rest_path("composite/sobjects"));
        self.send_collections(base, stamped).await
    }

    /// Update records through SObject Collections. Each entry is
    /// `(id, fields)`; the record is sent with `attributes.type` and `Id`.
    #[instrument(skip(self, records))]
    pub async fn update<T: Serialize>(
        &self,
        sobject: &str,
        records: &[(String, T)],
    ) -> Result<Vec<Result<String>>> {
        check_sobject(sobject)?;
        let stamped = records
            .iter()
            .map(|(id, r)| {
                check_id(id)?;
                stamp_record(sobject, Some(id), r)
            })
            .collect::<Result<Vec<_>>>()?;

        let base = RequestBuilder::patch(self.client.rest_path("composite/sobjects"));
        self.send_collections(base, stamped).await
    }

    /// Delete records by id, 200 per request, with `allOrNone=false`.
    #[instrument(skip(self))]
    pub async fn delete(&self, record_ids: &[&str]) -> Result<Vec<Result<String>>> {
        for id in record_ids {
            check_id(id)?;
        }

        let mut all = Vec::with_capacity(record_ids.len());
        for chunk in record_ids.chunks(MAX_COLLECTION_RECORDS) {
            let request = RequestBuilder::delete(self.client.rest_path("composite/sobjects"))
                .query("ids", chunk.join(","))
                .query("allOrNone", "false")
                .purpose(RequestPurpose::Mutation);
            let results: Vec<CollectionResult> = self.client.send_json(request).await?;
            all.extend(outcomes(chunk.len(), results)?);
        }
        Ok(all)
    }

    async fn send_collections(
        &self,
        base: RequestBuilder,
        records: Vec<serde_json::Value>,
    ) -> Result<Vec<Result<String>>> {
        let mut all = Vec::with_capacity(records.len());
        for chunk in records.chunks(MAX_COLLECTION_RECORDS) {
            let body = CollectionRequest {
                all_or_none: false,
                records: chunk.to_vec(),
            };
            let request = base
                .clone()
                .json(&body)?
                .purpose(RequestPurpose::Mutation);
            let results: Vec<CollectionResult> = self.client.send_json(request).await?;
            all.extend(outcomes(chunk.len(), results)?);
        }
        Ok(all)
    }
}
