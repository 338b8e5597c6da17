use serde::Serialize;
use sfq_client::{Error, RequestBuilder, RequestPurpose, Result};
use tracing::{debug, instrument};

use super::collections::check_sobject;
use crate::collections::CollectionResult;
use crate::events::{is_event_name, DescribeGlobalResult};

fn check_event(event_name: &str) -> Result<()> {
    check_sobject(event_name)?;
    if is_event_name(event_name) {
        Ok(())
    } else {
        Err(Error::configuration(format!(
            "{:?} is not a platform event name",
            event_name
        )))
    }
}

impl super::SalesforceRestClient {
    /// Publish one platform event. Returns the event's id, or a `Crud` error
    /// when the platform rejects the payload.
    #[instrument(skip(self, payload))]
    pub async fn publish<T: Serialize>(&self, event_name: &str, payload: &T) -> Result<String> {
        check_event(event_name)?;
        let path = self.client.rest_path(&format!("sobjects/{}", event_name));
        let request = RequestBuilder::post(path)
            .json(payload)?
            .purpose(RequestPurpose::Mutation);
        let result: CollectionResult = self.client.send_json(request).await?;
        result.into_outcome()
    }

    /// Publish many events of one type through SObject Collections. One
    /// outcome per payload, in input order.
    #[instrument(skip(self, payloads))]
    pub async fn publish_batch<T: Serialize>(
        &self,
        event_name: &str,
        payloads: &[T],
    ) -> Result<Vec<Result<String>>> {
        check_event(event_name)?;
        self.create(event_name, payloads).await
    }

    /// Names of the platform events defined in the org.
    #[instrument(skip(self))]
    pub async fn list_events(&self) -> Result<Vec<String>> {
        let request =
            RequestBuilder::get(self.client.rest_path("sobjects")).purpose(RequestPurpose::Query);
        let describe: DescribeGlobalResult = self.client.send_json(request).await?;
        Ok(describe.event_names())
    }

    /// Delete every Apex debug log in the org. Returns one outcome per log.
    #[instrument(skip(self))]
    pub async fn cleanup_apex_logs(&self) -> Result<Vec<Result<String>>> {
        #[derive(serde::Deserialize)]
        struct LogId {
            #[serde(rename = "Id")]
            id: String,
        }

        let logs: Vec<LogId> = self.query_all("SELECT Id FROM ApexLog").await?;
        if logs.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = logs.len(), "Deleting Apex logs");
        let ids: Vec<&str> = logs.iter().map(|l| l.id.as_str()).collect();
        self.delete(&ids).await
    }
}
