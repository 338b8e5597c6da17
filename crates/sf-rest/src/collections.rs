//! SObject Collections for batch mutations.

use serde::{Deserialize, Serialize};
use sfq_client::{Error, ErrorKind, Result};

/// Platform limit on records per collections call.
pub const MAX_COLLECTION_RECORDS: usize = 200;

/// Request for SObject Collections operations.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    pub records: Vec<serde_json::Value>,
}

/// One row-level error.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecordError {
    #[serde(rename = "statusCode")]
    pub status_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Result of a collection operation for one record.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionResult {
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<RecordError>,
    pub created: Option<bool>,
}

impl CollectionResult {
    /// The record id on success, or a `Crud` error built from the first
    /// row error.
    pub fn into_outcome(self) -> Result<String> {
        if self.success {
            return Ok(self.id.unwrap_or_default());
        }

        let first = self.errors.into_iter().next();
        let kind = match first {
            Some(err) => ErrorKind::Crud {
                error_code: err.status_code,
                message: sfq_client::classify::sanitize_error_message(&err.message),
                fields: err.fields,
            },
            None => ErrorKind::Crud {
                error_code: "UNKNOWN_ERROR".to_string(),
                message: "record rejected without detail".to_string(),
                fields: Vec::new(),
            },
        };
        Err(Error::new(kind))
    }
}

/// Serialize a record and stamp it with `attributes.type` (and `Id` for
/// updates). Records must serialize to JSON objects.
pub(crate) fn stamp_record<T: Serialize>(
    sobject: &str,
    id: Option<&str>,
    record: &T,
) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(record)?;
    let map = value.as_object_mut().ok_or_else(|| {
        Error::configuration(format!("{} record must serialize to a JSON object", sobject))
    })?;
    map.insert(
        "attributes".to_string(),
        serde_json::json!({"type": sobject}),
    );
    if let Some(id) = id {
        map.insert("Id".to_string(), serde_json::json!(id));
    }
    Ok(value)
}
