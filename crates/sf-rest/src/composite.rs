//! Composite API types and the batch-query pairing rules.
//!
//! A batch query is one composite request whose sub-requests are independent
//! `GET .../query?q=` calls. The caller's logical names double as reference
//! ids, so results are paired by `referenceId` and never by position.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sfq_client::classify::error_for;
use sfq_client::security::soql;
use sfq_client::{Error, ErrorKind, RequestPurpose, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::query::QueryResult;

/// Platform limit on sub-requests per composite call.
pub const MAX_SUBREQUESTS: usize = 25;

/// Platform limit on query and queryAll sub-requests per composite call.
pub const MAX_QUERY_SUBREQUESTS: usize = 5;

/// Outcome of a batch query: one entry per input name.
pub type BatchResults = BTreeMap<String, Result<QueryResult<Value>>>;

/// A composite request containing multiple subrequests.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    #[serde(rename = "collateSubrequests")]
    pub collate_subrequests: bool,
    #[serde(rename = "compositeRequest")]
    pub subrequests: Vec<CompositeSubrequest>,
}

/// A single subrequest within a composite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSubrequest {
    pub method: String,
    pub url: String,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Response from a composite request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeResponse {
    #[serde(rename = "compositeResponse")]
    pub responses: Vec<CompositeSubresponse>,
}

/// Response from a single subrequest.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeSubresponse {
    #[serde(default)]
    pub body: Value,
    #[serde(rename = "httpHeaders", default)]
    pub http_headers: Value,
    #[serde(rename = "httpStatusCode")]
    pub http_status_code: u16,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
}

impl CompositeRequest {
    /// Build an independent (`allOrNone: false`) batch of query sub-requests.
    ///
    /// `query_path` is the versioned query endpoint, e.g.
    /// `/services/data/v62.0/query`.
    pub fn queries(query_path: &str, queries: &[(String, String)]) -> Self {
        Self {
            all_or_none: false,
            collate_subrequests: false,
            subrequests: queries
                .iter()
                .map(|(name, soql)| CompositeSubrequest {
                    method: "GET".to_string(),
                    url: format!("{}?q={}", query_path, urlencoding::encode(soql)),
                    reference_id: name.clone(),
                    body: None,
                })
                .collect(),
        }
    }
}

/// Check every name against the reference id rule and for duplicates.
///
/// Runs before any network call.
pub fn validate_names(queries: &[(String, String)]) -> Result<()> {
    let mut seen = HashSet::with_capacity(queries.len());
    for (name, _) in queries {
        if !soql::is_safe_identifier(name) {
            return Err(Error::configuration(format!(
                "batch query name {:?} must match [A-Za-z][A-Za-z0-9_]*",
                name
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(Error::configuration(format!(
                "batch query name {:?} is used more than once",
                name
            )));
        }
    }
    Ok(())
}

/// Pair sub-responses with the names that were sent.
///
/// Every sent name gets exactly one entry. A name with no sub-response gets
/// an `Api` error with code `MISSING_SUBRESPONSE`; reference ids that were
/// not sent are ignored.
pub fn pair_responses(
    sent: &[(String, String)],
    response: CompositeResponse,
    results: &mut BatchResults,
) {
    let mut by_reference: BTreeMap<String, CompositeSubresponse> = BTreeMap::new();
    for sub in response.responses {
        if sent.iter().any(|(name, _)| *name == sub.reference_id) {
            by_reference.insert(sub.reference_id.clone(), sub);
        } else {
            warn!(reference_id = %sub.reference_id, "Ignoring unknown composite sub-response");
        }
    }

    for (name, _) in sent {
        let entry = match by_reference.remove(name) {
            Some(sub) => subresponse_result(sub),
            None => Err(Error::new(ErrorKind::Api {
                status: 200,
                error_code: "MISSING_SUBRESPONSE".to_string(),
                message: format!("composite response has no entry for {:?}", name),
            })),
        };
        results.insert(name.clone(), entry);
    }
}

/// Turn one sub-response into the result a standalone query would have had.
fn subresponse_result(sub: CompositeSubresponse) -> Result<QueryResult<Value>> {
    let status = sub.http_status_code;
    if !(200..300).contains(&status) {
        return Err(error_for(status, &sub.body, RequestPurpose::Query));
    }

    serde_json::from_value(sub.body).map_err(|e| {
        Error::with_source(
            ErrorKind::Api {
                status,
                error_code: "MALFORMED_RESPONSE".to_string(),
                message: format!("sub-response is not a query result: {}", e),
            },
            e,
        )
    })
}
