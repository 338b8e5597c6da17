//! Platform event names and the describe-global shapes used to list them.

use serde::Deserialize;

/// Suffix the platform gives every platform event SObject.
pub const EVENT_SUFFIX: &str = "__e";

/// Response of `GET /sobjects`, reduced to what event listing needs.
#[derive(Debug, Clone, Deserialize)]
pub struct DescribeGlobalResult {
    #[serde(rename = "maxBatchSize", default)]
    pub max_batch_size: Option<u32>,
    #[serde(default)]
    pub sobjects: Vec<SObjectBasicInfo>,
}

/// Basic information about an SObject from describe global.
#[derive(Debug, Clone, Deserialize)]
pub struct SObjectBasicInfo {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub custom: bool,
}

impl DescribeGlobalResult {
    /// Names of the platform events in the org, in describe order.
    pub fn event_names(&self) -> Vec<String> {
        self.sobjects
            .iter()
            .filter(|s| is_event_name(&s.name))
            .map(|s| s.name.clone())
            .collect()
    }
}

/// True when `name` looks like a platform event API name.
pub fn is_event_name(name: &str) -> bool {
    name.len() > EVENT_SUFFIX.len() && name.ends_with(EVENT_SUFFIX)
}
