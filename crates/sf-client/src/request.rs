//! HTTP request description.
//!
//! A [`RequestBuilder`] is plain data: the engine may replay it for the
//! re-authentication retry and for transient retries, so it is `Clone` and
//! carries no credential. The bearer token is attached per attempt.

use serde::Serialize;
use std::time::Duration;

use crate::error::Result;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl RequestMethod {
    /// Convert to reqwest::Method.
    pub fn to_reqwest(&self) -> reqwest::Method {
        match self {
            RequestMethod::Get => reqwest::Method::GET,
            RequestMethod::Post => reqwest::Method::POST,
            RequestMethod::Patch => reqwest::Method::PATCH,
            RequestMethod::Put => reqwest::Method::PUT,
            RequestMethod::Delete => reqwest::Method::DELETE,
        }
    }

    /// Wire name, as used inside composite sub-requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Put => "PUT",
            RequestMethod::Delete => "DELETE",
        }
    }
}

/// What a request does, used to pick the most specific error kind when the
/// platform rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPurpose {
    #[default]
    Generic,
    Query,
    Mutation,
}

/// Request body content.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Description of one logical HTTP call.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub(crate) method: RequestMethod,
    /// Either a path relative to the instance URL or an absolute URL.
    pub(crate) target: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) body: Option<RequestBody>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) purpose: RequestPurpose,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(method: RequestMethod, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            body: None,
            timeout: None,
            purpose: RequestPurpose::Generic,
        }
    }

    /// GET request.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, target)
    }

    /// POST request.
    pub fn post(target: impl Into<String>) -> Self {
        Self::new(RequestMethod::Post, target)
    }

    /// PATCH request.
    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(RequestMethod::Patch, target)
    }

    /// DELETE request.
    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(RequestMethod::Delete, target)
    }

    /// Add a caller-scoped header. A later value for the same name wins.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Set JSON body from a serializable value.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)?;
        Ok(self.json_value(value))
    }

    /// Set raw JSON body.
    pub fn json_value(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set form body.
    pub fn form(mut self, data: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(data));
        self
    }

    /// Override the client-wide timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Tag the request with its purpose for error classification.
    pub fn purpose(mut self, purpose: RequestPurpose) -> Self {
        self.purpose = purpose;
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> RequestMethod {
        self.method
    }

    /// The path or URL this request targets.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The request's classification purpose.
    pub fn request_purpose(&self) -> RequestPurpose {
        self.purpose
    }

    /// Resolve the target against an instance URL.
    ///
    /// Absolute URLs pass through unchanged.
    pub fn resolve_url(&self, instance_url: &str) -> String {
        let target = self.target.as_str();
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            let base = instance_url.trim_end_matches('/');
            if target.starts_with('/') {
                format!("{}{}", base, target)
            } else {
                format!("{}/{}", base, target)
            }
        }
    }
}
