//! Error types for sfq-client.
//!
//! Every failure the request engine surfaces is one of the variants of
//! [`ErrorKind`]. Callers match on the kind rather than on message text.

use std::time::Duration;

/// Result type alias for sfq-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sfq-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for an [`ErrorKind::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration(message.into()))
    }

    /// Shorthand for an [`ErrorKind::Authentication`] error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication(message.into()))
    }

    /// Returns true if this error is a transient transport condition.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns true if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication(_))
    }

    /// Returns true for the HTTP family: status failures and transport failures.
    pub fn is_http(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Http { .. } | ErrorKind::Timeout | ErrorKind::Connection(_)
        )
    }

    /// Returns true if the platform rejected a query, including a query
    /// timeout.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Query { .. } | ErrorKind::QueryTimeout(_)
        )
    }

    /// Returns true if the platform answered with an error: any API, query,
    /// query timeout or row-level rejection.
    pub fn is_api_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Api { .. }
                | ErrorKind::Query { .. }
                | ErrorKind::QueryTimeout(_)
                | ErrorKind::Crud { .. }
        )
    }

    /// Returns true if the platform rejected a row-level mutation.
    pub fn is_crud_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Crud { .. })
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            ErrorKind::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The platform error code carried by this error, if any.
    pub fn error_code(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Api { error_code, .. }
            | ErrorKind::Query { error_code, .. }
            | ErrorKind::Crud { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Credential exchange failed, or re-authentication was exhausted.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// HTTP status failure after transient retries were exhausted.
    #[error("HTTP error: {status} {message}")]
    Http { status: u16, message: String },

    /// Request timeout.
    #[error("Request timeout")]
    Timeout,

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Well-formed but generic platform failure.
    #[error("Salesforce API error ({status}): {error_code} - {message}")]
    Api {
        status: u16,
        error_code: String,
        message: String,
    },

    /// The platform rejected a query (syntax or semantics).
    #[error("Query error: {error_code} - {message}")]
    Query { error_code: String, message: String },

    /// The query exceeded the platform's execution budget.
    #[error("Query timeout: {0}")]
    QueryTimeout(String),

    /// Row-level mutation rejection.
    #[error("CRUD error: {error_code} - {message}")]
    Crud {
        error_code: String,
        message: String,
        fields: Vec<String>,
    },

    /// Invalid caller-supplied configuration, detected before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    /// Returns true if this error kind is a transient transport condition.
    ///
    /// Status-based transience is decided by the classification table, not
    /// here; by the time an `Http` error exists its retries are spent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Connection(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Connection(err.to_string())
        } else if let Some(status) = err.status() {
            ErrorKind::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(
            ErrorKind::Configuration(format!("Invalid URL: {}", err)),
            err,
        )
    }
}

/// Parse a `Retry-After` header value given in seconds.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
