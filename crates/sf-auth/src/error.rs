//! Error types for sfq-auth.
//!
//! Error messages are designed to avoid exposing sensitive credential data.
//! At the [`sfq_client::TokenProvider`] seam every auth error becomes an
//! [`sfq_client::ErrorKind::Authentication`] or, for caller mistakes, an
//! [`sfq_client::ErrorKind::Configuration`].

/// Result type alias for sfq-auth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sfq-auth operations.
///
/// Error messages are sanitized to prevent accidental credential exposure.
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
}

/// The kind of error that occurred.
///
/// Error messages avoid including credential values.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// OAuth error response from Salesforce.
    #[error("OAuth error: {error} - {description}")]
    OAuth { error: String, description: String },

    /// The token endpoint answered 2xx without a usable grant.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Invalid credentials configuration.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// HTTP error during authentication.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Environment variable not set.
    #[error("Environment variable not set: {0}")]
    EnvVar(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::with_source(ErrorKind::Serialization(err.to_string()), err)
    }
}

impl From<sfq_client::Error> for Error {
    fn from(err: sfq_client::Error) -> Self {
        // Sanitize any potential credential exposure
        let message = err.to_string();
        let sanitized = if message.contains("Bearer") || message.contains("token=") {
            "Client error (details redacted for security)".to_string()
        } else {
            message
        };
        Error::with_source(ErrorKind::Http(sanitized), err)
    }
}

impl From<Error> for sfq_client::Error {
    fn from(err: Error) -> Self {
        let message = err.kind.to_string();
        let kind = match err.kind {
            ErrorKind::InvalidCredentials(_) | ErrorKind::EnvVar(_) | ErrorKind::InvalidInput(_) => {
                sfq_client::ErrorKind::Configuration(message)
            }
            _ => sfq_client::ErrorKind::Authentication(message),
        };
        sfq_client::Error::with_source(kind, err)
    }
}
