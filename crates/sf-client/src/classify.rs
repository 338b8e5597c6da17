//! Response classification.
//!
//! Every response the engine receives is evaluated once against [`RULES`], an
//! ordered table of `(name, predicate, outcome)` rows. The first matching row
//! decides what happens next: hand the body to the caller, re-authenticate,
//! back off and retry, or fail with a specific [`ErrorKind`].
//!
//! The same table classifies composite sub-responses, so a failing entry in
//! a batch carries exactly the error kind a standalone call would have.

use regex_lite::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, ErrorKind};
use crate::request::RequestPurpose;

/// What the engine does with a response.
#[derive(Debug)]
pub enum Disposition {
    /// 2xx: return the body to the caller.
    Success,
    /// The access token was rejected; invalidate and retry once.
    SessionExpired,
    /// Transient server condition; back off and retry.
    Transient { retry_after: Option<Duration> },
    /// Non-retryable failure of a specific kind.
    Fatal(Error),
}

/// Error detail extracted from a platform error body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlatformError {
    pub error_code: String,
    pub message: String,
    pub fields: Vec<String>,
}

/// The parts of a response the rules look at.
#[derive(Debug)]
pub struct ResponseShape<'a> {
    pub status: u16,
    pub purpose: RequestPurpose,
    pub error: Option<PlatformError>,
    pub raw_body: &'a str,
}

impl ResponseShape<'_> {
    fn code(&self) -> &str {
        self.error.as_ref().map(|e| e.error_code.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    SessionExpired,
    Transient,
    QueryTimeout,
    Query,
    Crud,
    Api,
}

struct Rule {
    name: &'static str,
    when: fn(&ResponseShape<'_>) -> bool,
    outcome: Outcome,
}

const QUERY_CODES: &[&str] = &[
    "MALFORMED_QUERY",
    "MALFORMED_SEARCH",
    "INVALID_QUERY_FILTER_OPERATOR",
    "INVALID_QUERY_LOCATOR",
    "QUERY_TOO_COMPLICATED",
    "INVALID_SEARCH",
];

const CRUD_CODES: &[&str] = &[
    "REQUIRED_FIELD_MISSING",
    "FIELD_CUSTOM_VALIDATION_EXCEPTION",
    "FIELD_INTEGRITY_EXCEPTION",
    "DUPLICATE_VALUE",
    "DUPLICATES_DETECTED",
    "ENTITY_IS_DELETED",
    "ENTITY_IS_LOCKED",
    "INVALID_CROSS_REFERENCE_KEY",
    "INVALID_FIELD_FOR_INSERT_UPDATE",
    "INVALID_ID_FIELD",
    "MALFORMED_ID",
    "STRING_TOO_LONG",
    "CANNOT_INSERT_UPDATE_ACTIVATE_ENTITY",
    "DELETE_FAILED",
    "UNABLE_TO_LOCK_ROW",
    "INSUFFICIENT_ACCESS_ON_CROSS_REFERENCE_ENTITY",
];

/// The classification table. Order matters: first match wins.
const RULES: &[Rule] = &[
    Rule {
        name: "unauthorized-status",
        when: |s| s.status == 401,
        outcome: Outcome::SessionExpired,
    },
    Rule {
        name: "invalid-session-code",
        when: |s| s.code() == "INVALID_SESSION_ID",
        outcome: Outcome::SessionExpired,
    },
    Rule {
        name: "success",
        when: |s| (200..300).contains(&s.status),
        outcome: Outcome::Success,
    },
    Rule {
        name: "query-timeout-code",
        when: |s| s.code() == "QUERY_TIMEOUT",
        outcome: Outcome::QueryTimeout,
    },
    Rule {
        name: "rate-limited",
        when: |s| s.status == 429,
        outcome: Outcome::Transient,
    },
    Rule {
        name: "server-error",
        when: |s| (500..600).contains(&s.status),
        outcome: Outcome::Transient,
    },
    Rule {
        name: "query-code",
        when: |s| QUERY_CODES.iter().any(|c| *c == s.code()),
        outcome: Outcome::Query,
    },
    Rule {
        name: "query-rejected",
        when: |s| s.purpose == RequestPurpose::Query && s.status == 400,
        outcome: Outcome::Query,
    },
    Rule {
        name: "crud-code",
        when: |s| CRUD_CODES.iter().any(|c| *c == s.code()),
        outcome: Outcome::Crud,
    },
    Rule {
        name: "mutation-rejected",
        when: |s| s.purpose == RequestPurpose::Mutation && s.status == 400,
        outcome: Outcome::Crud,
    },
    Rule {
        name: "fallback",
        when: |_| true,
        outcome: Outcome::Api,
    },
];

fn evaluate(shape: &ResponseShape<'_>) -> Outcome {
    for rule in RULES {
        if (rule.when)(shape) {
            debug!(rule = rule.name, status = shape.status, "Response classified");
            return rule.outcome;
        }
    }
    Outcome::Api
}

/// Classify a raw response for the engine.
pub fn classify(
    status: u16,
    body: &[u8],
    retry_after: Option<Duration>,
    purpose: RequestPurpose,
) -> Disposition {
    let raw_body = String::from_utf8_lossy(body);
    let error = if (200..300).contains(&status) {
        None
    } else {
        serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| platform_error(&v))
    };

    let shape = ResponseShape {
        status,
        purpose,
        error,
        raw_body: &raw_body,
    };

    match evaluate(&shape) {
        Outcome::Success => Disposition::Success,
        Outcome::SessionExpired => Disposition::SessionExpired,
        Outcome::Transient => Disposition::Transient { retry_after },
        outcome => Disposition::Fatal(fatal_error(outcome, &shape)),
    }
}

/// Turn a non-success status and JSON body into the error a standalone call
/// would have produced. Used for composite sub-responses and collection rows,
/// where nothing is retried.
pub fn error_for(status: u16, body: &serde_json::Value, purpose: RequestPurpose) -> Error {
    let raw_body = body.to_string();
    let shape = ResponseShape {
        status,
        purpose,
        error: platform_error(body),
        raw_body: &raw_body,
    };

    match evaluate(&shape) {
        Outcome::SessionExpired => Error::authentication(format!(
            "sub-request rejected the session: {}",
            message_of(&shape)
        )),
        Outcome::Transient => Error::new(ErrorKind::Http {
            status,
            message: message_of(&shape),
        }),
        // A 2xx reaching here has an error body, e.g. a collection row.
        Outcome::Success => fatal_error(
            if purpose == RequestPurpose::Mutation {
                Outcome::Crud
            } else {
                Outcome::Api
            },
            &shape,
        ),
        outcome => fatal_error(outcome, &shape),
    }
}

fn fatal_error(outcome: Outcome, shape: &ResponseShape<'_>) -> Error {
    let detail = shape.error.clone().unwrap_or_default();
    let message = message_of(shape);
    let error_code = if detail.error_code.is_empty() {
        status_error_code(shape.status).to_string()
    } else {
        detail.error_code
    };

    let kind = match outcome {
        Outcome::QueryTimeout => ErrorKind::QueryTimeout(message),
        Outcome::Query => ErrorKind::Query {
            error_code,
            message,
        },
        Outcome::Crud => ErrorKind::Crud {
            error_code,
            message,
            fields: detail.fields,
        },
        _ => ErrorKind::Api {
            status: shape.status,
            error_code,
            message,
        },
    };
    Error::new(kind)
}

fn message_of(shape: &ResponseShape<'_>) -> String {
    match &shape.error {
        Some(err) if !err.message.is_empty() => sanitize_error_message(&err.message),
        _ => sanitize_error_message(shape.raw_body),
    }
}

fn status_error_code(status: u16) -> &'static str {
    match status {
        400 => "BAD_REQUEST",
        403 => "FORBIDDEN",
        404 => "NOT_FOUND",
        405 => "METHOD_NOT_ALLOWED",
        409 => "CONFLICT",
        415 => "UNSUPPORTED_MEDIA_TYPE",
        _ => "UNKNOWN_ERROR",
    }
}

#[derive(Debug, Deserialize)]
struct SalesforceErrorResponse {
    #[serde(alias = "errorCode", alias = "statusCode")]
    error_code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    fields: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct OAuthStyleError {
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Extract the first platform error from an error body.
///
/// Understands the REST array format `[{errorCode, message, fields}]`, a
/// single error object, collection rows `{success:false, errors:[...]}`, and
/// OAuth-style `{error, error_description}`.
pub fn platform_error(body: &serde_json::Value) -> Option<PlatformError> {
    let candidate = match body {
        serde_json::Value::Array(items) => items.first()?,
        serde_json::Value::Object(map) => match map.get("errors") {
            Some(serde_json::Value::Array(errors)) if !errors.is_empty() => &errors[0],
            _ => body,
        },
        _ => return None,
    };

    if let Ok(err) = SalesforceErrorResponse::deserialize(candidate) {
        return Some(PlatformError {
            error_code: err.error_code,
            message: err.message,
            fields: err.fields.unwrap_or_default(),
        });
    }

    OAuthStyleError::deserialize(candidate)
        .ok()
        .map(|err| PlatformError {
            error_code: err.error.to_ascii_uppercase(),
            message: err.error_description,
            fields: Vec::new(),
        })
}

static TOKEN_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"00[A-Za-z0-9]{13,}[!][A-Za-z0-9_.]+").ok());

static SESSION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"sid=[A-Za-z0-9]{20,}").ok());

/// Sanitize an error message before it enters an error value.
///
/// Redacts anything shaped like an access token or a session id and
/// truncates to 500 characters.
pub fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();

    if let Some(pattern) = TOKEN_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "[REDACTED_TOKEN]")
            .into_owned();
    }
    if let Some(pattern) = SESSION_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "sid=[REDACTED]")
            .into_owned();
    }

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
