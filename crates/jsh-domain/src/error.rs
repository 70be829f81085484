//! JSON:API error objects and typed failures.
//!
//! Every failure that leaves a storage backend or the dispatcher is an
//! [`ErrorObject`] (or an ordered list of them, see [`Failure`]). The HTTP
//! status travels with the error so that the response status and the log
//! severity can both be derived from it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error codes carried in the `code` member of an error object.
pub mod error_codes {
    /// Request body is not a valid JSON:API document.
    pub const INVALID_DOCUMENT: &str = "invalid_document";
    /// Request was well formed but semantically invalid.
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// Resource with the given id does not exist.
    pub const NOT_FOUND: &str = "not_found";
    /// Path exists but does not accept the request method.
    pub const METHOD_NOT_ALLOWED: &str = "method_not_allowed";
    /// Resource type or id conflicts with the target endpoint or existing data.
    pub const CONFLICT: &str = "conflict";
    /// Unexpected internal error.
    pub const INTERNAL_ERROR: &str = "internal_error";
    /// Backend temporarily unavailable.
    pub const SERVICE_UNAVAILABLE: &str = "service_unavailable";
    /// Backend did not answer in time.
    pub const TIMEOUT: &str = "timeout";
}

/// Pointer to the part of the request that caused an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A single JSON:API error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(with = "status_string")]
    pub status: u16,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,

    /// Diagnostic detail for logs. Never serialized to the client.
    #[serde(skip)]
    pub internal: Option<String>,
}

impl ErrorObject {
    pub fn new(status: u16, code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            title: default_title(status).to_string(),
            detail: detail.into(),
            source: None,
            internal: None,
        }
    }

    /// Creates an invalid document error (400).
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, error_codes::INVALID_DOCUMENT, detail)
    }

    /// Creates a not found error (404).
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, error_codes::NOT_FOUND, detail)
    }

    /// Creates a conflict error (409).
    pub fn method_not_allowed(detail: impl Into<String>) -> Self {
        Self::new(405, error_codes::METHOD_NOT_ALLOWED, detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(409, error_codes::CONFLICT, detail)
    }

    /// Creates a validation error (422).
    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(422, error_codes::VALIDATION_ERROR, detail)
    }

    /// Creates an internal error (500).
    ///
    /// The client only sees a generic message; `internal` is kept for logs.
    pub fn internal(internal: impl Into<String>) -> Self {
        Self::new(500, error_codes::INTERNAL_ERROR, "internal server error")
            .with_internal(internal)
    }

    /// Creates a service unavailable error (503).
    pub fn service_unavailable(detail: impl Into<String>) -> Self {
        Self::new(503, error_codes::SERVICE_UNAVAILABLE, detail)
    }

    /// Creates a gateway timeout error (504).
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(504, error_codes::TIMEOUT, detail)
    }

    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal = Some(internal.into());
        self
    }

    pub fn with_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(pointer.into()),
            parameter: None,
        });
        self
    }

    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: None,
            parameter: Some(parameter.into()),
        });
        self
    }

    /// Text used for log entries: the internal diagnostic when present,
    /// the client-facing detail otherwise.
    pub fn diagnostic(&self) -> &str {
        self.internal.as_deref().unwrap_or(&self.detail)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.title, self.diagnostic())
    }
}

impl std::error::Error for ErrorObject {}

fn default_title(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// A failure returned by a storage operation or produced while dispatching.
///
/// `List` is never empty when built through [`Failure::from_errors`].
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    Single(ErrorObject),
    List(Vec<ErrorObject>),
}

impl Failure {
    /// Builds a failure from a list of errors. Returns `None` for an empty list.
    pub fn from_errors(mut errors: Vec<ErrorObject>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop().map(Failure::Single),
            _ => Some(Failure::List(errors)),
        }
    }

    /// All errors, in order.
    pub fn errors(&self) -> &[ErrorObject] {
        match self {
            Failure::Single(error) => std::slice::from_ref(error),
            Failure::List(errors) => errors,
        }
    }

    /// The response status: the status of the first (leading) error.
    pub fn status(&self) -> u16 {
        self.errors().first().map_or(500, |e| e.status)
    }

    /// The highest status in the list.
    pub fn max_status(&self) -> u16 {
        self.errors().iter().map(|e| e.status).max().unwrap_or(500)
    }
}

impl From<ErrorObject> for Failure {
    fn from(error: ErrorObject) -> Self {
        Failure::Single(error)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in self.errors() {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

/// JSON:API encodes `status` as a string.
mod status_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(status: &u16, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(status)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
