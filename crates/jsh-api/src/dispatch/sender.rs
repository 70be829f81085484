//! Response encoding.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use jsh_domain::{encode, EncodeError, Sendable, MEDIA_TYPE};
use thiserror::Error;

/// Failure while turning a [`Sendable`] into a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SendError {
    /// Status class of the failure itself; encoding faults are `500`.
    pub status: u16,
    pub message: String,
}

impl SendError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: message.into(),
        }
    }
}

impl From<EncodeError> for SendError {
    fn from(err: EncodeError) -> Self {
        Self {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

/// Turns a sendable into an HTTP response.
///
/// Swapped out through [`Dispatcher::with_sender`](super::Dispatcher::with_sender)
/// to change the wire format of every resource at once.
pub trait Sender: Send + Sync + 'static {
    fn encode(&self, sendable: &Sendable, status: u16) -> Result<Response, SendError>;
}

/// JSON:API sender built on the document codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonApiSender;

impl Sender for JsonApiSender {
    fn encode(&self, sendable: &Sendable, status: u16) -> Result<Response, SendError> {
        let encoded = encode(sendable, status)?;
        let status = StatusCode::from_u16(encoded.status)
            .map_err(|e| SendError::internal(format!("invalid response status: {e}")))?;

        let mut builder = Response::builder().status(status);
        if !encoded.body.is_empty() {
            builder = builder.header(CONTENT_TYPE, MEDIA_TYPE);
        }
        builder
            .body(Body::from(encoded.body))
            .map_err(|e| SendError::internal(format!("failed to build response: {e}")))
    }
}

const INTERNAL_ERROR_DOCUMENT: &str = concat!(
    r#"{"jsonapi":{"version":"1.0"},"errors":[{"status":"500","code":"internal_error","#,
    r#""title":"Internal Server Error","detail":"internal server error"}]}"#
);

/// Static `500` document written when the sender itself fails.
pub(crate) fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, MEDIA_TYPE)],
        INTERNAL_ERROR_DOCUMENT,
    )
        .into_response()
}
