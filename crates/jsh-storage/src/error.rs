//! Storage error types.

use thiserror::Error;

use jsh_domain::{ErrorObject, Failure};

/// Errors raised inside a storage backend.
///
/// Backends convert these into a [`Failure`] at the contract boundary; the
/// HTTP status each variant maps to is fixed by the `From` impl below.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object not found.
    #[error("{object_type} not found: {id}")]
    NotFound { object_type: String, id: String },

    /// Object with this id already exists.
    #[error("{object_type} already exists: {id}")]
    AlreadyExists { object_type: String, id: String },

    /// Object type does not belong to this store.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Invalid input error.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Backend connection error.
    #[error("storage unavailable: {message}")]
    Unavailable { message: String },

    /// Backend did not answer in time.
    #[error("storage operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Internal error.
    #[error("internal storage error: {message}")]
    Internal { message: String },
}

impl From<StorageError> for ErrorObject {
    fn from(err: StorageError) -> Self {
        match &err {
            // 404 Not Found
            StorageError::NotFound { .. } => ErrorObject::not_found(err.to_string()),
            // 409 Conflict: duplicate id or a type this store does not hold
            StorageError::AlreadyExists { .. } | StorageError::TypeMismatch { .. } => {
                ErrorObject::conflict(err.to_string())
            }
            // 422 Unprocessable Entity
            StorageError::InvalidInput { message } => ErrorObject::unprocessable(message.clone()),
            // 503 Service Unavailable
            StorageError::Unavailable { .. } => {
                ErrorObject::service_unavailable("storage backend unavailable")
                    .with_internal(err.to_string())
            }
            // 504 Gateway Timeout
            StorageError::Timeout { .. } => {
                ErrorObject::timeout("storage operation timed out").with_internal(err.to_string())
            }
            StorageError::Internal { .. } => ErrorObject::internal(err.to_string()),
        }
    }
}

impl From<StorageError> for Failure {
    fn from(err: StorageError) -> Self {
        Failure::Single(err.into())
    }
}
