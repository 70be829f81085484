//! Registration errors.

use axum::http::Method;
use thiserror::Error;

/// Errors raised while building a resource tree.
///
/// All of these are setup-time mistakes; none can occur while serving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The same method and pattern are already bound on this node.
    #[error("route already registered: {method} - {pattern}")]
    DuplicateRoute { method: Method, pattern: String },

    /// An action, relationship, child or custom route already occupies this
    /// path segment below the node's identifier.
    #[error("'{segment}' is already used by {existing} on resource '{resource_type}'")]
    NameCollision {
        resource_type: String,
        segment: String,
        existing: String,
    },

    /// A name is empty or contains path syntax.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// Checks that `name` can be used as a literal path segment.
pub(crate) fn validate_name(name: &str) -> Result<(), ResourceError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.contains('/') {
        Some("must not contain '/'")
    } else if name.contains(':') || name.contains('*') {
        Some("must not contain path parameters or wildcards")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ResourceError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
