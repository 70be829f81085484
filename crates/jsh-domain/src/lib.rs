//! jsh-domain: JSON:API document model
//!
//! This crate holds the types that flow between the dispatch layer and a
//! storage backend:
//! - `Object` / `List` resource objects
//! - `ErrorObject` / `Failure` typed failures carrying an HTTP status
//! - The document codec (`decode_object`, `encode`)
//! - `RequestContext`, the request-scoped context handed to storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                jsh-domain                    │
//! ├─────────────────────────────────────────────┤
//! │  object.rs   - Resource objects             │
//! │  error.rs    - Error objects & failures     │
//! │  document.rs - Top-level document codec     │
//! │  context.rs  - Request context & cancel     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod context;
pub mod document;
pub mod error;
pub mod object;

pub use context::{CancelGuard, RequestContext};
pub use document::{
    decode_object, encode, Data, Document, EncodeError, EncodedDocument, Sendable, MEDIA_TYPE,
};
pub use error::{error_codes, ErrorObject, ErrorSource, Failure};
pub use object::{List, Object};
