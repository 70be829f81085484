//! jsh-api: expose storage backends as JSON:API resources over axum
//!
//! A [`ResourceNode`] turns one resource type plus a set of storage
//! capabilities into a deterministic set of routes; nodes nest to form a
//! resource tree, and an [`Api`] merges every tree into one `axum::Router`.
//! Every response passes through the [`Dispatcher`], which classifies and
//! logs failures before encoding them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  jsh-api                     │
//! ├─────────────────────────────────────────────┤
//! │  registry.rs  - Top-level Api               │
//! │  resource/    - Resource nodes & tree       │
//! │  routes.rs    - Path composition, routes    │
//! │  dispatch/    - Dispatcher, sender, sink    │
//! │  extract.rs   - Request context extractor   │
//! │  middleware/  - Request id, logging, CORS   │
//! │  logging.rs   - Subscriber setup            │
//! │  testing.rs   - Mock storage, recording sink│
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use jsh_api::{Api, ResourceNode};
//! use jsh_storage::MemoryStore;
//!
//! let mut user = ResourceNode::new_crud("user", MemoryStore::new_shared("user"));
//! user.create_child("post")?
//!     .register_crud(MemoryStore::new_shared("post"))?;
//!
//! let mut api = Api::new("/api");
//! api.add(user)?;
//! println!("{}", api.route_tree());
//! let app = api.router();
//! ```

pub mod dispatch;
pub mod errors;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod registry;
pub mod resource;
pub mod routes;
pub mod testing;

pub use dispatch::{
    classify, classify_failure, Dispatcher, JsonApiSender, LogLevel, LogSink, SendError, Sender,
    Severity, TracingSink,
};
pub use errors::ResourceError;
pub use extract::RequestScope;
pub use logging::{init_logging, LoggingConfig};
pub use middleware::{cors_layer, RequestId, REQUEST_ID_HEADER};
pub use registry::{Api, DEFAULT_BODY_LIMIT};
pub use resource::{RelationshipKind, ResourceNode};
pub use routes::{id_matcher, join, matcher, normalize_prefix, pluralize};
