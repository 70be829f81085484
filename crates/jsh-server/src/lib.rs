//! jsh-server: configuration and bootstrap for a standalone JSON:API server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 jsh-server                   │
//! ├─────────────────────────────────────────────┤
//! │  config.rs     - Layered configuration      │
//! │  bootstrap.rs  - Api + HTTP app from config │
//! │  main.rs       - CLI, graceful shutdown     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod bootstrap;
pub mod config;

pub use bootstrap::{app, build_api};
pub use config::{ConfigLoadError, ResourceSettings, ServerConfig};
