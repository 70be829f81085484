//! jsh-storage: Storage contract
//!
//! This crate defines what a backend must provide for a resource type to be
//! served, including:
//! - The five storage capabilities (`Save`, `Get`, `List`, `Update`, `Delete`)
//!   and their union `Crud`
//! - Handler contracts for custom actions and relationships
//! - An in-memory implementation for tests and demos
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               jsh-storage                    │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs   - Storage & handler contracts  │
//! │  error.rs    - Backend errors → failures    │
//! │  memory.rs   - In-memory implementation     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::StorageError;
pub use memory::MemoryStore;
pub use traits::{Action, Crud, Delete, Get, List, Save, StorageResult, ToMany, ToOne, Update};
