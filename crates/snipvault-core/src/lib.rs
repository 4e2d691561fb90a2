//! Snipvault Core Library
//!
//! Persistence and storage abstraction for the snippet manager:
//! - Backend-neutral snippet and namespace records
//! - Record mapping to SQLite rows and REST/JSON wire shapes
//! - Local storage engine (embedded SQLite) and remote storage adapter (REST)
//! - Namespace invariants and selection fallback
//! - Schema health checks, destructive repair, and backend migration

pub mod config;
pub mod error;
pub mod health;
pub mod mapper;
pub mod model;
pub mod namespace;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigStore, StorageBackend, StorageConfig};
    pub use crate::error::{Error, Result};
    pub use crate::model::{Namespace, Snippet};
    pub use crate::namespace::NamespaceManager;
    pub use crate::storage::{SnippetStore, local::LocalStore, remote::RemoteStore};
}
