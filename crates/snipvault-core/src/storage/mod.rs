//! Storage backends and the uniform store contract
//!
//! Both engines implement [`SnippetStore`]; callers dispatch through
//! the trait instead of branching on a backend tag at every call site.

pub mod database;
pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::model::{Namespace, Snippet};

pub use database::{Database, DatabaseConfig, default_database_path};
pub use local::{LocalStore, StoreStats};
pub use remote::RemoteStore;

/// Uniform CRUD/query contract over the two storage mediums
///
/// Implementations do not enforce namespace invariants; those live in
/// [`crate::namespace::NamespaceManager`].
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// All snippets, most recently updated first
    async fn list_snippets(&self) -> Result<Vec<Snippet>>;

    /// A single snippet, `None` when the id does not exist
    async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>>;

    /// Store a new snippet
    async fn create_snippet(&self, snippet: &Snippet) -> Result<()>;

    /// Replace an existing snippet
    async fn update_snippet(&self, snippet: &Snippet) -> Result<()>;

    /// Remove a snippet
    async fn delete_snippet(&self, id: &str) -> Result<()>;

    /// Snippets belonging to one namespace, most recently updated first
    async fn list_snippets_in_namespace(&self, namespace_id: &str) -> Result<Vec<Snippet>>;

    /// All namespaces, default first, then by name
    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;

    /// Store a new namespace
    async fn create_namespace(&self, namespace: &Namespace) -> Result<()>;

    /// Remove a namespace row; the caller has already reassigned its snippets
    async fn remove_namespace(&self, id: &str) -> Result<()>;

    /// Move every snippet in one namespace to another, returning the count moved
    async fn reassign_namespace(&self, from: &str, to: &str) -> Result<u64>;

    /// Move the listed snippets to a target namespace; an empty list is a no-op
    async fn bulk_move_snippets(&self, ids: &[String], target_namespace_id: &str) -> Result<()>;

    /// Destroy all stored data and recreate an empty schema
    async fn wipe(&self) -> Result<()>;
}

/// Open the store selected by the given configuration
pub async fn active_store(config: &StorageConfig) -> Result<Arc<dyn SnippetStore>> {
    match &config.backend {
        StorageBackend::Local => {
            let store = LocalStore::open_default().await?;
            Ok(Arc::new(store))
        }
        StorageBackend::Remote { url } => {
            let store = RemoteStore::new(url)?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify trait is object-safe
    fn _assert_object_safe(_: &dyn SnippetStore) {}
}
