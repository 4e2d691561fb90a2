//! Namespace management
//!
//! Single entry point for namespace mutations regardless of the active
//! backend. The namespace invariants live here, in neither backend:
//! exactly one default namespace exists after initialization, the
//! default namespace is never deletable, and deleting any other
//! namespace reassigns its snippets to the default before the row
//! disappears.

use std::sync::Arc;

use tracing::info;

use crate::error::{Error, Result};
use crate::model::{DEFAULT_NAMESPACE_ID, Namespace};
use crate::storage::SnippetStore;

/// Namespace invariants and selection state over the active backend
pub struct NamespaceManager {
    store: Arc<dyn SnippetStore>,
    selected: Option<String>,
}

impl NamespaceManager {
    /// Create a manager over the active store; nothing is selected yet
    pub fn new(store: Arc<dyn SnippetStore>) -> Self {
        Self {
            store,
            selected: None,
        }
    }

    /// The store this manager delegates to
    pub fn store(&self) -> &Arc<dyn SnippetStore> {
        &self.store
    }

    /// The currently selected namespace id, if any
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a namespace explicitly
    pub fn select(&mut self, id: impl Into<String>) {
        self.selected = Some(id.into());
    }

    /// Guarantee a default namespace exists, returning it
    ///
    /// Creates the well-known `default` namespace when no namespace is
    /// marked default. Selection lands on the default when nothing was
    /// selected before.
    pub async fn ensure_default(&mut self) -> Result<Namespace> {
        let namespaces = self.store.list_namespaces().await?;
        let default = match namespaces.into_iter().find(|n| n.is_default) {
            Some(existing) => existing,
            None => {
                let created = Namespace::default_namespace();
                self.store.create_namespace(&created).await?;
                info!(id = %created.id, "created default namespace");
                created
            }
        };
        if self.selected.is_none() {
            self.selected = Some(default.id.clone());
        }
        Ok(default)
    }

    /// List namespaces from the active backend
    pub async fn list(&self) -> Result<Vec<Namespace>> {
        self.store.list_namespaces().await
    }

    /// Create a new non-default namespace and select it
    pub async fn create(&mut self, name: &str) -> Result<Namespace> {
        let namespace = Namespace::new(name);
        self.store.create_namespace(&namespace).await?;
        self.selected = Some(namespace.id.clone());
        Ok(namespace)
    }

    /// Delete a namespace, cascading snippet reassignment
    ///
    /// Rejects the default namespace with state unchanged. For any
    /// other namespace, every owned snippet is reassigned to the
    /// default namespace first, so a snippet can never point at a
    /// deleted namespace. Selection falls back to the default, else an
    /// arbitrary remaining namespace, else none.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let namespaces = self.store.list_namespaces().await?;
        let target = namespaces
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::NamespaceNotFound(id.to_string()))?;
        if target.is_default {
            return Err(Error::DefaultNamespaceProtected);
        }

        let default_id = namespaces
            .iter()
            .find(|n| n.is_default)
            .map(|n| n.id.as_str())
            .unwrap_or(DEFAULT_NAMESPACE_ID);

        let moved = self.store.reassign_namespace(id, default_id).await?;
        self.store.remove_namespace(id).await?;
        info!(namespace = id, snippets_moved = moved, "deleted namespace");

        if self.selected.as_deref() == Some(id) {
            // Listing is default-first, so the fallback order is
            // default, then any remaining namespace, then none
            let remaining = self.store.list_namespaces().await?;
            self.selected = remaining.first().map(|n| n.id.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Snippet;
    use crate::storage::local::LocalStore;

    async fn manager() -> NamespaceManager {
        let store = LocalStore::in_memory().await.unwrap();
        NamespaceManager::new(Arc::new(store))
    }

    #[tokio::test]
    async fn fresh_store_gets_exactly_one_default_namespace() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();

        let namespaces = manager.list().await.unwrap();
        assert_eq!(namespaces.len(), 1);
        assert_eq!(namespaces[0].name, "Default");
        assert_eq!(namespaces[0].id, DEFAULT_NAMESPACE_ID);
        assert!(namespaces[0].is_default);
        assert_eq!(manager.selected(), Some(DEFAULT_NAMESPACE_ID));
    }

    #[tokio::test]
    async fn ensure_default_is_idempotent() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();
        manager.ensure_default().await.unwrap();

        let defaults: Vec<_> = manager
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|n| n.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
    }

    #[tokio::test]
    async fn deleting_default_namespace_is_rejected_and_state_unchanged() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();

        let err = manager.delete(DEFAULT_NAMESPACE_ID).await.unwrap_err();
        assert!(matches!(err, Error::DefaultNamespaceProtected));
        assert_eq!(manager.list().await.unwrap().len(), 1);
        assert_eq!(manager.selected(), Some(DEFAULT_NAMESPACE_ID));
    }

    #[tokio::test]
    async fn deleting_missing_namespace_reports_not_found() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();
        assert!(matches!(
            manager.delete("ghost").await,
            Err(Error::NamespaceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_namespace_reassigns_its_snippets_to_default() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();
        let work = manager.create("Work").await.unwrap();

        let a = Snippet::new("A", "a()", "js", &work.id);
        let b = Snippet::new("B", "b()", "js", &work.id);
        manager.store().create_snippet(&a).await.unwrap();
        manager.store().create_snippet(&b).await.unwrap();

        manager.delete(&work.id).await.unwrap();

        let names: Vec<_> = manager
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["Default"]);

        for id in [&a.id, &b.id] {
            let snippet = manager.store().get_snippet(id).await.unwrap().unwrap();
            assert_eq!(snippet.namespace_id, DEFAULT_NAMESPACE_ID);
        }
    }

    #[tokio::test]
    async fn selection_falls_back_to_default_when_selected_is_deleted() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();
        let work = manager.create("Work").await.unwrap();
        assert_eq!(manager.selected(), Some(work.id.as_str()));

        manager.delete(&work.id).await.unwrap();
        assert_eq!(manager.selected(), Some(DEFAULT_NAMESPACE_ID));
    }

    #[tokio::test]
    async fn selection_survives_deleting_an_unselected_namespace() {
        let mut manager = manager().await;
        manager.ensure_default().await.unwrap();
        let work = manager.create("Work").await.unwrap();
        manager.select(DEFAULT_NAMESPACE_ID);

        manager.delete(&work.id).await.unwrap();
        assert_eq!(manager.selected(), Some(DEFAULT_NAMESPACE_ID));
    }
}
