//! Schema health and backend migration
//!
//! Operator-triggered procedures, separate from the per-request path:
//! validating the local schema against the namespace-aware shape,
//! destructive repair, and one-shot bulk migration between backends.

use tracing::{error, info, warn};

use crate::config::{ConfigStore, StorageConfig};
use crate::error::{Error, Result};
use crate::storage::SnippetStore;
use crate::storage::local::LocalStore;
use crate::storage::remote::RemoteStore;

/// Tables and columns the local engine must carry
const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("namespaces", &["id", "name", "created_at", "is_default"]),
    (
        "snippets",
        &[
            "id",
            "title",
            "description",
            "code",
            "language",
            "category",
            "namespace_id",
            "tags",
            "has_preview",
            "function_name",
            "input_parameters",
            "is_template",
            "created_at",
            "updated_at",
        ],
    ),
];

/// Result of a schema validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaHealth {
    /// No validation has run yet
    Unknown,
    Healthy,
    Corrupted(String),
}

impl SchemaHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for SchemaHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Healthy => write!(f, "healthy"),
            Self::Corrupted(reason) => write!(f, "corrupted: {reason}"),
        }
    }
}

/// Outcome of a bulk migration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    /// Snippets written to the destination
    pub migrated: usize,
    /// Snippets read from the source
    pub total: usize,
}

/// Validate the local engine's schema against the required shape
///
/// A schema drifted by an older application version stays connectable,
/// so drift surfaces here and nowhere else. Any missing table or
/// column yields `Corrupted` with the first mismatch named.
pub async fn validate_schema(store: &LocalStore) -> Result<SchemaHealth> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        if !store.table_exists(table).await? {
            return Ok(SchemaHealth::Corrupted(format!("missing table '{table}'")));
        }
        let columns = store.table_columns(table).await?;
        for column in *required_columns {
            if !columns.iter().any(|c| c == column) {
                return Ok(SchemaHealth::Corrupted(format!(
                    "table '{table}' is missing column '{column}'"
                )));
            }
        }
    }
    Ok(SchemaHealth::Healthy)
}

/// Destructively repair a corrupted local schema
///
/// Drops and recreates the empty schema; all stored data is lost. The
/// caller must pass `confirm = true`, standing in for an explicit
/// operator confirmation.
pub async fn repair_schema(store: &LocalStore, confirm: bool) -> Result<()> {
    if !confirm {
        return Err(Error::ConfirmationRequired);
    }
    warn!("repairing local schema: all local data will be destroyed");
    store.wipe().await
}

/// One-shot bulk migration from the local engine to the remote service
///
/// Reads every local snippet, creates each individually against the
/// remote adapter, then persists `backend = remote`. Non-transactional:
/// a failure partway aborts, leaving whatever was already created on
/// the destination, and a re-run writes duplicates.
pub async fn migrate_local_to_remote(
    local: &LocalStore,
    remote: &RemoteStore,
    config_store: &ConfigStore,
) -> Result<MigrationReport> {
    let snippets = local.list_snippets().await?;
    let total = snippets.len();

    for (done, snippet) in snippets.iter().enumerate() {
        if let Err(e) = remote.create_snippet(snippet).await {
            error!(migrated = done, total, error = %e, "migration to remote aborted");
            return Err(e);
        }
    }

    config_store.save(&StorageConfig::remote(remote.base_url()))?;
    info!(migrated = total, "migrated local store to remote backend");
    Ok(MigrationReport {
        migrated: total,
        total,
    })
}

/// One-shot switch from the remote service back to the local engine
///
/// Reads every remote snippet as proof the service is reachable, then
/// persists `backend = local`. The fetched rows are not written into
/// the local engine; the switch lands on whatever the local store
/// already holds, and callers wanting a true copy must create the
/// rows themselves.
pub async fn migrate_remote_to_local(
    remote: &RemoteStore,
    config_store: &ConfigStore,
) -> Result<MigrationReport> {
    let snippets = remote.list_snippets().await?;
    config_store.save(&StorageConfig::default())?;
    info!(fetched = snippets.len(), "switched to local backend");
    Ok(MigrationReport {
        migrated: 0,
        total: snippets.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Namespace, Snippet};

    #[tokio::test]
    async fn fresh_schema_is_healthy() {
        let store = LocalStore::in_memory().await.unwrap();
        assert_eq!(validate_schema(&store).await.unwrap(), SchemaHealth::Healthy);
    }

    #[tokio::test]
    async fn missing_namespaces_table_is_corrupted() {
        let store = LocalStore::in_memory().await.unwrap();
        sqlx::raw_sql("DROP TABLE namespaces")
            .execute(store.database().pool())
            .await
            .unwrap();

        let health = validate_schema(&store).await.unwrap();
        assert_eq!(
            health,
            SchemaHealth::Corrupted("missing table 'namespaces'".to_string())
        );
    }

    #[tokio::test]
    async fn missing_namespace_column_is_corrupted() {
        let store = LocalStore::in_memory().await.unwrap();
        // Simulate a store created before namespace support
        sqlx::raw_sql(
            "DROP TABLE snippets;
             CREATE TABLE snippets (
                id TEXT PRIMARY KEY NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                code TEXT NOT NULL,
                language TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT 'general',
                tags TEXT NOT NULL DEFAULT '[]',
                has_preview INTEGER NOT NULL DEFAULT 0,
                function_name TEXT,
                input_parameters TEXT,
                is_template INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
             );",
        )
        .execute(store.database().pool())
        .await
        .unwrap();

        let health = validate_schema(&store).await.unwrap();
        assert_eq!(
            health,
            SchemaHealth::Corrupted(
                "table 'snippets' is missing column 'namespace_id'".to_string()
            )
        );
    }

    #[tokio::test]
    async fn repair_requires_confirmation() {
        let store = LocalStore::in_memory().await.unwrap();
        assert!(matches!(
            repair_schema(&store, false).await,
            Err(Error::ConfirmationRequired)
        ));
    }

    #[tokio::test]
    async fn repair_restores_a_healthy_empty_schema() {
        let store = LocalStore::in_memory().await.unwrap();
        store
            .create_namespace(&Namespace::default_namespace())
            .await
            .unwrap();
        store
            .create_snippet(&Snippet::new("A", "a()", "js", "default"))
            .await
            .unwrap();
        sqlx::raw_sql("DROP TABLE snippets; DROP TABLE namespaces;")
            .execute(store.database().pool())
            .await
            .unwrap();
        assert!(!validate_schema(&store).await.unwrap().is_healthy());

        repair_schema(&store, true).await.unwrap();

        assert_eq!(validate_schema(&store).await.unwrap(), SchemaHealth::Healthy);
        assert!(store.list_snippets().await.unwrap().is_empty());
    }
}
