//! Local storage engine
//!
//! Embedded SQLite store implementing the uniform contract, plus the
//! local-only surface: export/import of the whole store as an opaque
//! byte blob, store statistics, and the schema introspection the
//! health check relies on.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::mapper::{
    NamespaceRow, SnippetRow, namespace_from_row, snippet_from_row, snippet_to_row,
};
use crate::model::{Namespace, Snippet};
use crate::storage::SnippetStore;
use crate::storage::database::{Database, DatabaseConfig};

/// Row counts and on-disk size of the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub snippets: i64,
    pub namespaces: i64,
    pub size_bytes: i64,
}

/// The embedded relational store
#[derive(Debug, Clone)]
pub struct LocalStore {
    db: Database,
}

impl LocalStore {
    /// Wrap an already-open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the store at the default database path
    pub async fn open_default() -> Result<Self> {
        Ok(Self::new(Database::open_default().await?))
    }

    /// Open an in-memory store (useful for testing)
    pub async fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::in_memory().await?))
    }

    /// The underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Serialize the whole store to an opaque byte blob
    ///
    /// The blob is a complete SQLite image produced by `VACUUM INTO`;
    /// [`LocalStore::import`] restores from the same format.
    pub async fn export(&self) -> Result<Vec<u8>> {
        let scratch = scratch_path("export");
        let target = scratch.display().to_string().replace('\'', "''");
        sqlx::query(&format!("VACUUM INTO '{target}'"))
            .execute(self.pool())
            .await?;

        let bytes = std::fs::read(&scratch)?;
        let _ = std::fs::remove_file(&scratch);
        debug!(bytes = bytes.len(), "exported local store");
        Ok(bytes)
    }

    /// Fully replace store contents from an exported blob
    pub async fn import(&self, blob: &[u8]) -> Result<()> {
        let scratch = scratch_path("import");
        std::fs::write(&scratch, blob)?;

        let source = match Database::new(DatabaseConfig::with_path(&scratch).no_init()).await {
            Ok(db) => db,
            Err(e) => {
                let _ = std::fs::remove_file(&scratch);
                return Err(Error::InvalidRecord(format!("blob is not a store export: {e}")));
            }
        };
        let read = async {
            let namespaces: Vec<NamespaceRow> = sqlx::query_as("SELECT * FROM namespaces")
                .fetch_all(source.pool())
                .await?;
            let snippets: Vec<SnippetRow> = sqlx::query_as("SELECT * FROM snippets")
                .fetch_all(source.pool())
                .await?;
            Ok::<_, Error>((namespaces, snippets))
        }
        .await;
        source.close().await;
        let _ = std::fs::remove_file(&scratch);

        let (namespaces, snippets) = read
            .map_err(|e| Error::InvalidRecord(format!("blob is not a store export: {e}")))?;

        self.db.reset_schema().await?;
        for row in &namespaces {
            insert_namespace_row(self.pool(), row).await?;
        }
        for row in &snippets {
            insert_snippet_row(self.pool(), row).await?;
        }

        info!(
            namespaces = namespaces.len(),
            snippets = snippets.len(),
            "imported local store from blob"
        );
        Ok(())
    }

    /// Row counts and database size
    pub async fn stats(&self) -> Result<StoreStats> {
        let (snippets,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM snippets")
            .fetch_one(self.pool())
            .await?;
        let (namespaces,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM namespaces")
            .fetch_one(self.pool())
            .await?;
        let size_bytes = self.db.size_bytes().await?;
        Ok(StoreStats {
            snippets,
            namespaces,
            size_bytes,
        })
    }

    /// Whether a table exists in the current schema
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        self.db.table_exists(table).await
    }

    /// Column names of a table in the current schema
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        self.db.table_columns(table).await
    }

    fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }
}

fn scratch_path(label: &str) -> PathBuf {
    std::env::temp_dir().join(format!("snipvault-{label}-{}.db", Uuid::new_v4()))
}

async fn insert_snippet_row(pool: &SqlitePool, row: &SnippetRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO snippets (id, title, description, code, language, category,
                              namespace_id, tags, has_preview, function_name,
                              input_parameters, is_template, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.code)
    .bind(&row.language)
    .bind(&row.category)
    .bind(&row.namespace_id)
    .bind(&row.tags)
    .bind(row.has_preview)
    .bind(&row.function_name)
    .bind(&row.input_parameters)
    .bind(row.is_template)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(pool)
    .await?;
    Ok(())
}

async fn insert_namespace_row(pool: &SqlitePool, row: &NamespaceRow) -> Result<()> {
    sqlx::query("INSERT INTO namespaces (id, name, created_at, is_default) VALUES (?, ?, ?, ?)")
        .bind(&row.id)
        .bind(&row.name)
        .bind(row.created_at)
        .bind(row.is_default)
        .execute(pool)
        .await?;
    Ok(())
}

#[async_trait]
impl SnippetStore for LocalStore {
    async fn list_snippets(&self) -> Result<Vec<Snippet>> {
        let rows: Vec<SnippetRow> =
            sqlx::query_as("SELECT * FROM snippets ORDER BY updated_at DESC")
                .fetch_all(self.pool())
                .await?;
        rows.into_iter().map(snippet_from_row).collect()
    }

    async fn get_snippet(&self, id: &str) -> Result<Option<Snippet>> {
        let row: Option<SnippetRow> = sqlx::query_as("SELECT * FROM snippets WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.map(snippet_from_row).transpose()
    }

    async fn create_snippet(&self, snippet: &Snippet) -> Result<()> {
        let row = snippet_to_row(snippet)?;
        insert_snippet_row(self.pool(), &row).await?;
        debug!(id = %snippet.id, "created snippet");
        Ok(())
    }

    async fn update_snippet(&self, snippet: &Snippet) -> Result<()> {
        let row = snippet_to_row(snippet)?;
        let result = sqlx::query(
            r#"
            UPDATE snippets
            SET title = ?, description = ?, code = ?, language = ?, category = ?,
                namespace_id = ?, tags = ?, has_preview = ?, function_name = ?,
                input_parameters = ?, is_template = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&row.title)
        .bind(&row.description)
        .bind(&row.code)
        .bind(&row.language)
        .bind(&row.category)
        .bind(&row.namespace_id)
        .bind(&row.tags)
        .bind(row.has_preview)
        .bind(&row.function_name)
        .bind(&row.input_parameters)
        .bind(row.is_template)
        .bind(row.updated_at)
        .bind(&row.id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::SnippetNotFound(snippet.id.clone()));
        }
        Ok(())
    }

    async fn delete_snippet(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM snippets WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::SnippetNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_snippets_in_namespace(&self, namespace_id: &str) -> Result<Vec<Snippet>> {
        let rows: Vec<SnippetRow> =
            sqlx::query_as("SELECT * FROM snippets WHERE namespace_id = ? ORDER BY updated_at DESC")
                .bind(namespace_id)
                .fetch_all(self.pool())
                .await?;
        rows.into_iter().map(snippet_from_row).collect()
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let rows: Vec<NamespaceRow> =
            sqlx::query_as("SELECT * FROM namespaces ORDER BY is_default DESC, name ASC")
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(namespace_from_row).collect())
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        insert_namespace_row(
            self.pool(),
            &NamespaceRow {
                id: namespace.id.clone(),
                name: namespace.name.clone(),
                created_at: namespace.created_at,
                is_default: i64::from(namespace.is_default),
            },
        )
        .await?;
        debug!(id = %namespace.id, "created namespace");
        Ok(())
    }

    async fn remove_namespace(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM namespaces WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NamespaceNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn reassign_namespace(&self, from: &str, to: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE snippets SET namespace_id = ? WHERE namespace_id = ?")
            .bind(to)
            .bind(from)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn bulk_move_snippets(&self, ids: &[String], target_namespace_id: &str) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql =
            format!("UPDATE snippets SET namespace_id = ? WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql).bind(target_namespace_id);
        for id in ids {
            query = query.bind(id);
        }
        query.execute(self.pool()).await?;
        Ok(())
    }

    async fn wipe(&self) -> Result<()> {
        info!("wiping local store: dropping and recreating schema");
        self.db.reset_schema().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DEFAULT_NAMESPACE_ID, InputParameter, ParameterKind};

    async fn store_with_default_namespace() -> LocalStore {
        let store = LocalStore::in_memory().await.unwrap();
        store
            .create_namespace(&Namespace::default_namespace())
            .await
            .unwrap();
        store
    }

    fn snippet_in(namespace_id: &str, title: &str) -> Snippet {
        Snippet::new(title, "console.log(1)", "javascript", namespace_id)
    }

    #[tokio::test]
    async fn snippet_crud_round_trip() {
        let store = store_with_default_namespace().await;
        let mut snippet = snippet_in(DEFAULT_NAMESPACE_ID, "Hello");
        snippet.tags = vec!["demo".to_string()];
        snippet.input_parameters = vec![InputParameter {
            name: "msg".to_string(),
            kind: ParameterKind::String,
            default_value: None,
            description: None,
        }];

        store.create_snippet(&snippet).await.unwrap();

        let fetched = store.get_snippet(&snippet.id).await.unwrap().unwrap();
        assert_eq!(fetched, snippet);

        snippet.title = "Hello again".to_string();
        snippet.touch();
        store.update_snippet(&snippet).await.unwrap();
        let fetched = store.get_snippet(&snippet.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Hello again");

        store.delete_snippet(&snippet.id).await.unwrap();
        assert!(store.get_snippet(&snippet.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_missing_snippet_is_none_not_an_error() {
        let store = store_with_default_namespace().await;
        assert!(store.get_snippet("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_and_delete_missing_snippet_report_not_found() {
        let store = store_with_default_namespace().await;
        let ghost = snippet_in(DEFAULT_NAMESPACE_ID, "Ghost");
        assert!(matches!(
            store.update_snippet(&ghost).await,
            Err(Error::SnippetNotFound(_))
        ));
        assert!(matches!(
            store.delete_snippet("nope").await,
            Err(Error::SnippetNotFound(_))
        ));
    }

    #[tokio::test]
    async fn snippets_list_most_recently_updated_first() {
        let store = store_with_default_namespace().await;
        let mut older = snippet_in(DEFAULT_NAMESPACE_ID, "older");
        older.created_at = 1_000;
        older.updated_at = 1_000;
        let mut newer = snippet_in(DEFAULT_NAMESPACE_ID, "newer");
        newer.created_at = 2_000;
        newer.updated_at = 2_000;

        store.create_snippet(&older).await.unwrap();
        store.create_snippet(&newer).await.unwrap();

        let titles: Vec<String> = store
            .list_snippets()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn namespaces_list_default_first_then_by_name() {
        let store = store_with_default_namespace().await;
        store.create_namespace(&Namespace::new("Zeta")).await.unwrap();
        store.create_namespace(&Namespace::new("Alpha")).await.unwrap();

        let names: Vec<String> = store
            .list_namespaces()
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["Default", "Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn query_by_namespace_and_reassign() {
        let store = store_with_default_namespace().await;
        let work = Namespace::new("Work");
        store.create_namespace(&work).await.unwrap();

        store.create_snippet(&snippet_in(&work.id, "A")).await.unwrap();
        store.create_snippet(&snippet_in(&work.id, "B")).await.unwrap();
        store
            .create_snippet(&snippet_in(DEFAULT_NAMESPACE_ID, "C"))
            .await
            .unwrap();

        assert_eq!(store.list_snippets_in_namespace(&work.id).await.unwrap().len(), 2);

        let moved = store
            .reassign_namespace(&work.id, DEFAULT_NAMESPACE_ID)
            .await
            .unwrap();
        assert_eq!(moved, 2);
        assert!(store.list_snippets_in_namespace(&work.id).await.unwrap().is_empty());
        assert_eq!(
            store
                .list_snippets_in_namespace(DEFAULT_NAMESPACE_ID)
                .await
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn bulk_move_with_empty_list_is_a_successful_noop() {
        let store = store_with_default_namespace().await;
        store
            .bulk_move_snippets(&[], DEFAULT_NAMESPACE_ID)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bulk_move_targets_only_listed_ids() {
        let store = store_with_default_namespace().await;
        let work = Namespace::new("Work");
        store.create_namespace(&work).await.unwrap();

        let a = snippet_in(DEFAULT_NAMESPACE_ID, "A");
        let b = snippet_in(DEFAULT_NAMESPACE_ID, "B");
        store.create_snippet(&a).await.unwrap();
        store.create_snippet(&b).await.unwrap();

        store
            .bulk_move_snippets(&[a.id.clone()], &work.id)
            .await
            .unwrap();

        assert_eq!(
            store.get_snippet(&a.id).await.unwrap().unwrap().namespace_id,
            work.id
        );
        assert_eq!(
            store.get_snippet(&b.id).await.unwrap().unwrap().namespace_id,
            DEFAULT_NAMESPACE_ID
        );
    }

    #[tokio::test]
    async fn wipe_leaves_an_empty_healthy_schema() {
        let store = store_with_default_namespace().await;
        store
            .create_snippet(&snippet_in(DEFAULT_NAMESPACE_ID, "A"))
            .await
            .unwrap();

        store.wipe().await.unwrap();

        assert!(store.list_snippets().await.unwrap().is_empty());
        assert!(store.list_namespaces().await.unwrap().is_empty());
        assert!(store.table_exists("snippets").await.unwrap());
    }

    #[tokio::test]
    async fn export_then_import_reproduces_the_store() {
        let store = store_with_default_namespace().await;
        let work = Namespace::new("Work");
        store.create_namespace(&work).await.unwrap();
        let a = snippet_in(&work.id, "A");
        let b = snippet_in(DEFAULT_NAMESPACE_ID, "B");
        store.create_snippet(&a).await.unwrap();
        store.create_snippet(&b).await.unwrap();

        let blob = store.export().await.unwrap();
        assert!(!blob.is_empty());

        let restored = LocalStore::in_memory().await.unwrap();
        restored.import(&blob).await.unwrap();

        let mut original = store.list_snippets().await.unwrap();
        let mut copied = restored.list_snippets().await.unwrap();
        original.sort_by(|x, y| x.id.cmp(&y.id));
        copied.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(original, copied);
        assert_eq!(
            store.list_namespaces().await.unwrap(),
            restored.list_namespaces().await.unwrap()
        );
    }

    #[tokio::test]
    async fn import_rejects_garbage_blobs() {
        let store = store_with_default_namespace().await;
        let err = store.import(b"definitely not sqlite").await.unwrap_err();
        assert!(matches!(err, Error::InvalidRecord(_)));
        // Store contents are untouched on a rejected import
        assert_eq!(store.list_namespaces().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stats_count_rows_and_size() {
        let store = store_with_default_namespace().await;
        store
            .create_snippet(&snippet_in(DEFAULT_NAMESPACE_ID, "A"))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.snippets, 1);
        assert_eq!(stats.namespaces, 1);
        assert!(stats.size_bytes > 0);
    }
}
