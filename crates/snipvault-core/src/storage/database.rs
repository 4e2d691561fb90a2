//! Embedded SQLite database handle
//!
//! Connection pool management and schema initialization for the local
//! storage engine. The schema is the namespace-aware shape: a
//! `namespaces` table and a `snippets` table with a `namespace_id`
//! foreign key.

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Default maximum connections in the pool
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQL for creating the namespace-aware schema
const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS namespaces (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        is_default INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS snippets (
        id TEXT PRIMARY KEY NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        code TEXT NOT NULL,
        language TEXT NOT NULL,
        category TEXT NOT NULL DEFAULT 'general',
        namespace_id TEXT NOT NULL REFERENCES namespaces(id),
        tags TEXT NOT NULL DEFAULT '[]',
        has_preview INTEGER NOT NULL DEFAULT 0,
        function_name TEXT,
        input_parameters TEXT,
        is_template INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_snippets_namespace_id ON snippets(namespace_id);
    CREATE INDEX IF NOT EXISTS idx_snippets_updated_at ON snippets(updated_at);
"#;

/// SQL for tearing the schema down (repair and import both start here)
const DROP_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS snippets;
    DROP TABLE IF EXISTS namespaces;
"#;

/// Database configuration options
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether to create the schema on connect
    pub auto_init: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            auto_init: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database config with the specified path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a config for an in-memory database (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            // A pooled in-memory SQLite is one database per connection
            max_connections: 1,
            auto_init: true,
        }
    }

    /// Skip schema creation on connect
    pub fn no_init(mut self) -> Self {
        self.auto_init = false;
        self
    }
}

/// Get the default database path
pub fn default_database_path() -> PathBuf {
    if let Ok(dir) = std::env::var("SNIPVAULT_DATA_DIR") {
        return PathBuf::from(dir).join("snippets.db");
    }
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("snipvault").join("snippets.db")
    } else {
        PathBuf::from("snippets.db")
    }
}

/// Database connection pool wrapper
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    config: DatabaseConfig,
}

impl Database {
    /// Open a database with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let in_memory = config.path.to_string_lossy() == ":memory:";

        if !in_memory {
            if let Some(parent) = config.path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let connect_options = if in_memory {
            // The `SQLITE_OPEN_MEMORY` flag (sqlx's `in_memory(true)`) makes
            // `VACUUM INTO` a silent no-op; the `:memory:` filename does not.
            SqliteConnectOptions::new().filename(":memory:")
        } else {
            SqliteConnectOptions::new()
                .filename(&config.path)
                .create_if_missing(true)
        }
        .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                Error::Config(format!("could not open database {:?}: {e}", config.path))
            })?;

        let db = Self {
            pool,
            config: config.clone(),
        };

        if config.auto_init {
            db.init_schema().await?;
        }

        Ok(db)
    }

    /// Open the database at the default path
    pub async fn open_default() -> Result<Self> {
        Self::new(DatabaseConfig::default()).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self> {
        Self::new(DatabaseConfig::in_memory()).await
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Create the namespace-aware schema if it does not exist
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop and recreate an empty schema
    pub async fn reset_schema(&self) -> Result<()> {
        sqlx::raw_sql(DROP_SCHEMA).execute(&self.pool).await?;
        self.init_schema().await
    }

    /// Whether a table exists in the schema
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Column names of a table, empty if the table is missing
    pub async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        // PRAGMA table_info does not accept bound parameters
        let rows: Vec<(i64, String)> =
            sqlx::query_as(&format!("SELECT cid, name FROM pragma_table_info('{table}')"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(_, name)| name).collect())
    }

    /// Size of the database in bytes (page_count * page_size)
    pub async fn size_bytes(&self) -> Result<i64> {
        let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
            .fetch_one(&self.pool)
            .await?;
        let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
            .fetch_one(&self.pool)
            .await?;
        Ok(page_count * page_size)
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_has_schema() {
        let db = Database::in_memory().await.unwrap();
        assert!(db.table_exists("snippets").await.unwrap());
        assert!(db.table_exists("namespaces").await.unwrap());
        assert!(!db.table_exists("notebooks").await.unwrap());
    }

    #[tokio::test]
    async fn table_columns_lists_schema_columns() {
        let db = Database::in_memory().await.unwrap();
        let columns = db.table_columns("namespaces").await.unwrap();
        assert_eq!(columns, vec!["id", "name", "created_at", "is_default"]);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = Database::in_memory().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO snippets (id, title, code, language, namespace_id, created_at, updated_at)
             VALUES ('s1', 'T', 'x', 'js', 'nope', 0, 0)",
        )
        .execute(db.pool())
        .await;
        assert!(result.is_err(), "insert with dangling namespace_id should fail");
    }

    #[tokio::test]
    async fn reset_schema_leaves_empty_tables() {
        let db = Database::in_memory().await.unwrap();
        sqlx::query("INSERT INTO namespaces (id, name, created_at, is_default) VALUES ('n', 'N', 0, 0)")
            .execute(db.pool())
            .await
            .unwrap();

        db.reset_schema().await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM namespaces")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
