//! Database Connection Management
//!
//! Opens the local libsql database that backs [`TursoGraphStore`] and creates
//! the graph schema.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS`, safe on every start
//! - **WAL mode**: Write-Ahead Logging for concurrent readers
//! - **Foreign keys**: Edges reference nodes with `ON DELETE CASCADE`
//!
//! # Database Connection Patterns
//!
//! **Always use `connect_with_timeout()` in async functions.** It sets the
//! busy timeout and foreign-key pragma on the fresh connection, so concurrent
//! writers wait instead of failing with `SQLITE_BUSY`.
//!
//! ```no_run
//! # use compass_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db_service = DatabaseService::new(PathBuf::from("./data/compass.db")).await?;
//! let conn = db_service.connect_with_timeout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`TursoGraphStore`]: crate::db::TursoGraphStore

use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Busy timeout applied to every async connection, in milliseconds
const BUSY_TIMEOUT_MS: u32 = 5000;

/// Database service for managing the libsql connection and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,
}

impl DatabaseService {
    /// Create a new DatabaseService with the specified database path
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Create the `nodes` and `edges` tables and their indexes
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the parent directory cannot be created,
    /// the connection fails, or schema initialization fails.
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        let is_new_database = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
        };

        service.initialize_schema(is_new_database).await?;
        tracing::debug!(path = %service.db_path.display(), is_new_database, "Graph database ready");

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through `query()` rather
    /// than `execute()`.
    async fn execute_pragma(
        &self,
        conn: &libsql::Connection,
        pragma: &str,
    ) -> Result<(), DatabaseError> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    async fn execute_ddl(
        &self,
        conn: &libsql::Connection,
        sql: &str,
        what: &str,
    ) -> Result<(), DatabaseError> {
        conn.execute(sql, ()).await.map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create {}: {}", what, e))
        })?;
        Ok(())
    }

    /// Initialize database schema and configuration
    ///
    /// # Schema
    ///
    /// - `nodes`: one row per vertex; type-specific attributes and the
    ///   property bag are JSON text, the embedding a little-endian f32 blob
    /// - `edges`: one row per relationship, cascading on endpoint deletion
    /// - Indexes on owner, source and target for the store's listings
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        self.execute_ddl(
            &conn,
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                node_type TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                notes TEXT,
                details JSON NOT NULL,
                properties JSON NOT NULL DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL,
                modified_at TEXT NOT NULL
            )",
            "nodes table",
        )
        .await?;

        self.execute_ddl(
            &conn,
            "CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                edge_type TEXT NOT NULL,
                weight INTEGER NOT NULL DEFAULT 1,
                relationship_strength INTEGER,
                relevance_score REAL,
                last_interaction_date TEXT,
                notes TEXT,
                added_by_user INTEGER NOT NULL DEFAULT 1,
                sort_order INTEGER,
                created_at TEXT NOT NULL,
                FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
            )",
            "edges table",
        )
        .await?;

        self.create_indexes(&conn).await?;

        // New files only: flush schema out of the WAL so a second handle sees it
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    async fn create_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            (
                "idx_nodes_owner_type",
                "CREATE INDEX IF NOT EXISTS idx_nodes_owner_type ON nodes(owner_id, node_type)",
            ),
            (
                "idx_edges_owner",
                "CREATE INDEX IF NOT EXISTS idx_edges_owner ON edges(owner_id)",
            ),
            (
                "idx_edges_source",
                "CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id, edge_type)",
            ),
            (
                "idx_edges_target",
                "CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id, edge_type)",
            ),
        ];

        for (name, sql) in indexes {
            self.execute_ddl(conn, sql, &format!("index '{}'", name))
                .await?;
        }
        Ok(())
    }

    /// Get a raw connection
    ///
    /// Only for synchronous, single-threaded use; async code should call
    /// [`connect_with_timeout`](Self::connect_with_timeout).
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout and foreign keys configured
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(&conn, &format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
            .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_schema_initialization_is_idempotent() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("nested").join("graph.db");

        let first = DatabaseService::new(db_path.clone()).await?;
        drop(first);
        let second = DatabaseService::new(db_path).await?;

        let conn = second.connect_with_timeout().await?;
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('nodes', 'edges') ORDER BY name",
                (),
            )
            .await?;

        let mut tables = Vec::new();
        while let Some(row) = rows.next().await? {
            tables.push(row.get::<String>(0)?);
        }
        assert_eq!(tables, vec!["edges".to_string(), "nodes".to_string()]);
        Ok(())
    }
}
