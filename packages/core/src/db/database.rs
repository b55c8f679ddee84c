//! Database Connection Management
//!
//! This module provides the database connection and schema initialization
//! for the outliner using libsql (embedded SQLite).
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf
//! - **WAL mode**: Write-Ahead Logging so readers never block the single writer
//! - **Foreign keys**: Enabled on every connection (parent links are `ON DELETE RESTRICT`)
//! - **Sibling uniqueness**: `UNIQUE(owner_id, COALESCE(parent_id, 0), sort_order)`
//!   enforced by the storage layer, so concurrent writers can never commit
//!   duplicate orders inside a group
//!
//! # Database Connection Patterns
//!
//! **ALWAYS use `connect_with_timeout()` in async functions.** It applies the
//! busy timeout and the foreign key pragma, both of which are per-connection
//! settings in SQLite.

use crate::config::OutlinerConfig;
use crate::db::error::DatabaseError;
use libsql::{Builder, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Owns the libsql handle and the outliner schema
///
/// # Examples
///
/// ```no_run
/// use outliner_core::db::DatabaseService;
/// use std::path::PathBuf;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db_service = DatabaseService::new(PathBuf::from("./data/outliner.db")).await?;
///     let _conn = db_service.connect_with_timeout().await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database handle (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    /// Busy timeout applied to every connection
    busy_timeout_ms: u64,
}

impl DatabaseService {
    /// Open `db_path` with every other setting at its default
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::open(&OutlinerConfig::with_database_path(db_path)).await
    }

    /// Open the database described by `config`
    ///
    /// Missing parent directories are created, then the schema is brought up
    /// with `CREATE ... IF NOT EXISTS`, so reopening an existing file is safe.
    pub async fn open(config: &OutlinerConfig) -> Result<Self, DatabaseError> {
        let db_path = config.database_path.clone();
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
            busy_timeout_ms: config.busy_timeout_ms,
        };

        service.initialize_schema(is_new_database).await?;

        tracing::debug!(
            "Opened outliner database at {} (new: {})",
            service.db_path.display(),
            is_new_database
        );

        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so we must use query() instead of execute().
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

    /// Initialize database schema and configuration
    ///
    /// Idempotent: safe to call on an existing database.
    ///
    /// # Schema
    ///
    /// - `nodes`: one row per element, owner-scoped, with sibling order
    /// - `owners`: per-owner settings (subtree lock, show mode)
    async fn initialize_schema(&self, is_new_database: bool) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                parent_id INTEGER,
                sort_order INTEGER,
                title TEXT NOT NULL,
                description TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                archived INTEGER NOT NULL DEFAULT 0,
                collapsed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                -- Deleting a parent that still has children is refused
                FOREIGN KEY (parent_id) REFERENCES nodes(id) ON DELETE RESTRICT
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create nodes table: {}", e))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS owners (
                id INTEGER PRIMARY KEY,
                locked_node_id INTEGER,
                show_mode TEXT NOT NULL DEFAULT 'active',
                FOREIGN KEY (locked_node_id) REFERENCES nodes(id) ON DELETE SET NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create owners table: {}", e))
        })?;

        self.create_core_indexes(&conn).await?;

        // Flush schema to disk for brand-new files so a second connection
        // opened right away sees the tables.
        if is_new_database {
            self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
                .await?;
        }

        Ok(())
    }

    /// Create core indexes for the nodes table
    async fn create_core_indexes(&self, conn: &libsql::Connection) -> Result<(), DatabaseError> {
        let indexes = [
            (
                "idx_nodes_owner_parent",
                "CREATE INDEX IF NOT EXISTS idx_nodes_owner_parent ON nodes(owner_id, parent_id)",
            ),
            (
                "idx_nodes_owner_archived",
                "CREATE INDEX IF NOT EXISTS idx_nodes_owner_archived ON nodes(owner_id, archived)",
            ),
            // Roots share the sentinel parent 0 (AUTOINCREMENT IDs start at 1).
            // NULL orders are distinct, so unassigned legacy rows never collide.
            (
                "idx_nodes_sibling_order",
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_nodes_sibling_order
                 ON nodes(owner_id, COALESCE(parent_id, 0), sort_order)",
            ),
        ];

        for (name, sql) in indexes {
            conn.execute(sql, ()).await.map_err(|e| {
                DatabaseError::initialization_failed(format!(
                    "Failed to create index '{}': {}",
                    name, e
                ))
            })?;
        }

        Ok(())
    }

    /// Get a synchronous connection to the database
    ///
    /// **⚠️ WARNING**: Only use this in synchronous, single-threaded contexts.
    /// The returned connection has no busy timeout and foreign keys disabled.
    pub fn connect(&self) -> Result<libsql::Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get an async connection with busy timeout and foreign keys configured
    ///
    /// **✅ RECOMMENDED**: Use this for all async functions.
    ///
    /// The busy timeout makes concurrent writers queue on the database lock
    /// instead of failing immediately with `SQLITE_BUSY`.
    pub async fn connect_with_timeout(&self) -> Result<libsql::Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
        )
        .await?;
        self.execute_pragma(&conn, "PRAGMA foreign_keys = ON")
            .await?;

        Ok(conn)
    }

    /// Flush the WAL into the main database file
    pub async fn checkpoint(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await
    }
}
