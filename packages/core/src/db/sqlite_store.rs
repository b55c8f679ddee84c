//! SqliteStore - NodeStore Implementation for the libsql Backend
//!
//! `SqliteStore` opens transactions; `SqliteTransaction` is the `NodeStore`
//! the engine runs against. Each transaction owns a dedicated connection that
//! starts with `BEGIN IMMEDIATE`, which takes SQLite's write lock up front:
//! writers are serialized, so every read a transaction makes is consistent
//! with the writes it commits.
//!
//! # Row Format
//!
//! Node queries select, in order: id, owner_id, parent_id, sort_order, title,
//! description, completed, archived, collapsed, created_at, updated_at.

use crate::config::OutlinerConfig;
use crate::db::node_store::{NodeStore, StoreTransaction, TransactionalStore};
use crate::db::{DatabaseError, DatabaseService};
use crate::models::{
    NewNode, Node, NodeFilter, NodeId, NodeUpdate, OwnerId, OwnerSettings, ShowMode,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use libsql::{Row, Value};
use std::path::PathBuf;
use std::sync::Arc;

const NODE_COLUMNS: &str = "id, owner_id, parent_id, sort_order, title, description, \
                            completed, archived, collapsed, created_at, updated_at";

const SIBLING_ORDER: &str = "ORDER BY sort_order IS NULL, sort_order, created_at, id";

/// Transaction factory over a shared `DatabaseService`
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Arc<DatabaseService>,
}

impl SqliteStore {
    /// Wrap an already-open database
    pub fn new(db: Arc<DatabaseService>) -> Self {
        Self { db }
    }

    /// Open (or create) the database described by `config`
    pub async fn open(config: &OutlinerConfig) -> Result<Self, DatabaseError> {
        let db = DatabaseService::open(config).await?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Open (or create) a database file with default settings
    pub async fn open_path(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::open(&OutlinerConfig::with_database_path(db_path)).await
    }

    /// Underlying database service, for maintenance and tests
    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }
}

#[async_trait]
impl TransactionalStore for SqliteStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> Result<SqliteTransaction, DatabaseError> {
        let conn = self.db.connect_with_timeout().await?;
        conn.execute("BEGIN IMMEDIATE", ())
            .await
            .map_err(|e| DatabaseError::from_libsql("Failed to begin transaction", e))?;
        Ok(SqliteTransaction { conn })
    }
}

/// One open `BEGIN IMMEDIATE` transaction
///
/// Dropping it without `commit()` closes the connection, which makes SQLite
/// discard the pending writes.
pub struct SqliteTransaction {
    conn: libsql::Connection,
}

/// Timestamps are stored as fixed-width RFC3339 so lexical order matches time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse timestamp from database - handles both RFC3339 and SQLite formats
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    Err(DatabaseError::invalid_row(format!(
        "Unable to parse timestamp '{}' as RFC3339 or SQLite format",
        s
    )))
}

fn value_at(row: &Row, idx: i32, name: &str) -> Result<Value, DatabaseError> {
    row.get_value(idx)
        .map_err(|e| DatabaseError::invalid_row(format!("Failed to get {}: {}", name, e)))
}

fn opt_int_column(row: &Row, idx: i32, name: &str) -> Result<Option<i64>, DatabaseError> {
    match value_at(row, idx, name)? {
        Value::Null => Ok(None),
        Value::Integer(v) => Ok(Some(v)),
        other => Err(DatabaseError::invalid_row(format!(
            "Column {} is not an integer: {:?}",
            name, other
        ))),
    }
}

fn int_column(row: &Row, idx: i32, name: &str) -> Result<i64, DatabaseError> {
    opt_int_column(row, idx, name)?
        .ok_or_else(|| DatabaseError::invalid_row(format!("Column {} is NULL", name)))
}

fn opt_text_column(row: &Row, idx: i32, name: &str) -> Result<Option<String>, DatabaseError> {
    match value_at(row, idx, name)? {
        Value::Null => Ok(None),
        Value::Text(v) => Ok(Some(v)),
        other => Err(DatabaseError::invalid_row(format!(
            "Column {} is not text: {:?}",
            name, other
        ))),
    }
}

fn text_column(row: &Row, idx: i32, name: &str) -> Result<String, DatabaseError> {
    opt_text_column(row, idx, name)?
        .ok_or_else(|| DatabaseError::invalid_row(format!("Column {} is NULL", name)))
}

/// Convert a libsql row (see module docs for column order) to a Node
fn row_to_node(row: &Row) -> Result<Node, DatabaseError> {
    let created_at = text_column(row, 9, "created_at")?;
    let updated_at = text_column(row, 10, "updated_at")?;

    Ok(Node {
        id: int_column(row, 0, "id")?,
        owner_id: int_column(row, 1, "owner_id")?,
        parent_id: opt_int_column(row, 2, "parent_id")?,
        order: opt_int_column(row, 3, "sort_order")?,
        title: text_column(row, 4, "title")?,
        description: opt_text_column(row, 5, "description")?,
        completed: int_column(row, 6, "completed")? != 0,
        archived: int_column(row, 7, "archived")? != 0,
        collapsed: int_column(row, 8, "collapsed")? != 0,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

impl SqliteTransaction {
    async fn query_nodes(
        &self,
        what: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Node>, DatabaseError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))?;

        let mut nodes = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))?
        {
            nodes.push(row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn execute(
        &self,
        what: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<u64, DatabaseError> {
        self.conn
            .execute(sql, params)
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))
    }

    async fn expect_one_row(
        &self,
        what: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
        id: NodeId,
    ) -> Result<(), DatabaseError> {
        let affected = self.execute(what, sql, params).await?;
        if affected == 0 {
            return Err(DatabaseError::sql_execution(format!(
                "{}: node {} not found",
                what, id
            )));
        }
        Ok(())
    }

    async fn scalar_i64(
        &self,
        what: &str,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<i64>, DatabaseError> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))?;

        match rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))?
        {
            Some(row) => opt_int_column(&row, 0, what),
            None => Ok(None),
        }
    }

    async fn ensure_owner_row(&self, owner_id: OwnerId) -> Result<(), DatabaseError> {
        self.execute(
            "Failed to create owner settings",
            "INSERT OR IGNORE INTO owners (id) VALUES (?)",
            [owner_id],
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NodeStore for SqliteTransaction {
    async fn get_node(&self, owner_id: OwnerId, id: NodeId) -> Result<Option<Node>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM nodes WHERE owner_id = ? AND id = ?",
            NODE_COLUMNS
        );
        let mut nodes = self
            .query_nodes("Failed to get node", &sql, (owner_id, id))
            .await?;
        Ok(nodes.pop())
    }

    async fn get_children(
        &self,
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
    ) -> Result<Vec<Node>, DatabaseError> {
        match parent_id {
            Some(parent_id) => {
                let sql = format!(
                    "SELECT {} FROM nodes WHERE owner_id = ? AND parent_id = ? {}",
                    NODE_COLUMNS, SIBLING_ORDER
                );
                self.query_nodes("Failed to get children", &sql, (owner_id, parent_id))
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM nodes WHERE owner_id = ? AND parent_id IS NULL {}",
                    NODE_COLUMNS, SIBLING_ORDER
                );
                self.query_nodes("Failed to get root nodes", &sql, [owner_id])
                    .await
            }
        }
    }

    async fn list_nodes(&self, filter: &NodeFilter) -> Result<Vec<Node>, DatabaseError> {
        let what = "Failed to list nodes";
        match (filter.owner_id, filter.archived) {
            (Some(owner_id), Some(archived)) => {
                let sql = format!(
                    "SELECT {} FROM nodes WHERE owner_id = ? AND archived = ? ORDER BY id",
                    NODE_COLUMNS
                );
                self.query_nodes(what, &sql, (owner_id, archived as i64))
                    .await
            }
            (Some(owner_id), None) => {
                let sql = format!(
                    "SELECT {} FROM nodes WHERE owner_id = ? ORDER BY id",
                    NODE_COLUMNS
                );
                self.query_nodes(what, &sql, [owner_id]).await
            }
            (None, Some(archived)) => {
                let sql = format!(
                    "SELECT {} FROM nodes WHERE archived = ? ORDER BY owner_id, id",
                    NODE_COLUMNS
                );
                self.query_nodes(what, &sql, [archived as i64]).await
            }
            (None, None) => {
                let sql = format!(
                    "SELECT {} FROM nodes ORDER BY owner_id, id",
                    NODE_COLUMNS
                );
                self.query_nodes(what, &sql, ()).await
            }
        }
    }

    async fn node_exists(&self, owner_id: OwnerId, id: NodeId) -> Result<bool, DatabaseError> {
        let count = self
            .scalar_i64(
                "Failed to check node existence",
                "SELECT COUNT(*) FROM nodes WHERE owner_id = ? AND id = ?",
                (owner_id, id),
            )
            .await?;
        Ok(count.unwrap_or(0) > 0)
    }

    async fn has_children(&self, owner_id: OwnerId, id: NodeId) -> Result<bool, DatabaseError> {
        let found = self
            .scalar_i64(
                "Failed to check children",
                "SELECT EXISTS(SELECT 1 FROM nodes WHERE owner_id = ? AND parent_id = ?)",
                (owner_id, id),
            )
            .await?;
        Ok(found.unwrap_or(0) != 0)
    }

    async fn max_sibling_order(
        &self,
        owner_id: OwnerId,
        parent_id: Option<NodeId>,
    ) -> Result<Option<i64>, DatabaseError> {
        let what = "Failed to read max sibling order";
        match parent_id {
            Some(parent_id) => {
                self.scalar_i64(
                    what,
                    "SELECT MAX(sort_order) FROM nodes WHERE owner_id = ? AND parent_id = ?",
                    (owner_id, parent_id),
                )
                .await
            }
            None => {
                self.scalar_i64(
                    what,
                    "SELECT MAX(sort_order) FROM nodes WHERE owner_id = ? AND parent_id IS NULL",
                    [owner_id],
                )
                .await
            }
        }
    }

    async fn insert_node(
        &self,
        owner_id: OwnerId,
        node: NewNode,
        order: i64,
    ) -> Result<Node, DatabaseError> {
        let now = format_timestamp(Utc::now());

        self.execute(
            "Failed to insert node",
            "INSERT INTO nodes (owner_id, parent_id, sort_order, title, description, completed, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            (
                owner_id,
                node.parent_id,
                order,
                node.title,
                node.description,
                node.completed as i64,
                now.clone(),
                now,
            ),
        )
        .await?;

        let id = self.conn.last_insert_rowid();
        self.get_node(owner_id, id)
            .await?
            .ok_or_else(|| DatabaseError::sql_execution("Node not found after insert"))
    }

    async fn update_fields(
        &self,
        owner_id: OwnerId,
        id: NodeId,
        update: &NodeUpdate,
    ) -> Result<(), DatabaseError> {
        let current = self
            .get_node(owner_id, id)
            .await?
            .ok_or_else(|| DatabaseError::sql_execution(format!("Node not found: {}", id)))?;

        let title = update.title.clone().unwrap_or(current.title);
        let description = match &update.description {
            Some(description) => description.clone(),
            None => current.description,
        };
        let completed = update.completed.unwrap_or(current.completed);
        let collapsed = update.collapsed.unwrap_or(current.collapsed);

        self.expect_one_row(
            "Failed to update node",
            "UPDATE nodes SET title = ?, description = ?, completed = ?, collapsed = ?, updated_at = ?
             WHERE owner_id = ? AND id = ?",
            (
                title,
                description,
                completed as i64,
                collapsed as i64,
                format_timestamp(Utc::now()),
                owner_id,
                id,
            ),
            id,
        )
        .await
    }

    async fn set_parent(
        &self,
        owner_id: OwnerId,
        id: NodeId,
        parent_id: Option<NodeId>,
    ) -> Result<(), DatabaseError> {
        self.expect_one_row(
            "Failed to set parent",
            "UPDATE nodes SET parent_id = ?, sort_order = NULL, updated_at = ? WHERE owner_id = ? AND id = ?",
            (parent_id, format_timestamp(Utc::now()), owner_id, id),
            id,
        )
        .await
    }

    async fn write_orders(
        &self,
        owner_id: OwnerId,
        assignments: &[(NodeId, i64)],
    ) -> Result<(), DatabaseError> {
        // Phase 1 parks every node on the negated target. Negative orders never
        // collide with committed (positive) ones, so phase 2 can write the final
        // values in any sequence; only a genuinely non-unique result fails.
        for (id, order) in assignments {
            self.expect_one_row(
                "Failed to stage sibling order",
                "UPDATE nodes SET sort_order = ? WHERE owner_id = ? AND id = ?",
                (-order, owner_id, *id),
                *id,
            )
            .await?;
        }

        let now = format_timestamp(Utc::now());
        for (id, order) in assignments {
            self.expect_one_row(
                "Failed to write sibling order",
                "UPDATE nodes SET sort_order = ?, updated_at = ? WHERE owner_id = ? AND id = ?",
                (*order, now.clone(), owner_id, *id),
                *id,
            )
            .await?;
        }

        Ok(())
    }

    async fn set_archived(
        &self,
        owner_id: OwnerId,
        id: NodeId,
        archived: bool,
    ) -> Result<(), DatabaseError> {
        self.expect_one_row(
            "Failed to set archived flag",
            "UPDATE nodes SET archived = ?, updated_at = ? WHERE owner_id = ? AND id = ?",
            (archived as i64, format_timestamp(Utc::now()), owner_id, id),
            id,
        )
        .await
    }

    async fn delete_node(&self, owner_id: OwnerId, id: NodeId) -> Result<u64, DatabaseError> {
        self.execute(
            "Failed to delete node",
            "DELETE FROM nodes WHERE owner_id = ? AND id = ?",
            (owner_id, id),
        )
        .await
    }

    async fn get_owner_settings(&self, owner_id: OwnerId) -> Result<OwnerSettings, DatabaseError> {
        let what = "Failed to read owner settings";
        let mut rows = self
            .conn
            .query(
                "SELECT locked_node_id, show_mode FROM owners WHERE id = ?",
                [owner_id],
            )
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from_libsql(what, e))?
        else {
            return Ok(OwnerSettings::default());
        };

        let locked_node_id = opt_int_column(&row, 0, "locked_node_id")?;
        let show_mode = text_column(&row, 1, "show_mode")?;

        Ok(OwnerSettings {
            locked_node_id,
            show_mode: show_mode.parse().map_err(DatabaseError::invalid_row)?,
        })
    }

    async fn set_locked_node(
        &self,
        owner_id: OwnerId,
        node_id: Option<NodeId>,
    ) -> Result<(), DatabaseError> {
        self.ensure_owner_row(owner_id).await?;
        self.execute(
            "Failed to set locked node",
            "UPDATE owners SET locked_node_id = ? WHERE id = ?",
            (node_id, owner_id),
        )
        .await?;
        Ok(())
    }

    async fn set_show_mode(&self, owner_id: OwnerId, mode: ShowMode) -> Result<(), DatabaseError> {
        self.ensure_owner_row(owner_id).await?;
        self.execute(
            "Failed to set show mode",
            "UPDATE owners SET show_mode = ? WHERE id = ?",
            (mode.as_str(), owner_id),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for SqliteTransaction {
    async fn commit(&self) -> Result<(), DatabaseError> {
        self.execute("Failed to commit transaction", "COMMIT", ())
            .await?;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DatabaseError> {
        self.execute("Failed to roll back transaction", "ROLLBACK", ())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open_path(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_insert_and_get_node() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        let node = tx
            .insert_node(1, NewNode::new("Inbox").with_description("notes"), 1)
            .await
            .unwrap();
        assert_eq!(node.owner_id, 1);
        assert_eq!(node.order, Some(1));
        assert_eq!(node.description.as_deref(), Some("notes"));
        assert!(!node.archived);

        // Other owners cannot see it
        assert!(tx.get_node(2, node.id).await.unwrap().is_none());
        assert!(!tx.node_exists(2, node.id).await.unwrap());
        assert!(tx.node_exists(1, node.id).await.unwrap());

        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (store, _temp) = create_test_store().await;

        let tx = store.begin().await.unwrap();
        let node = tx.insert_node(1, NewNode::new("Temp"), 1).await.unwrap();
        tx.rollback().await.unwrap();

        let tx = store.begin().await.unwrap();
        assert!(tx.get_node(1, node.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_children_ordered_with_unassigned_last() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        let parent = tx.insert_node(1, NewNode::new("Parent"), 1).await.unwrap();
        let a = tx
            .insert_node(1, NewNode::new("A").with_parent(parent.id), 2)
            .await
            .unwrap();
        let b = tx
            .insert_node(1, NewNode::new("B").with_parent(parent.id), 1)
            .await
            .unwrap();
        let c = tx
            .insert_node(1, NewNode::new("C").with_parent(parent.id), 3)
            .await
            .unwrap();
        // Detach and re-attach C so its order becomes unassigned
        tx.set_parent(1, c.id, Some(parent.id)).await.unwrap();

        let children = tx.get_children(1, Some(parent.id)).await.unwrap();
        let ids: Vec<NodeId> = children.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![b.id, a.id, c.id]);
        assert_eq!(children[2].order, None);

        assert_eq!(tx.max_sibling_order(1, Some(parent.id)).await.unwrap(), Some(2));
        assert_eq!(tx.max_sibling_order(1, None).await.unwrap(), Some(1));
        assert_eq!(tx.max_sibling_order(2, None).await.unwrap(), None);
        assert!(tx.has_children(1, parent.id).await.unwrap());
        assert!(!tx.has_children(1, a.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_write_orders_allows_swaps() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        let x = tx.insert_node(1, NewNode::new("X"), 1).await.unwrap();
        let y = tx.insert_node(1, NewNode::new("Y"), 2).await.unwrap();

        tx.write_orders(1, &[(x.id, 2), (y.id, 1)]).await.unwrap();

        let roots = tx.get_children(1, None).await.unwrap();
        assert_eq!(roots[0].id, y.id);
        assert_eq!(roots[1].id, x.id);
    }

    #[tokio::test]
    async fn test_write_orders_rejects_duplicates_as_conflict() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        let x = tx.insert_node(1, NewNode::new("X"), 1).await.unwrap();
        let _y = tx.insert_node(1, NewNode::new("Y"), 2).await.unwrap();

        // X onto Y's slot while Y keeps it
        let err = tx.write_orders(1, &[(x.id, 2)]).await.unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {}", err);
    }

    #[tokio::test]
    async fn test_update_fields_and_archive() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        let node = tx
            .insert_node(1, NewNode::new("Draft").with_description("old"), 1)
            .await
            .unwrap();

        let update = NodeUpdate::new()
            .with_title("Final")
            .with_description(None)
            .with_collapsed(true);
        tx.update_fields(1, node.id, &update).await.unwrap();
        tx.set_archived(1, node.id, true).await.unwrap();

        let updated = tx.get_node(1, node.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.description, None);
        assert!(updated.collapsed);
        assert!(updated.archived);
        assert!(!updated.completed);

        // Wrong owner touches nothing
        assert!(tx.set_archived(2, node.id, false).await.is_err());
    }

    #[tokio::test]
    async fn test_list_nodes_filters() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        let a = tx.insert_node(1, NewNode::new("A"), 1).await.unwrap();
        let _b = tx.insert_node(1, NewNode::new("B"), 2).await.unwrap();
        let _c = tx.insert_node(2, NewNode::new("C"), 1).await.unwrap();
        tx.set_archived(1, a.id, true).await.unwrap();

        assert_eq!(tx.list_nodes(&NodeFilter::new()).await.unwrap().len(), 3);
        assert_eq!(tx.list_nodes(&NodeFilter::for_owner(1)).await.unwrap().len(), 2);

        let archived = tx
            .list_nodes(&NodeFilter::for_owner(1).with_archived(true))
            .await
            .unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].id, a.id);

        let live_everywhere = tx
            .list_nodes(&NodeFilter::new().with_archived(false))
            .await
            .unwrap();
        assert_eq!(live_everywhere.len(), 2);
    }

    #[tokio::test]
    async fn test_owner_settings_defaults_and_updates() {
        let (store, _temp) = create_test_store().await;
        let tx = store.begin().await.unwrap();

        assert_eq!(tx.get_owner_settings(1).await.unwrap(), OwnerSettings::default());

        let node = tx.insert_node(1, NewNode::new("Project"), 1).await.unwrap();
        tx.set_locked_node(1, Some(node.id)).await.unwrap();
        tx.set_show_mode(1, ShowMode::All).await.unwrap();

        let settings = tx.get_owner_settings(1).await.unwrap();
        assert_eq!(settings.locked_node_id, Some(node.id));
        assert_eq!(settings.show_mode, ShowMode::All);

        tx.set_locked_node(1, None).await.unwrap();
        assert_eq!(tx.get_owner_settings(1).await.unwrap().locked_node_id, None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let rfc = parse_timestamp("2025-01-03T10:00:00.000000Z").unwrap();
        let sqlite = parse_timestamp("2025-01-03 10:00:00").unwrap();
        assert_eq!(rfc, sqlite);
        assert!(parse_timestamp("yesterday").is_err());

        let now = Utc::now();
        assert_eq!(parse_timestamp(&format_timestamp(now)).unwrap().timestamp_micros(), now.timestamp_micros());
    }
}
