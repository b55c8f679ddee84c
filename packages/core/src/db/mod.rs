//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - The `nodes` / `owners` schema and its sibling-order uniqueness index
//! - Transaction-bound `NodeStore` access for the tree engine
//!
//! # Architecture
//!
//! The engine in [`crate::operations`] is written against the [`NodeStore`]
//! trait. [`SqliteStore`] is the only backend: every operation runs inside a
//! `BEGIN IMMEDIATE` transaction so writers are serialized, and the UNIQUE
//! index on `(owner_id, parent, sort_order)` turns any lost update on a
//! sibling group into a constraint violation instead of silent duplication.

mod database;
mod error;
mod node_store;
mod sqlite_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use node_store::{NodeStore, StoreTransaction, TransactionalStore};
pub use sqlite_store::{SqliteStore, SqliteTransaction};
