//! Outliner Core Business Logic Layer
//!
//! This crate provides the ordered-tree mutation engine behind a personal
//! hierarchical list manager: owners keep a forest of nodes with
//! user-controlled sibling order, and every structural edit keeps that forest
//! cycle-free and densely ordered.
//!
//! # Architecture
//!
//! - **Owner-scoped**: every read and write takes the owner ID explicitly
//! - **Transactional**: each operation is one libsql transaction, retried on conflict
//! - **Storage-enforced order**: sibling orders are unique per (owner, parent) at the schema level
//!
//! # Modules
//!
//! - [`models`] - Data structures (Node, NodeUpdate, OwnerSettings, CyclePath)
//! - [`db`] - Database layer with libsql integration and the `NodeStore` trait
//! - [`operations`] - Cycle guard, order maintainer, move engine, archive cascade
//! - [`services`] - `NodeService`, the transactional entry point
//! - [`config`] - Runtime configuration

pub mod config;
pub mod db;
pub mod models;
pub mod operations;
pub mod services;

// Re-export commonly used types
pub use config::OutlinerConfig;
pub use models::*;
pub use operations::{ErrorKind, NodeOperationError};
pub use services::*;
