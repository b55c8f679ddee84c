//! Business Services
//!
//! - `NodeService` - transactional entry point for every tree operation,
//!   owner settings (lock, show mode) and the cycle audit
//!
//! Services coordinate between the database layer and the tree engine,
//! owning transaction boundaries and conflict retries.

pub mod node_service;


pub use node_service::NodeService;
