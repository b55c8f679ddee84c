//! Integration tests for the cycle audit
//!
//! Corrupted forests are produced by writing parent pointers directly through
//! a store transaction, bypassing the move engine's checks.

use anyhow::Result;
use outliner_core::{
    db::{NodeStore, SqliteStore, StoreTransaction, TransactionalStore},
    operations::{ErrorKind, NodeOperationError, RetryPolicy},
    NewNode, NodeId, NodeService, OwnerId,
};
use std::sync::Arc;
use tempfile::TempDir;

async fn create_test_env() -> Result<(Arc<SqliteStore>, NodeService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let store = Arc::new(SqliteStore::open_path(temp_dir.path().join("test.db")).await?);
    let node_service = NodeService::new(store.clone(), RetryPolicy::default());

    Ok((store, node_service, temp_dir))
}

async fn corrupt_parent(
    store: &SqliteStore,
    owner_id: OwnerId,
    node_id: NodeId,
    parent_id: NodeId,
) -> Result<()> {
    let tx = store.begin().await?;
    tx.set_parent(owner_id, node_id, Some(parent_id)).await?;
    tx.commit().await?;
    Ok(())
}

#[tokio::test]
async fn test_clean_forest_has_no_cycles() -> Result<()> {
    let (_store, service, _temp_dir) = create_test_env().await?;

    let a = service.create_node(1, NewNode::new("A")).await?;
    service
        .create_node(1, NewNode::new("B").with_parent(a.id))
        .await?;

    assert!(service.detect_cycles(None).await?.is_empty());
    assert!(service.repair_cycles(Some(1)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_two_node_cycle_detected_and_repaired() -> Result<()> {
    let (store, service, _temp_dir) = create_test_env().await?;

    let five = service.create_node(1, NewNode::new("Five")).await?;
    let seven = service
        .create_node(1, NewNode::new("Seven").with_parent(five.id))
        .await?;
    corrupt_parent(&store, 1, five.id, seven.id).await?;

    let cycles = service.detect_cycles(Some(1)).await?;
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].contains(five.id));
    assert!(cycles[0].contains(seven.id));
    assert_eq!(cycles[0].path, vec![five.id, seven.id, five.id]);

    // Other owners see nothing
    assert!(service.detect_cycles(Some(2)).await?.is_empty());

    let fixed = service.repair_cycles(Some(1)).await?;
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].node_id, five.id);
    assert_eq!(fixed[0].previous_parent_id, seven.id);

    assert!(service.detect_cycles(None).await?.is_empty());

    let five_now = service.get_node(1, five.id).await?.unwrap();
    assert_eq!(five_now.parent_id, None);
    assert_eq!(five_now.order, Some(1));
    Ok(())
}

#[tokio::test]
async fn test_moves_through_existing_cycle_report_path() -> Result<()> {
    let (store, service, _temp_dir) = create_test_env().await?;

    let a = service.create_node(1, NewNode::new("A")).await?;
    let b = service
        .create_node(1, NewNode::new("B").with_parent(a.id))
        .await?;
    let elsewhere = service.create_node(1, NewNode::new("Elsewhere")).await?;
    corrupt_parent(&store, 1, a.id, b.id).await?;

    let err = service
        .move_node(1, a.id, Some(elsewhere.id), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidStructure);
    match err {
        NodeOperationError::ExistingCycle { path } => {
            assert_eq!(path.path, vec![a.id, b.id, a.id]);
        }
        other => panic!("expected ExistingCycle, got {}", other),
    }

    // Nothing was repaired implicitly
    assert_eq!(service.detect_cycles(Some(1)).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_audit_spans_owners_and_self_parents() -> Result<()> {
    let (store, service, _temp_dir) = create_test_env().await?;

    let lonely = service.create_node(1, NewNode::new("Lonely")).await?;
    corrupt_parent(&store, 1, lonely.id, lonely.id).await?;

    let x = service.create_node(2, NewNode::new("X")).await?;
    let y = service
        .create_node(2, NewNode::new("Y").with_parent(x.id))
        .await?;
    let z = service
        .create_node(2, NewNode::new("Z").with_parent(y.id))
        .await?;
    corrupt_parent(&store, 2, x.id, z.id).await?;

    let cycles = service.detect_cycles(None).await?;
    assert_eq!(cycles.len(), 2);
    assert_eq!(cycles[0].path, vec![lonely.id, lonely.id]);
    assert_eq!(cycles[1].owner_id, 2);
    assert_eq!(cycles[1].path, vec![x.id, y.id, z.id, x.id]);

    let fixed = service.repair_cycles(None).await?;
    assert_eq!(fixed.len(), 2);
    assert!(service.detect_cycles(None).await?.is_empty());

    // Repaired nodes were appended to their owner's root group
    let roots_two = service.get_children(2, None).await?;
    assert_eq!(roots_two.len(), 1);
    assert_eq!(roots_two[0].id, x.id);
    Ok(())
}
