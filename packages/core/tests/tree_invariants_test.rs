//! Property-based tests for the nested-set forest.
//!
//! Random sequences of structural operations run against a fresh service;
//! the forest must stay valid after every one of them, whether the
//! operation succeeded or was rejected.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use treeadmin_core::{
    DeletePolicy, MemoryStore, Node, TreeConfig, TreeOrderingService, TreeServiceError,
};

#[derive(Debug, Clone)]
enum Op {
    Create {
        parent: Option<usize>,
        label: String,
    },
    Move {
        node: usize,
        parent: Option<usize>,
        index: usize,
    },
    MoveBy {
        node: usize,
        delta: i64,
    },
    Delete {
        node: usize,
        cascade: bool,
    },
    Rename {
        node: usize,
        label: String,
    },
}

/// Node references are indices into the current forest, taken modulo its size.
fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (proptest::option::of(any::<usize>()), "[a-z]{1,8}")
            .prop_map(|(parent, label)| Op::Create { parent, label }),
        3 => (any::<usize>(), proptest::option::of(any::<usize>()), 0usize..6)
            .prop_map(|(node, parent, index)| Op::Move { node, parent, index }),
        2 => (any::<usize>(), -4i64..=4).prop_map(|(node, delta)| Op::MoveBy { node, delta }),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(node, cascade)| Op::Delete { node, cascade }),
        1 => (any::<usize>(), "[A-Z][a-z]{0,6}").prop_map(|(node, label)| Op::Rename { node, label }),
    ]
}

fn service(delete_policy: DeletePolicy) -> TreeOrderingService {
    let config = TreeConfig {
        delete_policy,
        ..Default::default()
    };
    TreeOrderingService::new(Arc::new(MemoryStore::new()), config).unwrap()
}

fn pick(nodes: &[Node], index: usize) -> Option<&str> {
    if nodes.is_empty() {
        None
    } else {
        Some(nodes[index % nodes.len()].id.as_str())
    }
}

/// Structure only: parent, bounds and depth per node
fn shape(nodes: &[Node]) -> BTreeMap<String, (Option<String>, i64, i64, u32)> {
    nodes
        .iter()
        .map(|n| {
            (
                n.id.clone(),
                (n.parent_id.clone(), n.left_bound, n.right_bound, n.depth),
            )
        })
        .collect()
}

/// Rejections the service is expected to produce for random input
fn expected_rejection(err: &TreeServiceError) -> bool {
    matches!(
        err,
        TreeServiceError::InvalidMove { .. } | TreeServiceError::HasChildren { .. }
    )
}

async fn apply(service: &TreeOrderingService, op: &Op) -> Result<(), TreeServiceError> {
    let nodes = service.store().load_all().await?;

    match op {
        Op::Create { parent, label } => {
            let parent_id = parent.and_then(|p| pick(&nodes, p));
            service.create(parent_id, label).await?;
        }
        Op::Move {
            node,
            parent,
            index,
        } => {
            if let Some(node_id) = pick(&nodes, *node) {
                let parent_id = parent.and_then(|p| pick(&nodes, p));
                service.move_to_position(node_id, parent_id, *index).await?;
            }
        }
        Op::MoveBy { node, delta } => {
            if let Some(node_id) = pick(&nodes, *node) {
                service.move_by(node_id, *delta).await?;
            }
        }
        Op::Delete { node, cascade } => {
            if let Some(node_id) = pick(&nodes, *node) {
                service.delete(node_id, *cascade).await?;
            }
        }
        Op::Rename { node, label } => {
            if let Some(node_id) = pick(&nodes, *node) {
                service.rename(node_id, label).await?;
            }
        }
    }

    Ok(())
}

async fn build_forest(service: &TreeOrderingService, parents: &[Option<usize>]) {
    for (i, parent) in parents.iter().enumerate() {
        let nodes = service.store().load_all().await.unwrap();
        let parent_id = parent.and_then(|p| pick(&nodes, p));
        service.create(parent_id, &format!("N{}", i)).await.unwrap();
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Every operation leaves a valid forest behind.
    #[test]
    fn random_operations_keep_forest_valid(
        ops in prop::collection::vec(op(), 1..40),
        reparent in any::<bool>(),
    ) {
        let policy = if reparent { DeletePolicy::Reparent } else { DeletePolicy::Reject };
        let service = service(policy);

        for op in &ops {
            let result = tokio_test::block_on(apply(&service, op));
            if let Err(err) = &result {
                prop_assert!(expected_rejection(err), "{:?} failed: {}", op, err);
            }
            let verified = tokio_test::block_on(service.verify());
            prop_assert!(verified.is_ok(), "{:?} broke the forest: {:?}", op, verified);
        }
    }

    /// Moving a node away and back to its old position restores every bound.
    #[test]
    fn move_and_move_back_restores_forest(
        parents in prop::collection::vec(proptest::option::of(any::<usize>()), 2..20),
        node in any::<usize>(),
        target_parent in proptest::option::of(any::<usize>()),
        target_index in 0usize..5,
    ) {
        let service = service(DeletePolicy::Reject);
        tokio_test::block_on(build_forest(&service, &parents));

        let before = tokio_test::block_on(service.store().load_all()).unwrap();
        let node_id = pick(&before, node).unwrap().to_string();
        let start = tokio_test::block_on(service.get_node(&node_id)).unwrap();
        let siblings = tokio_test::block_on(service.get_children(start.parent_id.as_deref())).unwrap();
        let start_index = siblings.iter().position(|s| s.id == node_id).unwrap();

        let destination = target_parent.and_then(|p| pick(&before, p)).map(str::to_string);
        let moved = tokio_test::block_on(
            service.move_to_position(&node_id, destination.as_deref(), target_index),
        );
        match moved {
            Ok(_) => {}
            Err(TreeServiceError::InvalidMove { .. }) => return Ok(()),
            Err(err) => return Err(TestCaseError::fail(err.to_string())),
        }

        tokio_test::block_on(service.move_to_position(
            &node_id,
            start.parent_id.as_deref(),
            start_index,
        ))
        .unwrap();

        let after = tokio_test::block_on(service.store().load_all()).unwrap();
        prop_assert_eq!(shape(&before), shape(&after));
    }

    /// After a successful move the node sits at the requested index.
    #[test]
    fn move_places_node_at_index(
        parents in prop::collection::vec(proptest::option::of(any::<usize>()), 2..20),
        node in any::<usize>(),
        target_parent in proptest::option::of(any::<usize>()),
        target_index in 0usize..8,
    ) {
        let service = service(DeletePolicy::Reject);
        tokio_test::block_on(build_forest(&service, &parents));

        let nodes = tokio_test::block_on(service.store().load_all()).unwrap();
        let node_id = pick(&nodes, node).unwrap().to_string();
        let destination = target_parent.and_then(|p| pick(&nodes, p)).map(str::to_string);

        if tokio_test::block_on(
            service.move_to_position(&node_id, destination.as_deref(), target_index),
        )
        .is_err()
        {
            return Ok(());
        }

        let children = tokio_test::block_on(service.get_children(destination.as_deref())).unwrap();
        let position = children.iter().position(|c| c.id == node_id);
        prop_assert_eq!(position, Some(target_index.min(children.len() - 1)));
    }

    /// Repeating a move is a no-op the second time.
    #[test]
    fn repeated_move_is_idempotent(
        parents in prop::collection::vec(proptest::option::of(any::<usize>()), 2..20),
        node in any::<usize>(),
        target_parent in proptest::option::of(any::<usize>()),
        target_index in 0usize..5,
    ) {
        let service = service(DeletePolicy::Reject);
        tokio_test::block_on(build_forest(&service, &parents));

        let nodes = tokio_test::block_on(service.store().load_all()).unwrap();
        let node_id = pick(&nodes, node).unwrap().to_string();
        let destination = target_parent.and_then(|p| pick(&nodes, p)).map(str::to_string);

        if tokio_test::block_on(
            service.move_to_position(&node_id, destination.as_deref(), target_index),
        )
        .is_err()
        {
            return Ok(());
        }
        let once = tokio_test::block_on(service.store().load_all()).unwrap();
        let revision = tokio_test::block_on(service.store().revision()).unwrap();

        tokio_test::block_on(
            service.move_to_position(&node_id, destination.as_deref(), target_index),
        )
        .unwrap();
        let twice = tokio_test::block_on(service.store().load_all()).unwrap();

        prop_assert_eq!(shape(&once), shape(&twice));
        prop_assert_eq!(tokio_test::block_on(service.store().revision()).unwrap(), revision);
    }

    /// Cascading delete removes exactly the subtree and closes the gap.
    #[test]
    fn cascade_delete_closes_gap(
        parents in prop::collection::vec(proptest::option::of(any::<usize>()), 1..20),
        node in any::<usize>(),
    ) {
        let service = service(DeletePolicy::Reject);
        tokio_test::block_on(build_forest(&service, &parents));

        let nodes = tokio_test::block_on(service.store().load_all()).unwrap();
        let victim = nodes[node % nodes.len()].clone();
        let subtree = (victim.right_bound - victim.left_bound + 1) / 2;

        let outcome = tokio_test::block_on(service.delete(&victim.id, true)).unwrap();
        prop_assert_eq!(outcome.removed as i64, subtree);

        let remaining = tokio_test::block_on(service.store().load_all()).unwrap();
        prop_assert_eq!(remaining.len() as i64, nodes.len() as i64 - subtree);
        prop_assert!(tokio_test::block_on(service.verify()).is_ok());
    }
}
