//! Router Module Tests
//!
//! ## Test Scopes
//! - **Partitioner**: determinism and bounds.
//! - **Ownership**: single-key and multi-key routing, bucket pins.
//! - **Missing routes**: no cluster, empty cluster, no local cluster.
//! - **Snapshots**: table replacement does not disturb existing snapshots.

#[cfg(test)]
mod tests {
    use crate::cluster::config::EnsembleConfig;
    use crate::cluster::types::{Cluster, NodeId};
    use crate::command::{Command, CommandResult};
    use crate::communication::loopback::LoopbackTransport;
    use crate::communication::node::{Node, ProcessFuture, Processor};
    use crate::error::MissingRouteError;
    use crate::router::partitioner::Partitioner;
    use crate::router::{Router, RoutingTable};
    use crate::storage::operators::Operators;
    use crate::storage::types::Key;
    use std::collections::BTreeSet;
    use std::net::SocketAddr;
    use std::sync::Arc;

    struct NoopProcessor {
        local: bool,
    }

    impl Processor for NoopProcessor {
        fn process(&self, _command: Command) -> ProcessFuture<'_> {
            Box::pin(async { Ok(CommandResult::Done) })
        }

        fn is_local(&self) -> bool {
            self.local
        }
    }

    fn node(name: &str, cluster: &Cluster) -> Node {
        let port = 9000 + name.bytes().map(u16::from).sum::<u16>();
        Node::new(
            NodeId::new(name),
            SocketAddr::from(([127, 0, 0, 1], port)),
            cluster.clone(),
            Arc::new(NoopProcessor {
                local: cluster.is_local(),
            }),
        )
    }

    fn keys(count: usize) -> BTreeSet<Key> {
        (0..count).map(|i| Key::new(format!("key-{}", i))).collect()
    }

    /// "main" (local, n1..n3) and "archive" (a1).
    fn two_cluster_router() -> Arc<Router> {
        let main = Cluster::new("main", true);
        let archive = Cluster::new("archive", false);
        let local = node("n1", &main);

        let table = RoutingTable::new(64)
            .with_cluster(
                main.clone(),
                vec![local.clone(), node("n2", &main), node("n3", &main)],
            )
            .with_cluster(archive.clone(), vec![node("a1", &archive)])
            .with_placement("docs", "main")
            .with_placement("logs", "archive");

        Router::new(local, table, Operators::with_defaults())
    }

    // ============================================================
    // TEST 1: Partitioner
    // ============================================================

    #[test]
    fn test_partition_is_deterministic_and_bounded() {
        let partitioner = Partitioner::new(256);
        let key = Key::new("book_100");

        let p1 = partitioner.get_partition("docs", &key);
        let p2 = partitioner.get_partition("docs", &key);

        assert_eq!(p1, p2);
        assert!(p1 < 256);
        assert!(partitioner.bucket_slot("docs", 3) < 3);
        assert_eq!(partitioner.owner_index(7, 3), 1);
    }

    #[test]
    fn test_zero_partitions_is_clamped() {
        let partitioner = Partitioner::new(0);
        assert_eq!(partitioner.num_partitions(), 1);
        assert_eq!(partitioner.get_partition("docs", &Key::new("a")), 0);
    }

    // ============================================================
    // TEST 2: Ownership
    // ============================================================

    #[test]
    fn test_route_to_node_for_is_stable_and_within_owning_cluster() {
        let router = two_cluster_router();

        for key in keys(50) {
            let first = router.route_to_node_for("docs", &key).unwrap();
            let second = router.route_to_node_for("docs", &key).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.cluster().name(), "main");
        }

        let archived = router.route_to_node_for("logs", &Key::new("any")).unwrap();
        assert_eq!(archived.id(), &NodeId::new("a1"));
    }

    #[test]
    fn test_route_to_nodes_for_partitions_keys_disjointly() {
        // ARRANGE
        let router = two_cluster_router();
        let all = keys(100);

        // ACT
        let routes = router.route_to_nodes_for("docs", &all).unwrap();

        // ASSERT: every key exactly once, under the same owner as single routing
        let total: usize = routes.values().map(BTreeSet::len).sum();
        assert_eq!(total, all.len());

        let mut union = BTreeSet::new();
        for (node, subset) in &routes {
            assert!(!subset.is_empty());
            for key in subset {
                assert!(union.insert(key.clone()));
                assert_eq!(&router.route_to_node_for("docs", key).unwrap(), node);
            }
        }
        assert_eq!(union, all);
        assert!(routes.len() <= 3);
    }

    #[test]
    fn test_cluster_nodes_lists_every_member_of_owning_cluster() {
        let router = two_cluster_router();

        let ids: Vec<String> = router
            .route_to_cluster_nodes("docs")
            .unwrap()
            .iter()
            .map(|n| n.id().to_string())
            .collect();

        assert_eq!(ids, vec!["n1", "n2", "n3"]);
    }

    #[test]
    fn test_unpinned_buckets_hash_to_a_known_cluster() {
        let router = two_cluster_router();
        let snapshot = router.snapshot();

        for i in 0..20 {
            let bucket = format!("bucket-{}", i);
            let cluster = snapshot.cluster_for(&bucket).unwrap();
            assert!(cluster.name() == "main" || cluster.name() == "archive");
            assert_eq!(snapshot.cluster_for(&bucket).unwrap(), cluster);
        }
    }

    #[test]
    fn test_local_node_lookups() {
        let router = two_cluster_router();

        let routed = router.route_to_local_node().unwrap();
        assert_eq!(routed.id(), &NodeId::new("n1"));
        assert!(routed.is_local());
        assert_eq!(router.get_local_node(), routed);
    }

    // ============================================================
    // TEST 3: Missing routes
    // ============================================================

    #[test]
    fn test_no_cluster_is_a_missing_route() {
        let main = Cluster::new("main", true);
        let router = Router::new(node("n1", &main), RoutingTable::new(16), Operators::empty());

        assert_eq!(
            router.route_to_node_for("docs", &Key::new("a")),
            Err(MissingRouteError::NoCluster {
                bucket: "docs".to_string()
            })
        );
        assert!(router.route_to_nodes_for("docs", &keys(3)).is_err());
        assert!(router.route_to_cluster_nodes("docs").is_err());
        assert_eq!(
            router.route_to_local_node(),
            Err(MissingRouteError::NoLocalCluster)
        );
        // Still answers: the local node does not depend on the table.
        assert_eq!(router.get_local_node().id(), &NodeId::new("n1"));
    }

    #[test]
    fn test_empty_cluster_is_a_missing_route() {
        let main = Cluster::new("main", true);
        let table = RoutingTable::new(16).with_cluster(main.clone(), Vec::new());
        let router = Router::new(node("n1", &main), table, Operators::empty());

        assert_eq!(
            router.route_to_node_for("docs", &Key::new("a")),
            Err(MissingRouteError::EmptyCluster {
                cluster: "main".to_string()
            })
        );
        assert_eq!(
            router.route_to_local_node(),
            Err(MissingRouteError::NoLocalCluster)
        );
    }

    #[test]
    fn test_process_outside_local_cluster_has_no_local_route() {
        let remote = Cluster::new("remote", false);
        let outsider = node("x1", &Cluster::new("elsewhere", true));
        let table = RoutingTable::new(16).with_cluster(remote.clone(), vec![node("r1", &remote)]);
        let router = Router::new(outsider, table, Operators::empty());

        assert!(router.route_to_node_for("docs", &Key::new("a")).is_ok());
        assert_eq!(
            router.route_to_local_node(),
            Err(MissingRouteError::NoLocalCluster)
        );
    }

    // ============================================================
    // TEST 4: Snapshots and ensemble tables
    // ============================================================

    #[test]
    fn test_update_replaces_table_without_touching_old_snapshots() {
        // ARRANGE
        let router = two_cluster_router();
        let before = router.snapshot();

        // ACT: drop the archive cluster
        let main = Cluster::new("main", true);
        router.update(RoutingTable::new(64).with_cluster(main.clone(), vec![node("n1", &main)]));

        // ASSERT
        assert_eq!(before.clusters().len(), 2);
        assert_eq!(router.snapshot().clusters().len(), 1);
        let owner = router.route_to_node_for("logs", &Key::new("any")).unwrap();
        assert_eq!(owner.id(), &NodeId::new("n1"));
    }

    #[test]
    fn test_table_from_ensemble() {
        // ARRANGE
        let config = EnsembleConfig::from_json(
            r#"{
                "partitions": 32,
                "clusters": [
                    { "name": "east", "nodes": [
                        { "name": "e1", "address": "127.0.0.1:9001" },
                        { "name": "e2", "address": "127.0.0.1:9002" }
                    ]},
                    { "name": "west", "nodes": [
                        { "name": "w1", "address": "127.0.0.1:9101" }
                    ]}
                ],
                "buckets": { "orders": "west" }
            }"#,
        )
        .unwrap();
        let east = Cluster::new("east", true);
        let local = node("e1", &east);

        // ACT
        let table = RoutingTable::from_ensemble(&config, &local, LoopbackTransport::new());

        // ASSERT
        assert_eq!(table.partitioner().num_partitions(), 32);
        assert_eq!(table.node_count(), 3);
        assert_eq!(table.local_cluster().map(Cluster::name), Some("east"));
        assert!(table.local_node(&NodeId::new("e1")).unwrap().is_local());

        let east_nodes = table.nodes_of(&east).unwrap();
        assert_eq!(east_nodes.len(), 2);
        assert!(east_nodes[0].is_local());
        assert!(!east_nodes[1].is_local());

        let orders = table.node_for("orders", &Key::new("1")).unwrap();
        assert_eq!(orders.id(), &NodeId::new("w1"));
        assert!(!orders.is_local());
    }
}
