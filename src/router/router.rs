use super::table::RoutingTable;
use crate::communication::node::Node;
use crate::error::MissingRouteError;
use crate::storage::operators::Operators;
use crate::storage::types::Key;

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Maps buckets and keys to owning nodes.
///
/// Holds the current `RoutingTable` behind an `Arc` that is replaced
/// wholesale by `update`. Every lookup works on a single snapshot, so a
/// concurrent update is either entirely visible to it or not at all.
pub struct Router {
    local_node: Node,
    table: RwLock<Arc<RoutingTable>>,
    operators: Arc<Operators>,
}

impl Router {
    pub fn new(local_node: Node, table: RoutingTable, operators: Arc<Operators>) -> Arc<Self> {
        Arc::new(Self {
            local_node,
            table: RwLock::new(Arc::new(table)),
            operators,
        })
    }

    /// Installs a new routing table. Resolutions already running keep the
    /// snapshot they started with.
    pub fn update(&self, table: RoutingTable) {
        tracing::info!(
            "Installing routing table: {} cluster(s), {} node(s)",
            table.clusters().len(),
            table.node_count()
        );
        *self.table.write() = Arc::new(table);
    }

    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.table.read().clone()
    }

    /// Operators used when merging partial results at the coordinator.
    pub fn operators(&self) -> &Arc<Operators> {
        &self.operators
    }

    /// The node this router runs on, whatever the current table says.
    pub fn get_local_node(&self) -> Node {
        self.local_node.clone()
    }

    /// This process's node within its local cluster.
    pub fn route_to_local_node(&self) -> Result<Node, MissingRouteError> {
        self.snapshot().local_node(self.local_node.id())
    }

    pub fn route_to_node_for(&self, bucket: &str, key: &Key) -> Result<Node, MissingRouteError> {
        let node = self.snapshot().node_for(bucket, key)?;
        tracing::trace!("{}/{} -> {}", bucket, key, node.id());
        Ok(node)
    }

    pub fn route_to_nodes_for(
        &self,
        bucket: &str,
        keys: &BTreeSet<Key>,
    ) -> Result<HashMap<Node, BTreeSet<Key>>, MissingRouteError> {
        self.snapshot().nodes_for(bucket, keys)
    }

    /// Every node of the cluster owning `bucket`.
    pub fn route_to_cluster_nodes(&self, bucket: &str) -> Result<Vec<Node>, MissingRouteError> {
        self.snapshot().cluster_nodes(bucket)
    }
}
