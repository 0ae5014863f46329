use super::partitioner::Partitioner;
use crate::cluster::config::EnsembleConfig;
use crate::cluster::types::{Cluster, NodeId};
use crate::communication::node::Node;
use crate::communication::remote::{RemoteProcessor, Transport};
use crate::error::MissingRouteError;
use crate::storage::types::Key;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Immutable ownership snapshot: clusters, their nodes, and bucket pins.
///
/// Never mutated once installed in a router; a topology change builds a new
/// table and swaps it in.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    partitioner: Partitioner,
    /// Sorted by name.
    clusters: Vec<Cluster>,
    /// Cluster name -> nodes sorted by id.
    nodes: HashMap<String, Vec<Node>>,
    /// Bucket name -> cluster name.
    placements: BTreeMap<String, String>,
}

impl RoutingTable {
    pub fn new(partitions: u32) -> Self {
        Self {
            partitioner: Partitioner::new(partitions),
            clusters: Vec::new(),
            nodes: HashMap::new(),
            placements: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a cluster and its members.
    ///
    /// The first cluster flagged local is the local cluster of the table.
    pub fn with_cluster(mut self, cluster: Cluster, mut nodes: Vec<Node>) -> Self {
        nodes.sort();
        nodes.dedup();
        self.nodes.insert(cluster.name().to_string(), nodes);
        self.clusters.retain(|existing| existing != &cluster);
        self.clusters.push(cluster);
        self.clusters.sort_by(|a, b| a.name().cmp(b.name()));
        self
    }

    /// Pins `bucket` to the cluster named `cluster` instead of hashing it.
    pub fn with_placement(mut self, bucket: &str, cluster: &str) -> Self {
        self.placements.insert(bucket.to_string(), cluster.to_string());
        self
    }

    /// Builds the table described by the ensemble file, as seen from
    /// `local_node`.
    ///
    /// The cluster named like the local node's cluster is the local one, and
    /// the member matching the local node id is `local_node` itself. Every
    /// other member is a remote node reached through `transport`.
    pub fn from_ensemble(
        config: &EnsembleConfig,
        local_node: &Node,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let local_cluster = local_node.cluster().name();

        let mut table = Self::new(config.partitions);
        for cluster_config in &config.clusters {
            let cluster = Cluster::new(&cluster_config.name, cluster_config.name == local_cluster);
            let nodes = cluster_config
                .nodes
                .iter()
                .map(|member| {
                    let id = NodeId::new(&member.name);
                    if cluster.is_local() && &id == local_node.id() {
                        local_node.clone()
                    } else {
                        let processor = RemoteProcessor::new(id.clone(), member.address, transport.clone());
                        Node::new(id, member.address, cluster.clone(), processor)
                    }
                })
                .collect();
            table = table.with_cluster(cluster, nodes);
        }
        for (bucket, cluster) in &config.buckets {
            table = table.with_placement(bucket, cluster);
        }

        tracing::info!(
            "Built routing table: {} cluster(s), {} node(s), {} partitions",
            table.clusters.len(),
            table.node_count(),
            table.partitioner.num_partitions()
        );
        table
    }

    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn local_cluster(&self) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.is_local())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }

    /// Cluster owning `bucket`: its pin if any, otherwise by hash.
    pub fn cluster_for(&self, bucket: &str) -> Result<&Cluster, MissingRouteError> {
        if let Some(pinned) = self.placements.get(bucket)
            && let Some(cluster) = self.clusters.iter().find(|c| c.name() == pinned)
        {
            return Ok(cluster);
        }

        if self.clusters.is_empty() {
            return Err(MissingRouteError::NoCluster {
                bucket: bucket.to_string(),
            });
        }
        let slot = self.partitioner.bucket_slot(bucket, self.clusters.len());
        Ok(&self.clusters[slot])
    }

    pub fn nodes_of(&self, cluster: &Cluster) -> Result<&[Node], MissingRouteError> {
        match self.nodes.get(cluster.name()) {
            Some(nodes) if !nodes.is_empty() => Ok(nodes),
            _ => Err(MissingRouteError::EmptyCluster {
                cluster: cluster.name().to_string(),
            }),
        }
    }

    pub fn node_for(&self, bucket: &str, key: &Key) -> Result<Node, MissingRouteError> {
        let nodes = self.nodes_of(self.cluster_for(bucket)?)?;
        Ok(self.owner(nodes, bucket, key).clone())
    }

    /// Splits `keys` by owner. Every key lands under exactly one node; nodes
    /// owning none of the keys are absent.
    pub fn nodes_for(
        &self,
        bucket: &str,
        keys: &BTreeSet<Key>,
    ) -> Result<HashMap<Node, BTreeSet<Key>>, MissingRouteError> {
        let nodes = self.nodes_of(self.cluster_for(bucket)?)?;

        let mut routes: HashMap<Node, BTreeSet<Key>> = HashMap::new();
        for key in keys {
            let owner = self.owner(nodes, bucket, key);
            routes.entry(owner.clone()).or_default().insert(key.clone());
        }
        Ok(routes)
    }

    pub fn cluster_nodes(&self, bucket: &str) -> Result<Vec<Node>, MissingRouteError> {
        Ok(self.nodes_of(self.cluster_for(bucket)?)?.to_vec())
    }

    /// `node` as listed in the local cluster.
    pub fn local_node(&self, node: &NodeId) -> Result<Node, MissingRouteError> {
        let cluster = self.local_cluster().ok_or(MissingRouteError::NoLocalCluster)?;
        self.nodes
            .get(cluster.name())
            .and_then(|nodes| nodes.iter().find(|candidate| candidate.id() == node))
            .cloned()
            .ok_or(MissingRouteError::NoLocalCluster)
    }

    fn owner<'a>(&self, nodes: &'a [Node], bucket: &str, key: &Key) -> &'a Node {
        let partition = self.partitioner.get_partition(bucket, key);
        &nodes[self.partitioner.owner_index(partition, nodes.len())]
    }
}
