use crate::cluster::types::{Cluster, NodeId};
use crate::command::{Command, CommandResult};
use crate::error::ClusterResult;

use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

pub type ProcessFuture<'a> = Pin<Box<dyn Future<Output = ClusterResult<CommandResult>> + Send + 'a>>;

/// Where a node's commands actually go: in-process executor or transport.
pub trait Processor: Send + Sync {
    fn process(&self, command: Command) -> ProcessFuture<'_>;

    fn is_local(&self) -> bool;
}

/// Handle on a cluster member.
///
/// Cheap to clone. Identity (equality, hashing, ordering) is the node id only,
/// so nodes can key the per-node maps built by the router.
#[derive(Clone)]
pub struct Node {
    id: NodeId,
    address: SocketAddr,
    cluster: Cluster,
    processor: Arc<dyn Processor>,
}

impl Node {
    pub fn new(
        id: NodeId,
        address: SocketAddr,
        cluster: Cluster,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            id,
            address,
            cluster,
            processor,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn is_local(&self) -> bool {
        self.processor.is_local()
    }

    /// Runs `command` on this node and waits for its result.
    ///
    /// Errors keep their family: a transport failure is a communication error,
    /// a failure while applying the command is a processing error, whether the
    /// node is local or remote.
    pub async fn send(&self, command: Command) -> ClusterResult<CommandResult> {
        tracing::debug!(
            "Sending {} ({}) to node {} [{}]",
            command.name(),
            command.id,
            self.id,
            if self.is_local() { "local" } else { "remote" }
        );
        self.processor.process(command).await
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("cluster", &self.cluster.name())
            .field("local", &self.is_local())
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.address)
    }
}
