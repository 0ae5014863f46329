use super::local::LocalProcessor;
use super::protocol;
use super::remote::{Transport, TransportFuture};
use crate::cluster::types::NodeId;
use crate::error::CommunicationError;

use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// In-process transport: delivers encoded commands to processors registered
/// under their node id, going through the same wire encoding as HTTP.
///
/// Lets several nodes share one process (embedded ensembles, tests) while
/// still exercising remote dispatch. A node that is not registered is
/// unreachable.
pub struct LoopbackTransport {
    processors: DashMap<NodeId, Arc<LocalProcessor>>,
}

impl LoopbackTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            processors: DashMap::new(),
        })
    }

    pub fn register(&self, node: NodeId, processor: Arc<LocalProcessor>) {
        tracing::debug!("Registered loopback node {}", node);
        self.processors.insert(node, processor);
    }

    /// Makes `node` unreachable.
    pub fn unregister(&self, node: &NodeId) -> bool {
        self.processors.remove(node).is_some()
    }

    async fn deliver(&self, node: NodeId, payload: Vec<u8>) -> Result<Vec<u8>, CommunicationError> {
        let processor = self
            .processors
            .get(&node)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CommunicationError::Unreachable {
                node: node.to_string(),
                reason: "not registered on loopback transport".to_string(),
            })?;

        let protocol_error = |reason: String| CommunicationError::Protocol {
            node: node.to_string(),
            reason,
        };

        let command = protocol::decode_command(&payload).map_err(|e| protocol_error(e.to_string()))?;
        let reply = processor.execute(command).await;
        protocol::encode_reply(&reply).map_err(|e| protocol_error(e.to_string()))
    }
}

impl Transport for LoopbackTransport {
    fn invoke(&self, node: &NodeId, _address: SocketAddr, payload: Vec<u8>) -> TransportFuture<'_> {
        Box::pin(self.deliver(node.clone(), payload))
    }
}
