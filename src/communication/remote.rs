//! Remote dispatch.
//!
//! A remote node serializes the command, hands the bytes to a `Transport`,
//! and decodes the reply. Transport failures become communication errors;
//! a decoded `Err` is the remote node's processing error, passed through as is.
//! Nothing is retried here.

use super::node::{ProcessFuture, Processor};
use super::protocol::{self, CONTENT_TYPE_BINCODE, ENDPOINT_INTERNAL_COMMAND};
use crate::cluster::types::NodeId;
use crate::command::Command;
use crate::error::{ClusterError, CommunicationError};

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, CommunicationError>> + Send + 'a>>;

/// Request/reply primitive between nodes: bytes in, bytes out.
pub trait Transport: Send + Sync {
    fn invoke(&self, node: &NodeId, address: SocketAddr, payload: Vec<u8>) -> TransportFuture<'_>;
}

pub struct RemoteProcessor {
    node: NodeId,
    address: SocketAddr,
    transport: Arc<dyn Transport>,
}

impl RemoteProcessor {
    pub fn new(node: NodeId, address: SocketAddr, transport: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            node,
            address,
            transport,
        })
    }

    fn protocol_error(&self, reason: impl ToString) -> ClusterError {
        CommunicationError::Protocol {
            node: self.node.to_string(),
            reason: reason.to_string(),
        }
        .into()
    }
}

impl Processor for RemoteProcessor {
    fn process(&self, command: Command) -> ProcessFuture<'_> {
        Box::pin(async move {
            let payload = protocol::encode_command(&command).map_err(|e| self.protocol_error(e))?;
            let bytes = self
                .transport
                .invoke(&self.node, self.address, payload)
                .await
                .inspect_err(|e| {
                    tracing::warn!("{} ({}) to node {} failed: {}", command.name(), command.id, self.node, e)
                })?;
            let reply = protocol::decode_reply(&bytes).map_err(|e| self.protocol_error(e))?;
            reply.map_err(ClusterError::from)
        })
    }

    fn is_local(&self) -> bool {
        false
    }
}

/// Node-to-node transport over HTTP (`POST /internal/command`).
pub struct HttpTransport {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            http_client: reqwest::Client::new(),
            timeout,
        })
    }

    async fn post(
        &self,
        node: &NodeId,
        address: SocketAddr,
        payload: Vec<u8>,
    ) -> Result<Vec<u8>, CommunicationError> {
        let url = format!("http://{}{}", address, ENDPOINT_INTERNAL_COMMAND);

        let response = self
            .http_client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE_BINCODE)
            .body(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CommunicationError::Unreachable {
                node: node.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CommunicationError::Protocol {
                node: node.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CommunicationError::Unreachable {
                node: node.to_string(),
                reason: e.to_string(),
            })?;
        Ok(body.to_vec())
    }
}

impl Transport for HttpTransport {
    fn invoke(&self, node: &NodeId, address: SocketAddr, payload: Vec<u8>) -> TransportFuture<'_> {
        let node = node.clone();
        Box::pin(async move { self.post(&node, address, payload).await })
    }
}
