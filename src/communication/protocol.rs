//! Node Network Protocol
//!
//! Endpoints and payloads exchanged between nodes, and between clients and a
//! coordinator node.
//!
//! Node-to-node traffic is bincode: the request body is a `Command`, the
//! response body a `RemoteReply`. Client-facing and admin endpoints speak JSON.

use crate::command::{Command, CommandResult};
use crate::error::{ClusterError, ProcessingError};

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Public endpoint: resolve a JSON command with this node as coordinator.
pub const ENDPOINT_COMMAND: &str = "/commands";
/// Internal endpoint: apply a bincode command on this node's executor.
pub const ENDPOINT_INTERNAL_COMMAND: &str = "/internal/command";
pub const ENDPOINT_EXECUTOR_PAUSE: &str = "/internal/executor/pause";
pub const ENDPOINT_EXECUTOR_RESUME: &str = "/internal/executor/resume";
pub const ENDPOINT_EXECUTOR_STATS: &str = "/internal/executor/stats";

pub const CONTENT_TYPE_BINCODE: &str = "application/octet-stream";

// --- Payloads ---

/// What a node answers to `ENDPOINT_INTERNAL_COMMAND`. A processing failure is
/// a successful exchange carrying an `Err`, never an HTTP error status.
pub type RemoteReply = Result<CommandResult, ProcessingError>;

pub fn encode_command(command: &Command) -> bincode::Result<Vec<u8>> {
    bincode::serialize(command)
}

pub fn decode_command(bytes: &[u8]) -> bincode::Result<Command> {
    bincode::deserialize(bytes)
}

pub fn encode_reply(reply: &RemoteReply) -> bincode::Result<Vec<u8>> {
    bincode::serialize(reply)
}

pub fn decode_reply(bytes: &[u8]) -> bincode::Result<RemoteReply> {
    bincode::deserialize(bytes)
}

/// Error body of the JSON endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// `missing_route`, `communication` or `processing`.
    pub kind: String,
    pub message: String,
}

impl From<&ClusterError> for ErrorResponse {
    fn from(e: &ClusterError) -> Self {
        let kind = match e {
            ClusterError::MissingRoute(_) => "missing_route",
            ClusterError::Communication(_) => "communication",
            ClusterError::Processing(_) => "processing",
        };
        Self {
            kind: kind.to_string(),
            message: e.to_string(),
        }
    }
}
