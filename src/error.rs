//! Caller-visible Error Taxonomy
//!
//! Every failure produced while resolving or applying a command falls in one of
//! three families:
//!
//! - **Missing route**: the router cannot map a bucket, key or the local node to
//!   an owning node. Never retried here.
//! - **Communication**: a remote node could not be reached, or answered with
//!   something that is not a valid reply. Callers may retry with their own policy.
//! - **Processing**: the command reached its node but applying it failed
//!   (store failure, unsatisfiable condition, executor shut down...).
//!
//! `ProcessingError` and `StoreError` are serializable so that a remote node can
//! ship them back verbatim and the coordinator can tell them apart from
//! transport failures.

use crate::storage::error::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MissingRouteError {
    #[error("no cluster owns bucket '{bucket}'")]
    NoCluster { bucket: String },

    #[error("cluster '{cluster}' has no nodes")]
    EmptyCluster { cluster: String },

    #[error("this process does not belong to any configured local cluster")]
    NoLocalCluster,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommunicationError {
    #[error("node {node} unreachable: {reason}")]
    Unreachable { node: String, reason: String },

    #[error("protocol error talking to node {node}: {reason}")]
    Protocol { node: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("executor is shut down")]
    Shutdown,

    #[error("command task panicked: {0}")]
    Panicked(String),

    #[error("unexpected result: expected {expected}")]
    UnexpectedResult { expected: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error("missing route: {0}")]
    MissingRoute(#[from] MissingRouteError),

    #[error("communication failure: {0}")]
    Communication(#[from] CommunicationError),

    #[error("processing failure: {0}")]
    Processing(#[from] ProcessingError),
}

impl From<StoreError> for ClusterError {
    fn from(e: StoreError) -> Self {
        ClusterError::Processing(ProcessingError::Store(e))
    }
}

pub type ClusterResult<T> = Result<T, ClusterError>;
