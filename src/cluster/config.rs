//! Node and Ensemble Configuration
//!
//! A node process is configured in two layers:
//! - **Command line** (`NodeArgs`): who this process is and how it runs.
//! - **Ensemble file** (`EnsembleConfig`, JSON): every cluster, its members and
//!   optional bucket placement pins. All nodes of the ensemble share this file.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PARTITIONS: u32 = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read ensemble file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse ensemble file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate cluster '{0}'")]
    DuplicateCluster(String),

    #[error("duplicate node '{0}'")]
    DuplicateNode(String),

    #[error("bucket '{bucket}' is pinned to unknown cluster '{cluster}'")]
    UnknownPlacement { bucket: String, cluster: String },

    #[error("partition count must be greater than zero")]
    NoPartitions,
}

/// Clustered document store node.
#[derive(Parser, Debug, Clone)]
#[command(name = "clustered-store")]
#[command(author, version, about, long_about = None)]
pub struct NodeArgs {
    /// Name of this node, as listed in the ensemble file.
    #[arg(long)]
    pub name: String,

    /// Name of the cluster this node belongs to.
    #[arg(long)]
    pub cluster: String,

    /// Address the node's HTTP endpoints listen on.
    #[arg(long, default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Ensemble description (JSON).
    #[arg(long)]
    pub ensemble: PathBuf,

    /// Number of staged executor workers.
    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    /// Directory holding bucket backups.
    #[arg(long, default_value = "backups")]
    pub backup_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemberConfig {
    pub name: String,
    pub address: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfig {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<MemberConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnsembleConfig {
    #[serde(default = "default_partitions")]
    pub partitions: u32,
    pub clusters: Vec<ClusterConfig>,
    /// Bucket name -> cluster name.
    #[serde(default)]
    pub buckets: BTreeMap<String, String>,
}

fn default_partitions() -> u32 {
    DEFAULT_PARTITIONS
}

impl EnsembleConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw)?;
        tracing::info!(
            "Loaded ensemble from {}: {} cluster(s), {} partitions",
            path.display(),
            config.clusters.len(),
            config.partitions
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: EnsembleConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::NoPartitions);
        }

        let mut clusters = HashSet::new();
        let mut nodes = HashSet::new();
        for cluster in &self.clusters {
            if !clusters.insert(cluster.name.as_str()) {
                return Err(ConfigError::DuplicateCluster(cluster.name.clone()));
            }
            for node in &cluster.nodes {
                if !nodes.insert(node.name.as_str()) {
                    return Err(ConfigError::DuplicateNode(node.name.clone()));
                }
            }
        }

        for (bucket, cluster) in &self.buckets {
            if !clusters.contains(cluster.as_str()) {
                return Err(ConfigError::UnknownPlacement {
                    bucket: bucket.clone(),
                    cluster: cluster.clone(),
                });
            }
        }

        Ok(())
    }
}
