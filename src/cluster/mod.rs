//! Cluster & Ensemble Module
//!
//! Identity of clusters and nodes, and the static description of the ensemble
//! a node process is started with.
//!
//! ## Core Concepts
//! - **Ensemble**: every cluster known to the system.
//! - **Cluster**: a named group of nodes. Exactly one cluster is local to a process.
//! - **Node identity**: nodes are identified by their configured name (`NodeId`).
//!
//! Membership discovery and failure detection are not handled here: the
//! ensemble file is the membership, and a new routing table is installed when
//! it changes.

pub mod config;
pub mod types;
