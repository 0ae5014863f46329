//! Clustered Document Store Library
//!
//! The distributed core of a clustered key/value document store. It is the
//! foundation for the node binary (`main.rs`).
//!
//! ## Architecture Modules
//! - **`command`**: the closed set of store operations. Each command resolves
//!   itself against the cluster topology (coordinator side) and applies itself
//!   to local storage (owner side).
//! - **`router`**: maps buckets and keys to owning nodes from an atomically
//!   replaced routing table snapshot.
//! - **`communication`**: the `Node` handle and how commands reach it, either
//!   in-process or over HTTP, plus the node's HTTP endpoints.
//! - **`executor`**: the staged executor, a pausable bounded worker pool that
//!   runs commands against local storage.
//! - **`storage`**: local buckets, operator registries and backups.
//! - **`cluster`**: cluster/node identity and ensemble configuration.
//! - **`error`**: the caller-visible error families.

pub mod cluster;
pub mod command;
pub mod communication;
pub mod error;
pub mod executor;
pub mod router;
pub mod storage;
