//! Routing Module
//!
//! Decides which node(s) a command goes to.
//!
//! ## Ownership Model
//! 1. **Bucket -> cluster**: a configured pin, otherwise the bucket's hash picks
//!    one of the clusters sorted by name.
//! 2. **Key -> partition**: `hash(bucket, key) % partitions`.
//! 3. **Partition -> node**: `partition % n` over the cluster's nodes sorted by id.
//!
//! Lookups fail with a missing-route error when no cluster exists, the owning
//! cluster has no nodes, or this process is not part of a local cluster.

pub mod partitioner;
pub mod router;
pub mod table;

pub use router::Router;
pub use table::RoutingTable;

#[cfg(test)]
mod tests;
