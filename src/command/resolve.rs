//! Command resolution against the cluster topology.
//!
//! Runs on the coordinator. Every kind either delegates to exactly one node, or
//! fans out to several nodes and merges their partial results; it never
//! touches local storage directly.
//!
//! | Kind                                   | Route                          |
//! |----------------------------------------|--------------------------------|
//! | get/put/remove/update value            | owner of the key               |
//! | get values                             | owners of each key subset      |
//! | get keys, range, predicate, remove bucket | every node of the bucket's cluster |
//! | get buckets                            | this node                      |
//! | import/export backup                   | this node, in its local cluster |

use super::types::{Command, CommandKind, CommandResult};
use crate::communication::node::Node;
use crate::error::{ClusterResult, ProcessingError};
use crate::router::Router;
use crate::storage::types::Key;

use std::collections::{BTreeMap, BTreeSet};
use tokio::task::JoinSet;

impl Command {
    pub async fn resolve(&self, router: &Router) -> ClusterResult<CommandResult> {
        tracing::debug!("Resolving {} ({})", self.name(), self.id);

        // Unknown conditions fail here, whatever the owners hold.
        if let Some(predicate) = self.predicate() {
            router.operators().condition(&predicate.condition)?;
        }

        match &self.kind {
            CommandKind::GetBuckets => router.get_local_node().send(self.clone()).await,

            CommandKind::GetValue { bucket, key, .. }
            | CommandKind::PutValue { bucket, key, .. }
            | CommandKind::RemoveValue { bucket, key }
            | CommandKind::UpdateValue { bucket, key, .. } => {
                let node = router.route_to_node_for(bucket, key)?;
                node.send(self.clone()).await
            }

            CommandKind::GetValues { bucket, keys, .. } => {
                let routes = router.route_to_nodes_for(bucket, keys)?;
                let sends = routes
                    .into_iter()
                    .map(|(node, node_keys)| {
                        let scoped = self.scoped(node_keys);
                        (node, scoped)
                    })
                    .collect();

                let mut merged = BTreeMap::new();
                for partial in fan_out(sends).await? {
                    merged.extend(partial.into_values()?);
                }
                Ok(CommandResult::Values(merged))
            }

            CommandKind::GetKeys { bucket } => {
                let mut merged = BTreeSet::new();
                for partial in self.broadcast(router, bucket).await? {
                    merged.extend(partial.into_keys()?);
                }
                Ok(CommandResult::Keys(merged))
            }

            CommandKind::PredicateQuery { bucket, .. } => {
                let mut merged = BTreeMap::new();
                for partial in self.broadcast(router, bucket).await? {
                    merged.extend(partial.into_values()?);
                }
                Ok(CommandResult::Values(merged))
            }

            CommandKind::RangeQuery { bucket, range, .. } => {
                let comparator = router.operators().comparator(range.comparator_name())?;

                let mut merged: Vec<(Key, _)> = Vec::new();
                for partial in self.broadcast(router, bucket).await? {
                    merged.extend(partial.into_entries()?);
                }
                merged.sort_by(|(a, _), (b, _)| comparator(a, b));
                if range.limit > 0 {
                    merged.truncate(range.limit);
                }
                Ok(CommandResult::Entries(merged))
            }

            CommandKind::RemoveBucket { bucket } => {
                self.broadcast(router, bucket).await?;
                Ok(CommandResult::Done)
            }

            CommandKind::ImportBackup { .. } | CommandKind::ExportBackup { .. } => {
                let node = router.route_to_local_node()?;
                node.send(self.clone()).await
            }
        }
    }

    async fn broadcast(&self, router: &Router, bucket: &str) -> ClusterResult<Vec<CommandResult>> {
        let nodes = router.route_to_cluster_nodes(bucket)?;
        fan_out(nodes.into_iter().map(|node| (node, self.clone())).collect()).await
    }
}

/// Sends every command to its node concurrently and collects the results.
///
/// The first failure wins: the remaining sends are abandoned (dropping the set
/// aborts them) and the error is returned as is.
async fn fan_out(sends: Vec<(Node, Command)>) -> ClusterResult<Vec<CommandResult>> {
    let mut tasks = JoinSet::new();
    for (node, command) in sends {
        tasks.spawn(async move { node.send(command).await });
    }

    let mut results = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(e)) => {
                tracing::warn!("Fan-out aborted: {}", e);
                return Err(e);
            }
            Err(e) => return Err(ProcessingError::Panicked(e.to_string()).into()),
        }
    }
    Ok(results)
}
