use super::node::{ProcessFuture, Processor};
use crate::command::{Command, CommandResult};
use crate::error::{ClusterError, ProcessingError};
use crate::executor::handler::{CommandHandler, DirectHandler};
use crate::executor::StagedExecutor;
use crate::storage::Store;

use std::sync::Arc;

/// In-process dispatch: commands go straight into this node's staged executor,
/// bound to its own store.
pub struct LocalProcessor {
    executor: Arc<StagedExecutor>,
    handler: Arc<dyn CommandHandler>,
}

impl LocalProcessor {
    pub fn new(executor: Arc<StagedExecutor>, store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            executor,
            handler: DirectHandler::new(store),
        })
    }

    /// Runs a command on the local executor. Also used to serve commands
    /// received from other nodes.
    pub async fn execute(&self, command: Command) -> Result<CommandResult, ProcessingError> {
        self.executor.process(command, self.handler.clone()).await
    }

    pub fn executor(&self) -> &Arc<StagedExecutor> {
        &self.executor
    }
}

impl Processor for LocalProcessor {
    fn process(&self, command: Command) -> ProcessFuture<'_> {
        Box::pin(async move { self.execute(command).await.map_err(ClusterError::from) })
    }

    fn is_local(&self) -> bool {
        true
    }
}
