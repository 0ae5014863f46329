//! Command Handlers
//!
//! A handler is what a staged executor actually runs for a queued command. The
//! production handler, `DirectHandler`, applies the command to a store; any
//! async closure can be used as a handler through `handler_fn`.

use crate::command::{Command, CommandResult};
use crate::error::ProcessingError;
use crate::storage::Store;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type-erased future returned by handlers, so that different handlers can sit
/// in the same queue.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<CommandResult, ProcessingError>> + Send>>;

pub trait CommandHandler: Send + Sync + 'static {
    fn handle(&self, command: Command) -> HandlerFuture;
}

/// Applies commands to a store.
///
/// Store access is synchronous, so it runs on tokio's blocking pool and the
/// executor's workers only await it.
pub struct DirectHandler {
    store: Arc<dyn Store>,
}

impl DirectHandler {
    pub fn new(store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

impl CommandHandler for DirectHandler {
    fn handle(&self, command: Command) -> HandlerFuture {
        let store = self.store.clone();
        Box::pin(async move {
            match tokio::task::spawn_blocking(move || command.apply(store.as_ref())).await {
                Ok(result) => result.map_err(ProcessingError::from),
                Err(e) => Err(ProcessingError::Panicked(e.to_string())),
            }
        })
    }
}

pub struct FnHandler<F> {
    handler: F,
}

impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Command) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CommandResult, ProcessingError>> + Send + 'static,
{
    fn handle(&self, command: Command) -> HandlerFuture {
        Box::pin((self.handler)(command))
    }
}

/// Wraps an async closure into a handler.
pub fn handler_fn<F, Fut>(handler: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Command) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<CommandResult, ProcessingError>> + Send + 'static,
{
    Arc::new(FnHandler { handler })
}
