//! Admission Queue
//!
//! Unbounded FIFO between submitters and workers. Pushing never blocks and
//! never depends on the executor being paused; it only fails once the queue
//! has been closed for shutdown. Workers take turns popping from the shared
//! receiver.

use super::handler::CommandHandler;
use crate::command::{Command, CommandResult};
use crate::error::ProcessingError;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

pub type Reply = oneshot::Sender<Result<CommandResult, ProcessingError>>;

/// A queued (command, handler) pair and the channel its result goes back on.
pub struct Job {
    pub command: Command,
    pub handler: Arc<dyn CommandHandler>,
    pub reply: Reply,
}

pub struct AdmissionQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>,
}

impl AdmissionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
        }
    }

    /// Enqueues `job`, or hands it back if the queue is closed.
    pub fn push(&self, job: Job) -> Result<(), Job> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(job).map_err(|rejected| rejected.0),
            None => Err(job),
        }
    }

    /// Waits for the next job. Returns `None` once the queue is closed and
    /// drained.
    pub async fn pop(&self) -> Option<Job> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Stops accepting jobs. Jobs already queued can still be popped.
    pub fn close(&self) {
        self.sender.lock().take();
    }
}

impl Default for AdmissionQueue {
    fn default() -> Self {
        Self::new()
    }
}
