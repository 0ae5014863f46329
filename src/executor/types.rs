use serde::{Deserialize, Serialize};

/// Lifecycle state of a staged executor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutorState {
    /// Queued work starts as soon as a worker is free.
    Running,
    /// Submissions are accepted and queued, but none of them starts.
    Paused,
    /// Terminal: submissions are rejected and workers have exited.
    Shutdown,
}

/// Point-in-time view of an executor, for logs and the admin endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutorStats {
    pub state: ExecutorState,
    /// Accepted but not yet started.
    pub queued: usize,
    /// Started and not yet finished.
    pub active: usize,
    pub workers: usize,
}
