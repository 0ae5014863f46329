//! Staged Executor Module
//!
//! Bounded-concurrency execution of commands on the node that owns them.
//!
//! ## Architecture Overview
//! 1. **Submission**: a (command, handler) pair is pushed onto an unbounded
//!    admission queue. Submitting never waits for a worker.
//! 2. **Gate**: before starting a job, a worker checks the executor state. A
//!    paused executor holds its workers at the gate; queued jobs wait.
//! 3. **Execution**: the handler runs on its own task, so a panic turns into a
//!    `ProcessingError::Panicked` reply instead of killing the worker.
//! 4. **Reply**: the outcome goes back to the submitter over a oneshot channel.
//!
//! ## Submodules
//! - **`queue`**: the admission queue shared by all workers.
//! - **`executor`**: worker pool, gate and pause/resume/shutdown lifecycle.
//! - **`handler`**: what runs for a job (`DirectHandler` applies to a store).
//! - **`types`**: state and stats reported to the admin endpoints.

pub mod executor;
pub mod handler;
pub mod queue;
pub mod types;

pub use executor::StagedExecutor;
pub use handler::{CommandHandler, DirectHandler, handler_fn};
pub use types::{ExecutorState, ExecutorStats};
