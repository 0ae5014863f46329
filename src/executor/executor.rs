//! Staged Executor
//!
//! A fixed pool of worker tasks draining one admission queue. Each job is a
//! (command, handler) pair; its result goes back to the submitter.
//!
//! ## Pause / Resume
//! Every worker passes through a **gate** before starting a job. The gate holds
//! the executor state and the number of active jobs under one lock, so:
//! - once `pause` has flipped the state, no job can start;
//! - `pause` returns when the active count drops to zero, i.e. when everything
//!   that had already started has finished. Nothing is interrupted.
//!
//! Submissions never look at the pause state: while paused they keep queueing
//! and start once `resume` reopens the gate.

use super::handler::CommandHandler;
use super::queue::{AdmissionQueue, Job};
use super::types::{ExecutorState, ExecutorStats};
use crate::command::{Command, CommandResult};
use crate::error::ProcessingError;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

struct Gate {
    state: ExecutorState,
    /// Accepted but not yet started.
    queued: usize,
    /// Started and not yet finished.
    active: usize,
}

pub struct StagedExecutor {
    worker_count: usize,
    queue: AdmissionQueue,
    gate: Mutex<Gate>,
    /// Wakes workers held at the gate (resume, shutdown).
    resumed: Notify,
    /// Wakes `pause` callers when the last active job finishes.
    idle: Notify,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl StagedExecutor {
    /// Creates the executor and spawns its workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(worker_count: usize) -> Arc<Self> {
        let worker_count = worker_count.max(1);
        let executor = Arc::new(Self {
            worker_count,
            queue: AdmissionQueue::new(),
            gate: Mutex::new(Gate {
                state: ExecutorState::Running,
                queued: 0,
                active: 0,
            }),
            resumed: Notify::new(),
            idle: Notify::new(),
            handles: Mutex::new(Vec::with_capacity(worker_count)),
        });

        let handles = (0..worker_count)
            .map(|worker_id| {
                let executor = executor.clone();
                tokio::spawn(async move {
                    executor.worker_loop(worker_id).await;
                })
            })
            .collect();
        *executor.handles.lock() = handles;

        tracing::info!("Staged executor started with {} workers", worker_count);
        executor
    }

    /// Queues a command and returns the channel its result will arrive on.
    ///
    /// Never blocks, and succeeds whether the executor is running or paused.
    /// Fails only after shutdown.
    pub fn submit(
        &self,
        command: Command,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<oneshot::Receiver<Result<CommandResult, ProcessingError>>, ProcessingError> {
        let (reply, receiver) = oneshot::channel();

        {
            let mut gate = self.gate.lock();
            if gate.state == ExecutorState::Shutdown {
                return Err(ProcessingError::Shutdown);
            }
            gate.queued += 1;
        }

        tracing::trace!("Queued {} ({})", command.name(), command.id);
        let job = Job {
            command,
            handler,
            reply,
        };
        if self.queue.push(job).is_err() {
            self.gate.lock().queued -= 1;
            return Err(ProcessingError::Shutdown);
        }

        Ok(receiver)
    }

    /// Submits a command and waits for its result.
    pub async fn process(
        &self,
        command: Command,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<CommandResult, ProcessingError> {
        let receiver = self.submit(command, handler)?;
        receiver.await.map_err(|_| ProcessingError::Shutdown)?
    }

    /// Stops new jobs from starting and waits for active ones to finish.
    pub async fn pause(&self) {
        {
            let mut gate = self.gate.lock();
            if gate.state == ExecutorState::Running {
                gate.state = ExecutorState::Paused;
                tracing::info!(
                    "Pausing executor ({} active, {} queued)",
                    gate.active,
                    gate.queued
                );
            }
        }

        loop {
            let idle = self.idle.notified();
            if self.gate.lock().active == 0 {
                break;
            }
            idle.await;
        }

        tracing::info!("Executor paused");
    }

    /// Lets queued jobs start again.
    pub fn resume(&self) {
        {
            let mut gate = self.gate.lock();
            if gate.state != ExecutorState::Paused {
                return;
            }
            gate.state = ExecutorState::Running;
            tracing::info!("Resuming executor ({} queued)", gate.queued);
        }
        self.resumed.notify_waiters();
    }

    /// Rejects further submissions, fails jobs that have not started yet with
    /// `ProcessingError::Shutdown`, and waits for workers to exit. Active jobs
    /// run to completion.
    pub async fn shutdown(&self) {
        {
            let mut gate = self.gate.lock();
            if gate.state == ExecutorState::Shutdown {
                return;
            }
            gate.state = ExecutorState::Shutdown;
        }
        self.queue.close();
        self.resumed.notify_waiters();

        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Executor worker ended abnormally: {}", e);
            }
        }

        tracing::info!("Staged executor shut down");
    }

    pub fn stats(&self) -> ExecutorStats {
        let gate = self.gate.lock();
        ExecutorStats {
            state: gate.state,
            queued: gate.queued,
            active: gate.active,
            workers: self.worker_count,
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.gate.lock().state
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ExecutorState::Paused
    }

    async fn worker_loop(&self, worker_id: usize) {
        tracing::debug!("Worker {} started", worker_id);

        while let Some(job) = self.queue.pop().await {
            if !self.admit().await {
                let _ = job.reply.send(Err(ProcessingError::Shutdown));
                continue;
            }

            self.run(worker_id, job).await;
            self.finish();
        }

        tracing::debug!("Worker {} stopped", worker_id);
    }

    /// Waits at the gate until the job may start. Returns `false` if the
    /// executor shut down instead.
    async fn admit(&self) -> bool {
        loop {
            // Registered before checking the state so a resume landing in
            // between is not missed.
            let resumed = self.resumed.notified();
            {
                let mut gate = self.gate.lock();
                match gate.state {
                    ExecutorState::Running => {
                        gate.queued -= 1;
                        gate.active += 1;
                        return true;
                    }
                    ExecutorState::Shutdown => {
                        gate.queued -= 1;
                        return false;
                    }
                    ExecutorState::Paused => {}
                }
            }
            resumed.await;
        }
    }

    async fn run(&self, worker_id: usize, job: Job) {
        let Job {
            command,
            handler,
            reply,
        } = job;
        let name = command.name();
        let id = command.id.clone();

        tracing::trace!("Worker {} running {} ({})", worker_id, name, id);

        // A separate task keeps a panicking handler from taking the worker down.
        let outcome = match tokio::spawn(handler.handle(command)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Worker {}: {} ({}) panicked: {}", worker_id, name, id, e);
                Err(ProcessingError::Panicked(e.to_string()))
            }
        };

        if let Err(e) = &outcome {
            tracing::debug!("Worker {}: {} ({}) failed: {}", worker_id, name, id, e);
        }
        if reply.send(outcome).is_err() {
            tracing::trace!("Submitter of {} ({}) went away", name, id);
        }
    }

    fn finish(&self) {
        let mut gate = self.gate.lock();
        gate.active -= 1;
        if gate.active == 0 {
            self.idle.notify_waiters();
        }
    }
}
