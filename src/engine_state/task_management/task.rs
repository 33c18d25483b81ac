//! # Task System Core Types
//!
//! This module defines the fundamental building blocks of the task system,
//! which executes work on background threads and reports back to the control thread.
//!
//! ## Core Components
//! - `Task`: A unit of work that can be executed on a worker thread
//! - `TaskTicket`: The version stamp a task receives when it is published
//! - `CompletedTask`: A task's output together with its ticket and timing
//! - `CancelFlag`: Cooperative cancellation shared between the two sides
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and published via `TaskManager::publish_task()`, which hands
//!    back a `TaskTicket`
//! 2. The task's `process()` method is called on a worker thread
//! 3. The output travels back as a `CompletedTask` carrying the same ticket
//! 4. The control thread compares the ticket with what it expects and either
//!    uses or discards the output
//!
//! ## Thread Safety
//! - `Task` and its output must be `Send` to cross threads
//! - Tasks own all the data they need; nothing is shared except a `CancelFlag`

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// A trait representing a unit of work that can be executed on a worker thread.
///
/// # Implementation Guidelines
/// - Should be relatively coarse-grained to amortize task scheduling overhead
/// - Should own its input; workers never touch control-thread state
pub trait Task: Send + 'static {
    /// What the task hands back to the control thread.
    type Output: Send + 'static;

    /// Runs the task. Errors belong in `Output`.
    fn process(self) -> Self::Output;
}

/// Version stamp assigned to a task at publish time.
///
/// Tickets from one `TaskManager` are strictly increasing, so a later ticket always
/// belongs to a later dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskTicket {
    pub version: u64,
}

/// Reported in place of an output when `Task::process` panicked on the worker.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("task {ticket:?} panicked on its worker")]
pub struct TaskPanicked {
    pub ticket: TaskTicket,
}

/// The output of a finished task.
#[derive(Debug)]
pub struct CompletedTask<O> {
    pub ticket: TaskTicket,
    pub output: Result<O, TaskPanicked>,
    /// Time from dispatch to a worker until the result was sent back.
    pub elapsed: Duration,
}

/// A shared flag a control thread raises to ask a running task to stop early.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
