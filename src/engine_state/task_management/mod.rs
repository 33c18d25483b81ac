//! # Task Management System
//!
//! This module provides the worker pool that runs background work (chunk meshing)
//! off the control thread.
//!
//! ## Architecture Overview
//!
//! The task management system consists of several key components:
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker
//! - `TaskChannel`: The job channel and bookkeeping of one worker thread
//!
//! Every worker has a dedicated job channel. All workers report back on one shared
//! completion channel, which the control thread drains once per frame or blocks on
//! with a timeout.
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`, which stamps them with a
//!    strictly increasing `TaskTicket`
//! 2. The manager hands tasks to idle workers using round-robin, or queues them FIFO
//! 3. Workers process tasks and send a `CompletedTask` back
//! 4. Results are collected on the control thread in `process_completed_tasks()`
//! 5. Queued tasks are flushed to workers as they become idle
//!
//! ## Performance Considerations
//! - **Task Granularity**: one chunk per task keeps scheduling overhead negligible
//! - **Memory**: each task owns its data, nothing is locked while workers run
//! - **Blocking**: workers block on their job channel while idle, there is no polling

pub mod task;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};
use task::{CompletedTask, Task, TaskPanicked, TaskTicket};
use web_time::Instant;

use super::error::EngineError;

/// Maximum number of tasks that can be in flight per worker channel.
///
/// A worker is either idle or working on exactly one task.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// A task on its way to a worker.
struct Dispatch<T> {
    ticket: TaskTicket,
    task: T,
    dispatched_at: Instant,
}

/// What a worker sends back on the shared completion channel.
struct WorkerReport<O> {
    channel: usize,
    completed: CompletedTask<O>,
}

/// The job channel and bookkeeping of one worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the control thread to the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `worker`: Handle to the worker thread, joined on drop
struct TaskChannel<T> {
    task_sender: Option<Sender<Dispatch<T>>>,
    num_tasks_in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Collecting task results
/// - Handling task queuing when all workers are busy
///
/// # Implementation Notes
/// - Lives on the control thread; only tasks and their outputs cross threads
/// - Drop closes every job channel and joins the workers
/// - A panicking task is reported as `TaskPanicked` and its worker keeps running
pub struct TaskManager<T: Task> {
    channels: Vec<TaskChannel<T>>,
    queued_tasks: VecDeque<(TaskTicket, T)>,
    current_channel: usize,
    next_version: u64,
    result_receiver: Receiver<WorkerReport<T::Output>>,
}

impl<T: Task> TaskManager<T> {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `name` - Prefix for worker thread names (`{name}-{index}`)
    /// * `num_workers` - Number of worker threads to create
    ///
    /// # Returns
    /// The manager, or `EngineError::WorkerSpawn` if a thread could not be created.
    pub fn new(name: &str, num_workers: usize) -> Result<Self, EngineError> {
        info!(
            "Starting {} {} workers (available parallelism: {:?})",
            num_workers,
            name,
            thread::available_parallelism()
        );

        let (result_tx, result_rx) = channel::<WorkerReport<T::Output>>();
        let mut channels = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Dispatch<T>>();
            let result_tx = result_tx.clone();

            let task_closure = move || {
                while let Ok(dispatch) = task_rx.recv() {
                    let ticket = dispatch.ticket;
                    let output = panic::catch_unwind(AssertUnwindSafe(|| dispatch.task.process()))
                        .map_err(|_| TaskPanicked { ticket });
                    let report = WorkerReport {
                        channel: index,
                        completed: CompletedTask {
                            ticket,
                            output,
                            elapsed: dispatch.dispatched_at.elapsed(),
                        },
                    };
                    if result_tx.send(report).is_err() {
                        break;
                    }
                }
            };

            let worker = thread::Builder::new()
                .name(format!("{}-{}", name, index))
                .spawn(task_closure)
                .map_err(EngineError::WorkerSpawn)?;

            channels.push(TaskChannel {
                task_sender: Some(task_tx),
                num_tasks_in_flight: 0,
                worker: Some(worker),
            });
        }

        Ok(TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            next_version: 1,
            result_receiver: result_rx,
        })
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was handed to the worker
    /// - `Err(task)` if the worker is gone, so the caller can requeue it
    fn try_send_task(
        &mut self,
        ticket: TaskTicket,
        task: T,
        channel_idx: usize,
    ) -> Result<(), (TaskTicket, T)> {
        let channel = &mut self.channels[channel_idx];
        let Some(sender) = &channel.task_sender else {
            return Err((ticket, task));
        };
        let dispatch = Dispatch {
            ticket,
            task,
            dispatched_at: Instant::now(),
        };
        match sender.send(dispatch) {
            Ok(()) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(failed) => {
                error!("Worker {} disconnected, requeueing task", channel_idx);
                channel.task_sender = None;
                Err((failed.0.ticket, failed.0.task))
            }
        }
    }

    /// Finds an available worker channel that can accept a new task.
    ///
    /// Round-robin starting from the channel after the last one used, skipping
    /// channels that are busy or disconnected.
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|offset| (self.current_channel + offset) % count)
            .find(|&idx| {
                let channel = &self.channels[idx];
                channel.task_sender.is_some() && channel.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
            })
    }

    /// Sends `task` to an idle worker, or queues it if none is available.
    fn dispatch_or_queue(&mut self, ticket: TaskTicket, task: T) -> bool {
        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(ticket, task, channel_idx) {
                Ok(()) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(returned) => {
                    self.queued_tasks.push_back(returned);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back((ticket, task));
                false
            }
        }
    }

    /// Publishes a new task for execution.
    ///
    /// The task runs as soon as a worker is free; until then it waits in a FIFO queue
    /// behind earlier tasks.
    ///
    /// # Returns
    /// The ticket the task's result will carry.
    pub fn publish_task(&mut self, task: T) -> TaskTicket {
        let ticket = TaskTicket {
            version: self.next_version,
        };
        self.next_version += 1;

        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back((ticket, task));
            self.process_queued_tasks();
        } else if !self.dispatch_or_queue(ticket, task) {
            debug!("Task {} queued, all workers busy", ticket.version);
        }
        ticket
    }

    /// Hands queued tasks to idle workers, oldest first, until either runs out.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some((ticket, task)) = self.queued_tasks.pop_front() else {
                return;
            };
            match self.try_send_task(ticket, task, channel_idx) {
                Ok(()) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(returned) => self.queued_tasks.push_front(returned),
            }
        }
    }

    fn record_report(&mut self, report: WorkerReport<T::Output>) -> CompletedTask<T::Output> {
        let channel = &mut self.channels[report.channel];
        channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
        report.completed
    }

    /// Collects every result that has arrived, without blocking.
    ///
    /// Freed workers immediately pick up queued tasks.
    pub fn process_completed_tasks(&mut self) -> Vec<CompletedTask<T::Output>> {
        let mut completed = Vec::new();
        while let Ok(report) = self.result_receiver.try_recv() {
            completed.push(self.record_report(report));
        }
        self.process_queued_tasks();
        completed
    }

    /// Like `process_completed_tasks`, but waits up to `timeout` for the first result
    /// when none is ready yet.
    pub fn wait_for_completed_tasks(&mut self, timeout: Duration) -> Vec<CompletedTask<T::Output>> {
        if self.in_flight_count() == 0 {
            return self.process_completed_tasks();
        }
        let mut completed = Vec::new();
        match self.result_receiver.recv_timeout(timeout) {
            Ok(report) => completed.push(self.record_report(report)),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                error!("All workers have disconnected");
            }
        }
        completed.extend(self.process_completed_tasks());
        completed
    }

    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of tasks currently running on workers.
    pub fn in_flight_count(&self) -> usize {
        self.channels.iter().map(|c| c.num_tasks_in_flight).sum()
    }

    pub fn queued_count(&self) -> usize {
        self.queued_tasks.len()
    }

    pub fn idle_worker_count(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| c.task_sender.is_some() && c.num_tasks_in_flight == 0)
            .count()
    }

    /// Drops every queued task that has not reached a worker yet.
    pub fn clear_queue(&mut self) -> usize {
        let dropped = self.queued_tasks.len();
        self.queued_tasks.clear();
        dropped
    }
}

impl<T: Task> Drop for TaskManager<T> {
    fn drop(&mut self) {
        for channel in &mut self.channels {
            channel.task_sender = None;
        }
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Some(worker) = channel.worker.take() {
                if worker.join().is_err() {
                    error!("Worker {} terminated abnormally", index);
                }
            }
        }
    }
}
