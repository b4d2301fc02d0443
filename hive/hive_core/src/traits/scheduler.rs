//! Task scheduling trait definitions.
//!
//! # Scheduling Model
//!
//! A scheduler accepts fire-and-forget tasks and runs each of them exactly
//! once, on an unspecified worker, at an unspecified later time.
//!
//! - `schedule` never waits for the task to run
//! - no ordering is promised between tasks
//! - a task that panics must not take the scheduler down with it

use std::sync::Arc;

use crate::error::Result;

/// A unit of work handed to a scheduler.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Core trait for task scheduling.
///
/// # Examples
///
/// ```
/// use hive_core::traits::scheduler::{Task, TaskScheduler};
/// use hive_core::error::Result;
///
/// struct ThreadPerTask;
///
/// impl TaskScheduler for ThreadPerTask {
///     fn schedule(&self, task: Task) -> Result<()> {
///         std::thread::spawn(task);
///         Ok(())
///     }
/// }
/// ```
pub trait TaskScheduler: Send + Sync {
    /// Schedule a task for execution.
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the task was accepted and will eventually run.
    /// * `Err(SchedulerError)` if the task was rejected. A rejected task is
    ///   dropped without running.
    fn schedule(&self, task: Task) -> Result<()>;

    /// Stop accepting new tasks.
    ///
    /// The default implementation does nothing, for schedulers whose
    /// lifetime is managed elsewhere.
    fn shutdown(&self) {}
}

impl<S: TaskScheduler + ?Sized> TaskScheduler for Arc<S> {
    fn schedule(&self, task: Task) -> Result<()> {
        (**self).schedule(task)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
