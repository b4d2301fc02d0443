//! Worker thread pool.
//!
//! The pool is the default scheduler behind an actor system. Tasks are
//! drain passes; a pass that exhausts its batch quota resubmits itself from
//! inside a worker, so the system's pool runs with an unbounded queue and
//! a resubmission never blocks or fails for lack of space.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use log::{debug, error, info, trace, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

use hive_core::error::{Result, SchedulerError};
use hive_core::traits::{Task, TaskScheduler};

use crate::actor::dispatch::panic_message;

/// Error when submitting a task to the thread pool
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadPoolError {
    /// The thread pool is shutting down
    #[error("thread pool is shutting down")]
    ShuttingDown,

    /// The task queue is full
    #[error("thread pool queue is full")]
    QueueFull,
}

impl From<ThreadPoolError> for SchedulerError {
    fn from(err: ThreadPoolError) -> Self {
        match err {
            ThreadPoolError::ShuttingDown => SchedulerError::ShuttingDown,
            ThreadPoolError::QueueFull => SchedulerError::QueueFull,
        }
    }
}

/// Statistics about the thread pool
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ThreadPoolStats {
    /// Number of tasks accepted
    pub tasks_queued: usize,

    /// Number of tasks that ran to completion
    pub tasks_completed: usize,

    /// Number of tasks that panicked
    pub tasks_panicked: usize,

    /// Total task execution time (microseconds)
    pub total_execution_time_us: u64,

    /// Total time tasks spent queued (microseconds)
    pub total_queue_time_us: u64,

    /// Longest single task execution (microseconds)
    pub max_execution_time_us: u64,
}

/// Configuration for the thread pool
#[derive(Debug, Clone)]
pub struct ThreadPoolConfig {
    /// Maximum size of the task queue; unbounded when `None`
    pub queue_size: Option<usize>,

    /// Number of worker threads
    pub max_threads: usize,

    /// Name prefix for worker threads
    pub thread_name_prefix: String,

    /// Whether to collect performance statistics
    pub collect_stats: bool,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        Self {
            queue_size: None,
            max_threads: num_cpus::get(),
            thread_name_prefix: "hive-worker".to_string(),
            collect_stats: true,
        }
    }
}

/// A task stamped with its submission time
struct Job {
    task: Task,
    enqueued_at: Instant,
}

/// Counters shared between the pool handle and its workers
#[derive(Default)]
struct Counters {
    queued: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
    execution_time_us: AtomicU64,
    queue_time_us: AtomicU64,
    max_execution_time_us: AtomicU64,
}

impl Counters {
    fn record_run(&self, queue_time: Duration, exec_time: Duration, panicked: bool) {
        let exec_us = exec_time.as_micros() as u64;

        self.queue_time_us
            .fetch_add(queue_time.as_micros() as u64, Ordering::Relaxed);
        self.execution_time_us.fetch_add(exec_us, Ordering::Relaxed);
        self.max_execution_time_us
            .fetch_max(exec_us, Ordering::Relaxed);

        if panicked {
            self.panicked.fetch_add(1, Ordering::Relaxed);
        } else {
            self.completed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> ThreadPoolStats {
        ThreadPoolStats {
            tasks_queued: self.queued.load(Ordering::Relaxed),
            tasks_completed: self.completed.load(Ordering::Relaxed),
            tasks_panicked: self.panicked.load(Ordering::Relaxed),
            total_execution_time_us: self.execution_time_us.load(Ordering::Relaxed),
            total_queue_time_us: self.queue_time_us.load(Ordering::Relaxed),
            max_execution_time_us: self.max_execution_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Per-worker view of the shared pool state
struct WorkerContext {
    id: usize,
    receiver: Receiver<Job>,
    shutdown_flag: Arc<AtomicBool>,
    counters: Option<Arc<Counters>>,
}

/// A fixed-size pool of worker threads
pub struct ThreadPool {
    /// Channel for sending tasks to worker threads
    task_sender: Sender<Job>,

    /// Worker threads, taken by `shutdown_and_join`
    workers: Vec<JoinHandle<()>>,

    /// Set once the pool stops accepting work
    is_shutting_down: Arc<AtomicBool>,

    /// Statistics, when enabled
    counters: Option<Arc<Counters>>,
}

impl ThreadPool {
    /// Create a pool of `threads` workers with an unbounded queue
    pub fn new(threads: usize) -> Self {
        Self::with_config(ThreadPoolConfig {
            max_threads: threads,
            ..Default::default()
        })
    }

    /// Create a new thread pool with the specified configuration.
    ///
    /// A pool always has at least one worker; `max_threads: 0` is raised
    /// to 1.
    pub fn with_config(mut config: ThreadPoolConfig) -> Self {
        if config.max_threads == 0 {
            warn!("Thread pool configured with 0 workers; using 1");
            config.max_threads = 1;
        }

        let (task_sender, task_receiver) = match config.queue_size {
            Some(size) => bounded(size),
            None => unbounded(),
        };
        let is_shutting_down = Arc::new(AtomicBool::new(false));
        let counters = config.collect_stats.then(|| Arc::new(Counters::default()));

        info!(
            "Creating thread pool with {} workers (queue size {})",
            config.max_threads,
            config
                .queue_size
                .map_or_else(|| "unbounded".to_string(), |size| size.to_string())
        );

        let workers = (0..config.max_threads)
            .map(|id| {
                let ctx = WorkerContext {
                    id,
                    receiver: task_receiver.clone(),
                    shutdown_flag: Arc::clone(&is_shutting_down),
                    counters: counters.clone(),
                };

                thread::Builder::new()
                    .name(format!("{}-{}", config.thread_name_prefix, id))
                    .spawn(move || Self::worker_loop(ctx))
                    .expect("Failed to spawn worker thread")
            })
            .collect();

        Self {
            task_sender,
            workers,
            is_shutting_down,
            counters,
        }
    }

    /// Worker thread main loop
    fn worker_loop(ctx: WorkerContext) {
        debug!("Worker {}: Starting", ctx.id);

        while !ctx.shutdown_flag.load(Ordering::Acquire) {
            // Wake up periodically to notice shutdown
            let job = match ctx.receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(job) => job,
                Err(_) => continue,
            };

            let queue_time = job.enqueued_at.elapsed();
            let exec_start = Instant::now();
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job.task));
            let exec_time = exec_start.elapsed();

            if let Err(panic) = &result {
                error!(
                    "Worker {}: Task panicked: {}",
                    ctx.id,
                    panic_message(panic.as_ref())
                );
            } else {
                trace!(
                    "Worker {}: Task completed in {:.2}ms (queued {:.2}ms)",
                    ctx.id,
                    exec_time.as_micros() as f64 / 1000.0,
                    queue_time.as_micros() as f64 / 1000.0
                );
            }

            if let Some(counters) = &ctx.counters {
                counters.record_run(queue_time, exec_time, result.is_err());
            }
        }

        // Queued jobs can hold the last handles to actors that hold this pool
        let dropped = ctx.receiver.try_iter().count();
        debug!(
            "Worker {}: Shutting down ({} queued tasks dropped)",
            ctx.id, dropped
        );
    }

    /// Submit a task to be executed by the thread pool
    pub fn execute<F>(&self, f: F) -> std::result::Result<(), ThreadPoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(f))
    }

    fn submit(&self, task: Task) -> std::result::Result<(), ThreadPoolError> {
        if self.is_shutting_down() {
            return Err(ThreadPoolError::ShuttingDown);
        }

        let job = Job {
            task,
            enqueued_at: Instant::now(),
        };

        match self.task_sender.try_send(job) {
            Ok(()) => {
                if let Some(counters) = &self.counters {
                    counters.queued.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(ThreadPoolError::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(ThreadPoolError::ShuttingDown),
        }
    }

    /// Get current statistics for the thread pool
    pub fn get_stats(&self) -> ThreadPoolStats {
        self.counters
            .as_ref()
            .map(|counters| counters.snapshot())
            .unwrap_or_default()
    }

    /// Stop accepting tasks. Workers exit after their current task; tasks
    /// still queued are dropped without running.
    pub fn shutdown(&self) {
        if !self.is_shutting_down.swap(true, Ordering::AcqRel) {
            info!("Shutting down thread pool");
        }
    }

    /// Shut down the thread pool and wait for workers to finish
    pub fn shutdown_and_join(mut self) {
        self.shutdown();

        for worker in self.workers.drain(..) {
            worker.join().unwrap_or_else(|e| {
                error!("Worker thread panicked during shutdown: {:?}", e);
            });
        }

        info!("Thread pool shutdown complete");
    }

    /// Get the number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Check if the thread pool is shutting down
    pub fn is_shutting_down(&self) -> bool {
        self.is_shutting_down.load(Ordering::Acquire)
    }
}

impl TaskScheduler for ThreadPool {
    fn schedule(&self, task: Task) -> Result<()> {
        self.submit(task)
            .map_err(|e| SchedulerError::from(e).into())
    }

    fn shutdown(&self) {
        ThreadPool::shutdown(self);
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
        debug!("Thread pool dropped; workers exit at their next shutdown check");
    }
}
