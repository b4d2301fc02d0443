//! Integration tests for the scheduling capability.
//!
//! These tests exercise `TaskScheduler` through a test implementation that
//! records what it ran and can be configured to reject work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use hive_core::error::{Error, Result, SchedulerError};
use hive_core::traits::{Task, TaskScheduler};

/// A scheduler that runs tasks inline and can be told to reject them.
struct InlineScheduler {
    tasks_executed: Arc<Mutex<Vec<String>>>,
    should_fail: AtomicBool,
    shut_down: AtomicBool,
}

impl InlineScheduler {
    fn new(should_fail: bool) -> Self {
        Self {
            tasks_executed: Arc::new(Mutex::new(Vec::new())),
            should_fail: AtomicBool::new(should_fail),
            shut_down: AtomicBool::new(false),
        }
    }

    fn tasks_executed(&self) -> Vec<String> {
        self.tasks_executed.lock().unwrap().clone()
    }
}

impl TaskScheduler for InlineScheduler {
    fn schedule(&self, task: Task) -> Result<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShuttingDown.into());
        }
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(Error::Scheduler(SchedulerError::QueueFull));
        }

        task();
        Ok(())
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_schedule_multiple_tasks() {
    let scheduler = InlineScheduler::new(false);
    let tasks_executed = scheduler.tasks_executed.clone();

    for i in 0..5 {
        let tasks = tasks_executed.clone();
        scheduler
            .schedule(Box::new(move || {
                tasks.lock().unwrap().push(format!("Task {} executed", i));
            }))
            .unwrap();
    }

    let executed = scheduler.tasks_executed();
    assert_eq!(executed.len(), 5);
    for i in 0..5 {
        assert!(executed.contains(&format!("Task {} executed", i)));
    }
}

#[test]
fn test_schedule_task_failure() {
    let scheduler = InlineScheduler::new(true);
    let tasks_executed = scheduler.tasks_executed.clone();

    let result = scheduler.schedule(Box::new(move || {
        tasks_executed
            .lock()
            .unwrap()
            .push("Task executed".to_string());
    }));

    match result {
        Err(Error::Scheduler(SchedulerError::QueueFull)) => {}
        other => panic!("Expected QueueFull error, got {:?}", other),
    }
    assert!(scheduler.tasks_executed().is_empty());
}

#[test]
fn test_schedule_after_shutdown() {
    let scheduler = InlineScheduler::new(false);
    scheduler.shutdown();

    let result = scheduler.schedule(Box::new(|| {}));
    assert!(matches!(
        result,
        Err(Error::Scheduler(SchedulerError::ShuttingDown))
    ));
}

#[test]
fn test_arc_scheduler_delegates() {
    let scheduler = Arc::new(InlineScheduler::new(false));
    let as_trait: Arc<dyn TaskScheduler> = scheduler.clone();
    let tasks = scheduler.tasks_executed.clone();

    as_trait
        .schedule(Box::new(move || {
            tasks.lock().unwrap().push("via arc".to_string());
        }))
        .unwrap();

    assert_eq!(scheduler.tasks_executed(), vec!["via arc".to_string()]);
}

#[test]
fn test_concurrent_scheduling() {
    let scheduler = Arc::new(InlineScheduler::new(false));
    let mut handles = Vec::new();

    for i in 0..10 {
        let scheduler = Arc::clone(&scheduler);
        let tasks = scheduler.tasks_executed.clone();
        handles.push(thread::spawn(move || {
            scheduler
                .schedule(Box::new(move || {
                    tasks.lock().unwrap().push(format!("thread {}", i));
                }))
                .unwrap();
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(scheduler.tasks_executed().len(), 10);
}
