//! Error types for the Hive actor engine.
//!
//! Errors are organized by subsystem. The root error type, `Error`, can
//! wrap any of the subsystem-specific errors so callers that do not care
//! about the origin can use a single type.

use crate::id::ActorId;
use thiserror::Error;

/// Root error type for Hive.
#[derive(Debug, Error)]
pub enum Error {
    /// Actor lifecycle and registry errors
    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task scheduling errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to actor lifecycle and the actor registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// The actor has already been closed
    #[error("Actor is dead: {0}")]
    Dead(ActorId),

    /// No actor is registered under the given ID
    #[error("Actor not found: {0}")]
    NotFound(ActorId),

    /// The actor system has been shut down
    #[error("Actor system is stopped")]
    SystemStopped,
}

/// Errors raised while validating configuration.
///
/// These are always reported synchronously by the constructing call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Batch quota must be at least one message per drain
    #[error("Batch quota must be greater than 0")]
    InvalidBatchQuota,

    /// Bounded mailboxes need room for at least one message
    #[error("Mailbox capacity must be greater than 0")]
    InvalidMailboxCapacity,

    /// A worker pool needs at least one thread
    #[error("Worker thread count must be greater than 0")]
    InvalidWorkerThreads,

    /// Another actor is already registered under this ID
    #[error("Duplicate actor id: {0}")]
    DuplicateActorId(ActorId),

    /// Configuration source could not be parsed
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors related to handing tasks to a scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler no longer accepts tasks
    #[error("Scheduler is shutting down")]
    ShuttingDown,

    /// The scheduler's task queue is full
    #[error("Scheduler queue is full")]
    QueueFull,
}

/// Result type used throughout Hive.
pub type Result<T> = std::result::Result<T, Error>;
