//! # Hive Core
//!
//! `hive_core` provides the foundation shared by the Hive actor engine:
//! error types, identifier types, the task-scheduling capability that the
//! engine runs on, and logging helpers.
//!
//! ## Execution Model
//!
//! Hive multiplexes many logically single-threaded actors over a small,
//! shared pool of worker threads. Nothing in this crate knows about
//! actors directly. It only defines the seams:
//!
//! 1. **Scheduling**: the engine hands work to a [`TaskScheduler`] and never
//!    assumes anything about which thread runs it or when.
//!
//! 2. **Identity**: actors are addressed by [`ActorId`], messages are stamped
//!    with a [`MessageId`] so a single delivery can be followed through logs.
//!
//! 3. **Errors**: every fallible operation in the workspace reports through
//!    [`Error`] or one of its subsystem errors.
//!
//! ## Crate Structure
//!
//! - **error**: Error types for all Hive components
//! - **id**: Identifier types
//! - **traits**: Capability interfaces consumed by the engine
//! - **utils**: Logging helpers

pub mod error;
pub mod id;
pub mod traits;
pub mod utils;

// Re-export key types and traits for convenience
pub use error::{ActorError, ConfigError, Error, Result, SchedulerError};
pub use id::{ActorId, MessageId};
pub use traits::{Task, TaskScheduler};
pub use utils::LogLevel;
