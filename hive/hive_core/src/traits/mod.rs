//! Capability interfaces consumed by the Hive engine.
//!
//! The engine owns no threads of its own. All execution is delegated to a
//! [`TaskScheduler`], which is the only collaborator the actor layer needs.

pub mod scheduler;

pub use scheduler::{Task, TaskScheduler};
