//! Worker pools that run actor drain passes.

pub mod thread;

pub use thread::{ThreadPool, ThreadPoolConfig, ThreadPoolError, ThreadPoolStats};
