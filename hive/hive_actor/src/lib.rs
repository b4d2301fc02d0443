#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

//! # Hive Actor
//!
//! A thread-pool actor engine for the Hive runtime.
//!
//! Actors own no thread. Each one is a mailbox plus a behavior; when a
//! message arrives at an idle actor, a drain pass is submitted to the
//! system's scheduler. The engine guarantees that:
//!
//! - an actor handles at most one message at a time
//! - messages from one sender are handled in the order they were sent
//! - a single busy actor yields its worker after `batch_quota` messages
//! - a failing or panicking handler fails only its own message
//!
//! ## Example
//!
//! ```
//! use hive_actor::{Actor, ActorOptions, ActorSystem, Message};
//!
//! let system = ActorSystem::new();
//! let actor: Actor<String, usize> = system
//!     .create(
//!         |m: Message<String>| -> anyhow::Result<usize> { Ok(m.payload().len()) },
//!         ActorOptions::new().with_id("MyActor"),
//!     )
//!     .unwrap();
//!
//! let reply = actor.ask("Something".to_string()).unwrap();
//! assert_eq!(reply.wait().unwrap(), 9);
//!
//! system.shutdown();
//! ```

/// Mailboxes, behaviors, dispatch and the actor system
pub mod actor;

/// Worker pools that run drain passes
pub mod pool;

// Re-export key types for easier access
pub use actor::{
    Actor, ActorOptions, ActorState, ActorSystem, Behavior, Message, Reply, ReplyError,
    SendError, SystemConfig,
};
pub use pool::thread::ThreadPool;
