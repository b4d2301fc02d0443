//! Actor engine: mailboxes, behaviors, dispatch and the actor system.
//!
//! - Messages are queued in a per-actor [`Mailbox`] and answered through a
//!   [`Reply`]
//! - Each actor processes one message at a time, in arrival order
//! - Drain passes run on a shared scheduler, bounded by a batch quota

pub mod behavior;
pub mod dispatch;
pub mod mailbox;
pub mod message;
pub mod system;

// Re-export key types from behavior and dispatch
pub use behavior::Behavior;
pub use dispatch::{Actor, ActorRef, ActorState, SendError};

// Re-export key types from mailbox and message
pub use mailbox::{Enqueued, FifoMailbox, Mailbox, MailboxError};
pub use message::{Envelope, Message, Promise, Reply, ReplyError};

// Re-export key types from system
pub use system::{ActorOptions, ActorSystem, SystemConfig, DEFAULT_BATCH_QUOTA};
