//! Actor behavior.
//!
//! A behavior is the message handler an actor runs. The engine guarantees
//! that calls into one behavior never overlap, so it may keep mutable
//! state without further synchronization.

use super::message::Message;

/// Message handling logic for an actor taking `T` payloads and producing `R`.
///
/// Any closure `FnMut(Message<T>) -> anyhow::Result<R>` is a behavior.
///
/// # Examples
///
/// ```
/// use hive_actor::actor::{Behavior, Message};
///
/// struct Counter {
///     total: u64,
/// }
///
/// impl Behavior<u64, u64> for Counter {
///     fn on_message(&mut self, message: Message<u64>) -> anyhow::Result<u64> {
///         self.total += message.into_payload();
///         Ok(self.total)
///     }
/// }
/// ```
pub trait Behavior<T, R>: Send + 'static {
    /// Handle one message.
    ///
    /// An error (or a panic) fails only this message: it is reported to
    /// `on_exception`, then delivered to the sender's reply. The actor keeps
    /// processing the messages behind it.
    fn on_message(&mut self, message: Message<T>) -> anyhow::Result<R>;

    /// Observe a handler fault before it is delivered to the sender.
    fn on_exception(&mut self, _fault: &anyhow::Error) {}
}

impl<T, R, F> Behavior<T, R> for F
where
    F: FnMut(Message<T>) -> anyhow::Result<R> + Send + 'static,
{
    fn on_message(&mut self, message: Message<T>) -> anyhow::Result<R> {
        self(message)
    }
}
