//! Messages and the reply contract.
//!
//! Every `send` pairs the outbound [`Message`] with a [`Promise`] inside an
//! [`Envelope`]. The caller keeps the matching [`Reply`]. The promise is
//! consumed by resolving or rejecting it, so a reply can be completed at
//! most once. A promise dropped without either surfaces as
//! [`ReplyError::Abandoned`] instead of leaving the caller blocked.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use hive_core::id::{ActorId, MessageId};

/// A payload addressed to an actor.
#[derive(Debug, Clone)]
pub struct Message<T> {
    id: MessageId,
    target: ActorId,
    payload: T,
}

impl<T> Message<T> {
    /// Create a message for `target` with a fresh message id.
    pub fn new(target: impl Into<ActorId>, payload: T) -> Self {
        Self {
            id: MessageId::new(),
            target: target.into(),
            payload,
        }
    }

    /// Unique id of this message.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// The actor this message is addressed to.
    pub fn target(&self) -> &ActorId {
        &self.target
    }

    /// Borrow the payload.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Take the payload out of the message.
    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T> fmt::Display for Message<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message {{ target: {}, id: {} }}", self.target, self.id)
    }
}

/// Why a reply did not carry a value.
#[derive(Debug, Error)]
pub enum ReplyError {
    /// The handler returned an error or panicked
    #[error("handler failed: {0:#}")]
    Handler(anyhow::Error),

    /// The actor was closed before the message was processed
    #[error("actor is dead: {0}")]
    ActorDead(ActorId),

    /// The actor could not get a drain pass onto a worker
    #[error("message could not be scheduled: {0}")]
    Unscheduled(String),

    /// The promise was dropped without being completed, or the result was
    /// already taken
    #[error("reply abandoned")]
    Abandoned,

    /// No result arrived within the requested time
    #[error("timed out after {0:?} waiting for reply")]
    Timeout(Duration),
}

impl ReplyError {
    /// Whether the failure came from the handler itself.
    pub fn is_handler_fault(&self) -> bool {
        matches!(self, Self::Handler(_))
    }
}

type Outcome<R> = Result<R, ReplyError>;

/// The completing side of a reply.
pub struct Promise<R> {
    tx: Sender<Outcome<R>>,
}

impl<R> Promise<R> {
    /// Complete the reply with a value.
    pub fn resolve(self, value: R) {
        self.complete(Ok(value));
    }

    /// Complete the reply with an error.
    pub fn reject(self, error: ReplyError) {
        self.complete(Err(error));
    }

    fn complete(self, outcome: Outcome<R>) {
        // The caller may have dropped its Reply; nobody is left to tell.
        let _ = self.tx.try_send(outcome);
    }
}

impl<R> fmt::Debug for Promise<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}

/// The awaiting side of a reply, returned to the caller of `send`.
pub struct Reply<R> {
    message_id: MessageId,
    rx: Receiver<Outcome<R>>,
}

impl<R> Reply<R> {
    /// Id of the message this reply belongs to.
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Block until the reply is completed.
    pub fn wait(self) -> Result<R, ReplyError> {
        self.rx.recv().unwrap_or(Err(ReplyError::Abandoned))
    }

    /// Block for at most `timeout`.
    ///
    /// A `Timeout` error leaves the reply pending, so the call can be
    /// retried. Once a result has been taken, later calls report
    /// `Abandoned`.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<R, ReplyError> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(ReplyError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ReplyError::Abandoned),
        }
    }

    /// Take the result if it is already available.
    pub fn try_wait(&self) -> Option<Result<R, ReplyError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ReplyError::Abandoned)),
        }
    }
}

impl<R> fmt::Debug for Reply<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply")
            .field("message_id", &self.message_id)
            .finish()
    }
}

/// Correlation record: a message paired with the promise for its result.
pub struct Envelope<T, R> {
    message: Message<T>,
    promise: Promise<R>,
}

impl<T, R> Envelope<T, R> {
    /// Wrap a message, returning the envelope and the caller's reply handle.
    pub fn new(message: Message<T>) -> (Self, Reply<R>) {
        let (tx, rx) = bounded(1);
        let reply = Reply {
            message_id: message.id(),
            rx,
        };
        let envelope = Self {
            message,
            promise: Promise { tx },
        };
        (envelope, reply)
    }

    /// Borrow the wrapped message.
    pub fn message(&self) -> &Message<T> {
        &self.message
    }

    /// Split into the message and its promise.
    pub fn into_parts(self) -> (Message<T>, Promise<R>) {
        (self.message, self.promise)
    }

    /// Drop the promise and hand back the message.
    pub fn into_message(self) -> Message<T> {
        self.message
    }

    /// Reject the promise without processing the message.
    pub fn reject(self, error: ReplyError) {
        self.promise.reject(error);
    }
}

impl<T, R> fmt::Debug for Envelope<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("target", &self.message.target)
            .field("message_id", &self.message.id)
            .finish()
    }
}
