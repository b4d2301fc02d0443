//! Actor dispatch.
//!
//! An actor owns no thread. `send` enqueues on the caller's thread; the
//! sender whose message found the mailbox idle picks up the mailbox's drain
//! token and submits one drain pass to the scheduler. A drain pass handles
//! at most `batch_quota` messages, then either releases the token (mailbox
//! empty) or submits a fresh pass so other actors get a turn on the worker.
//! Only the token holder ever calls into the behavior, which is what makes
//! each actor single-threaded.

use log::{debug, error, info, trace, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;

use hive_core::error::ActorError;
use hive_core::id::ActorId;
use hive_core::traits::TaskScheduler;

use super::behavior::Behavior;
use super::mailbox::{Enqueued, Mailbox, MailboxError};
use super::message::{Envelope, Message, Reply, ReplyError};

/// Lifecycle state of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActorState {
    /// Accepting and processing messages
    Alive = 0,
    /// Closed; terminal
    Dead = 1,
}

impl ActorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Alive,
            _ => Self::Dead,
        }
    }
}

/// Error when sending a message. The undelivered message is handed back.
#[derive(Error)]
pub enum SendError<M> {
    /// The actor has been closed
    #[error("actor is dead")]
    Dead(M),
    /// The actor's bounded mailbox is full
    #[error("actor mailbox is full")]
    Full(M),
}

impl<M> SendError<M> {
    /// Recover the message that was not delivered.
    pub fn into_inner(self) -> M {
        match self {
            Self::Dead(m) | Self::Full(m) => m,
        }
    }

    /// Whether the send failed because the actor is dead.
    pub fn is_dead(&self) -> bool {
        matches!(self, Self::Dead(_))
    }

    /// Whether the send failed for lack of mailbox space.
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Transform the carried message, keeping the failure kind.
    pub fn map<U, F: FnOnce(M) -> U>(self, f: F) -> SendError<U> {
        match self {
            Self::Dead(m) => SendError::Dead(f(m)),
            Self::Full(m) => SendError::Full(f(m)),
        }
    }
}

impl<M> fmt::Debug for SendError<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dead(_) => f.write_str("Dead(..)"),
            Self::Full(_) => f.write_str("Full(..)"),
        }
    }
}

/// Type-erased view of an actor, used by the actor system's registry.
pub trait ActorRef: Send + Sync {
    /// The actor's id.
    fn id(&self) -> &ActorId;

    /// Current lifecycle state.
    fn state(&self) -> ActorState;

    /// Transition the actor to `Dead`.
    fn close(&self) -> Result<(), ActorError>;

    /// Approximate number of queued messages.
    fn pending(&self) -> usize;
}

struct ActorInner<T, R> {
    id: ActorId,
    state: AtomicU8,
    mailbox: Box<dyn Mailbox<Envelope<T, R>>>,
    behavior: Mutex<Box<dyn Behavior<T, R>>>,
    batch_quota: usize,
    scheduler: Arc<dyn TaskScheduler>,
}

impl<T: Send + 'static, R: Send + 'static> ActorInner<T, R> {
    fn state(&self) -> ActorState {
        ActorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn is_dead(&self) -> bool {
        self.state() == ActorState::Dead
    }

    /// Submit one drain pass. The caller must hold the drain token.
    fn schedule_drain(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        if let Err(e) = self.scheduler.schedule(Box::new(move || inner.drain())) {
            error!("Actor {}: failed to schedule drain: {}", self.id, e);
            self.fail_backlog(&e.to_string());
        }
    }

    /// One drain pass, run on a worker.
    fn drain(self: Arc<Self>) {
        let mut processed = 0;

        while processed < self.batch_quota {
            if self.is_dead() {
                debug!(
                    "Actor {}: closed mid-drain after {} messages",
                    self.id, processed
                );
                self.reject_backlog();
                return;
            }

            let Some(envelope) = self.mailbox.remove() else {
                break;
            };
            self.deliver(envelope);
            processed += 1;
        }

        if !self.mailbox.try_idle() {
            trace!(
                "Actor {}: yielding worker after {} messages, {} pending",
                self.id,
                processed,
                self.mailbox.size()
            );
            self.schedule_drain();
        }
    }

    fn deliver(&self, envelope: Envelope<T, R>) {
        let (message, promise) = envelope.into_parts();
        let message_id = message.id();
        trace!("Actor {}: processing message {}", self.id, message_id);

        let mut behavior = self.behavior.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| behavior.on_message(message)))
            .unwrap_or_else(|panic| {
                Err(anyhow::anyhow!(
                    "handler panicked: {}",
                    panic_message(panic.as_ref())
                ))
            });

        match outcome {
            Ok(value) => promise.resolve(value),
            Err(fault) => {
                warn!(
                    "Actor {}: message {} failed: {:#}",
                    self.id, message_id, fault
                );
                if panic::catch_unwind(AssertUnwindSafe(|| behavior.on_exception(&fault))).is_err()
                {
                    error!("Actor {}: on_exception panicked", self.id);
                }
                promise.reject(ReplyError::Handler(fault));
            }
        }
    }

    fn reject_backlog(&self) {
        let pending = self.mailbox.seal();
        if !pending.is_empty() {
            debug!(
                "Actor {}: rejecting {} pending messages",
                self.id,
                pending.len()
            );
        }
        for envelope in pending {
            envelope.reject(ReplyError::ActorDead(self.id.clone()));
        }
    }

    /// Reject everything queued and release the drain token.
    ///
    /// A send landing after the release claims the mailbox itself and
    /// makes its own scheduling attempt.
    fn fail_backlog(&self, reason: &str) {
        for envelope in self.mailbox.clear() {
            envelope.reject(ReplyError::Unscheduled(reason.to_string()));
        }
    }
}

impl<T: Send + 'static, R: Send + 'static> ActorRef for ActorInner<T, R> {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn state(&self) -> ActorState {
        ActorInner::state(self)
    }

    fn close(&self) -> Result<(), ActorError> {
        self.state
            .compare_exchange(
                ActorState::Alive as u8,
                ActorState::Dead as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| ActorError::Dead(self.id.clone()))?;

        info!("Shutting down actor {}", self.id);
        self.reject_backlog();
        Ok(())
    }

    fn pending(&self) -> usize {
        self.mailbox.size()
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<unknown panic>")
}

/// Handle to an actor taking `T` payloads and replying with `R`.
///
/// Handles are cheap to clone; all clones address the same actor.
pub struct Actor<T, R> {
    inner: Arc<ActorInner<T, R>>,
}

impl<T: Send + 'static, R: Send + 'static> Actor<T, R> {
    pub(crate) fn new(
        id: ActorId,
        behavior: Box<dyn Behavior<T, R>>,
        mailbox: Box<dyn Mailbox<Envelope<T, R>>>,
        batch_quota: usize,
        scheduler: Arc<dyn TaskScheduler>,
    ) -> Self {
        debug_assert!(batch_quota > 0, "batch quota must be positive");

        Self {
            inner: Arc::new(ActorInner {
                id,
                state: AtomicU8::new(ActorState::Alive as u8),
                mailbox,
                behavior: Mutex::new(behavior),
                batch_quota,
                scheduler,
            }),
        }
    }

    /// Type-erased handle for the registry.
    pub(crate) fn as_ref_handle(&self) -> Arc<dyn ActorRef> {
        self.inner.clone()
    }

    /// Send a message and get a reply handle for its result.
    ///
    /// Returns immediately. The message is handed back if the actor is dead
    /// or its bounded mailbox is full.
    pub fn send(&self, message: Message<T>) -> Result<Reply<R>, SendError<Message<T>>> {
        if self.inner.is_dead() {
            return Err(SendError::Dead(message));
        }

        let (envelope, reply) = Envelope::new(message);
        match self.inner.mailbox.add(envelope) {
            Ok(Enqueued::Claimed) => {
                debug!("Actor {}: scheduling drain", self.inner.id);
                self.inner.schedule_drain();
            }
            Ok(Enqueued::Pending) => {}
            Err(MailboxError::Full(envelope)) => {
                return Err(SendError::Full(envelope.into_message()));
            }
            Err(MailboxError::Closed(envelope)) => {
                return Err(SendError::Dead(envelope.into_message()));
            }
        }

        Ok(reply)
    }

    /// Send `payload` in a message addressed to this actor.
    pub fn ask(&self, payload: T) -> Result<Reply<R>, SendError<T>> {
        let message = Message::new(self.inner.id.clone(), payload);
        self.send(message).map_err(|e| e.map(Message::into_payload))
    }

    /// Close the actor.
    ///
    /// Messages not yet started are rejected with `ReplyError::ActorDead`;
    /// a handler already running finishes normally. Closing twice returns
    /// `ActorError::Dead`.
    pub fn close(&self) -> Result<(), ActorError> {
        ActorRef::close(self.inner.as_ref())
    }

    /// The actor's id.
    pub fn id(&self) -> &ActorId {
        &self.inner.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ActorState {
        self.inner.state()
    }

    /// Whether the actor still accepts messages.
    pub fn is_alive(&self) -> bool {
        self.state() == ActorState::Alive
    }

    /// Approximate number of queued messages.
    pub fn pending(&self) -> usize {
        self.inner.mailbox.size()
    }

    /// Maximum messages handled per drain pass.
    pub fn batch_quota(&self) -> usize {
        self.inner.batch_quota
    }
}

impl<T, R> Clone for Actor<T, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, R> fmt::Debug for Actor<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.inner.id)
            .field("batch_quota", &self.inner.batch_quota)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::mailbox::FifoMailbox;
    use hive_core::error::Result as HiveResult;
    use hive_core::traits::Task;
    use std::collections::VecDeque;

    /// Queues tasks and runs them only when told to.
    #[derive(Default)]
    struct ManualScheduler {
        queue: Mutex<VecDeque<Task>>,
    }

    impl ManualScheduler {
        fn run_next(&self) -> bool {
            let task = self.queue.lock().pop_front();
            match task {
                Some(task) => {
                    task();
                    true
                }
                None => false,
            }
        }

        fn queued(&self) -> usize {
            self.queue.lock().len()
        }
    }

    impl TaskScheduler for ManualScheduler {
        fn schedule(&self, task: Task) -> HiveResult<()> {
            self.queue.lock().push_back(task);
            Ok(())
        }
    }

    fn echo_actor(
        scheduler: &Arc<ManualScheduler>,
        quota: usize,
        capacity: Option<usize>,
    ) -> Actor<u32, u32> {
        let mailbox: Box<dyn Mailbox<Envelope<u32, u32>>> = match capacity {
            Some(c) => Box::new(FifoMailbox::bounded(c).unwrap()),
            None => Box::new(FifoMailbox::unbounded()),
        };
        let behavior = |m: Message<u32>| -> anyhow::Result<u32> { Ok(m.into_payload() * 2) };
        Actor::new(
            ActorId::new("echo"),
            Box::new(behavior),
            mailbox,
            quota,
            scheduler.clone(),
        )
    }

    #[test]
    fn test_only_first_send_schedules() {
        let scheduler = Arc::new(ManualScheduler::default());
        let actor = echo_actor(&scheduler, 10, None);

        let replies: Vec<_> = (0..3).map(|i| actor.ask(i).unwrap()).collect();
        assert_eq!(scheduler.queued(), 1);
        assert_eq!(actor.pending(), 3);

        assert!(scheduler.run_next());
        assert_eq!(scheduler.queued(), 0);

        let values: Vec<u32> = replies.into_iter().map(|r| r.wait().unwrap()).collect();
        assert_eq!(values, vec![0, 2, 4]);

        // Mailbox went idle, so the next send claims again
        let reply = actor.ask(5).unwrap();
        assert_eq!(scheduler.queued(), 1);
        scheduler.run_next();
        assert_eq!(reply.wait().unwrap(), 10);
    }

    #[test]
    fn test_quota_yields_worker() {
        let scheduler = Arc::new(ManualScheduler::default());
        let actor = echo_actor(&scheduler, 2, None);

        let replies: Vec<_> = (1..=5).map(|i| actor.ask(i).unwrap()).collect();

        scheduler.run_next();
        assert_eq!(actor.pending(), 3);
        assert_eq!(scheduler.queued(), 1, "remaining backlog resubmitted");

        scheduler.run_next();
        assert_eq!(actor.pending(), 1);

        scheduler.run_next();
        assert_eq!(actor.pending(), 0);
        assert!(!scheduler.run_next(), "no further drain passes");

        let values: Vec<u32> = replies.into_iter().map(|r| r.wait().unwrap()).collect();
        assert_eq!(values, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_send_after_close_is_dead() {
        let scheduler = Arc::new(ManualScheduler::default());
        let actor = echo_actor(&scheduler, 10, None);

        actor.close().unwrap();
        assert_eq!(actor.state(), ActorState::Dead);

        match actor.ask(1) {
            Err(SendError::Dead(payload)) => assert_eq!(payload, 1),
            other => panic!("Expected Dead, got {:?}", other),
        }
        assert_eq!(actor.pending(), 0);
        assert_eq!(scheduler.queued(), 0);
    }

    #[test]
    fn test_close_twice_reports_dead() {
        let scheduler = Arc::new(ManualScheduler::default());
        let actor = echo_actor(&scheduler, 10, None);

        assert!(actor.close().is_ok());
        assert_eq!(actor.close(), Err(ActorError::Dead(ActorId::new("echo"))));
    }

    #[test]
    fn test_close_rejects_queued_messages() {
        let scheduler = Arc::new(ManualScheduler::default());
        let actor = echo_actor(&scheduler, 10, None);

        let replies: Vec<_> = (0..3).map(|i| actor.ask(i).unwrap()).collect();
        actor.close().unwrap();

        // The drain pass still runs but finds the actor dead
        scheduler.run_next();

        for reply in replies {
            assert!(matches!(reply.wait(), Err(ReplyError::ActorDead(_))));
        }
    }

    #[test]
    fn test_full_mailbox_hands_message_back() {
        let scheduler = Arc::new(ManualScheduler::default());
        let actor = echo_actor(&scheduler, 10, Some(2));

        let first = actor.ask(1).unwrap();
        let second = actor.ask(2).unwrap();
        let err = actor.ask(3).unwrap_err();
        assert!(err.is_full());
        assert_eq!(err.into_inner(), 3);

        scheduler.run_next();
        assert_eq!(first.wait().unwrap(), 2);
        assert_eq!(second.wait().unwrap(), 4);
        assert!(actor.ask(3).is_ok());
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let scheduler = Arc::new(ManualScheduler::default());
        let behavior = |m: Message<u32>| -> anyhow::Result<u32> {
            if *m.payload() == 0 {
                panic!("zero is not allowed");
            }
            Ok(100 / m.into_payload())
        };
        let actor: Actor<u32, u32> = Actor::new(
            ActorId::new("divider"),
            Box::new(behavior),
            Box::new(FifoMailbox::unbounded()),
            10,
            scheduler.clone(),
        );

        let bad = actor.ask(0).unwrap();
        let good = actor.ask(4).unwrap();
        scheduler.run_next();

        let err = bad.wait().unwrap_err();
        assert!(err.is_handler_fault());
        assert!(err.to_string().contains("zero is not allowed"));
        assert_eq!(good.wait().unwrap(), 25);
        assert!(actor.is_alive());
    }

    #[test]
    fn test_failed_schedule_rejects_backlog() {
        struct Refusing;
        impl TaskScheduler for Refusing {
            fn schedule(&self, _task: Task) -> HiveResult<()> {
                Err(hive_core::error::SchedulerError::ShuttingDown.into())
            }
        }

        let behavior = |m: Message<u32>| -> anyhow::Result<u32> { Ok(m.into_payload()) };
        let actor: Actor<u32, u32> = Actor::new(
            ActorId::new("stranded"),
            Box::new(behavior),
            Box::new(FifoMailbox::unbounded()),
            10,
            Arc::new(Refusing),
        );

        let reply = actor.ask(1).unwrap();
        assert!(matches!(reply.wait(), Err(ReplyError::Unscheduled(_))));
        assert_eq!(actor.pending(), 0);

        // Token was released, so a later send tries to schedule again
        let reply = actor.ask(2).unwrap();
        assert!(matches!(reply.wait(), Err(ReplyError::Unscheduled(_))));
    }

    #[test]
    fn test_refused_schedules_under_concurrent_sends() {
        struct Refusing;
        impl TaskScheduler for Refusing {
            fn schedule(&self, _task: Task) -> HiveResult<()> {
                Err(hive_core::error::SchedulerError::QueueFull.into())
            }
        }

        let behavior = |m: Message<u32>| -> anyhow::Result<u32> { Ok(m.into_payload()) };
        let actor: Actor<u32, u32> = Actor::new(
            ActorId::new("flooded"),
            Box::new(behavior),
            Box::new(FifoMailbox::unbounded()),
            10,
            Arc::new(Refusing),
        );

        let senders: Vec<_> = (0..4)
            .map(|_| {
                let actor = actor.clone();
                std::thread::spawn(move || {
                    (0..1_000)
                        .map(|i| actor.ask(i).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        // Every message is rejected; none is left waiting on a drain
        for sender in senders {
            for reply in sender.join().unwrap() {
                assert!(matches!(reply.wait(), Err(ReplyError::Unscheduled(_))));
            }
        }
        assert_eq!(actor.pending(), 0);
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42u8);

        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "<unknown panic>");
    }
}
