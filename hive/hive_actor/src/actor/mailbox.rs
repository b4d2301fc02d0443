//! Actor mailbox implementation.
//!
//! A mailbox is the FIFO queue of pending work for one actor. Besides the
//! queue itself it owns the actor's drain token: the single permission to
//! run a drain pass. `add` reports whether it picked the token up from an
//! idle mailbox, and `try_idle` puts it back only if the queue is empty at
//! that moment. Both happen under the same lock as the queue mutation, so
//! two senders can never both believe they found the mailbox idle.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

use hive_core::error::ConfigError;

/// Error when adding to a mailbox. The rejected item is handed back.
pub enum MailboxError<T> {
    /// The mailbox is full (bounded capacity reached)
    Full(T),
    /// The mailbox has been sealed because its actor is dead
    Closed(T),
}

impl<T> fmt::Debug for MailboxError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for MailboxError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("mailbox is full"),
            Self::Closed(_) => f.write_str("mailbox is closed"),
        }
    }
}

impl<T> std::error::Error for MailboxError<T> {}

/// Outcome of a successful `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The mailbox was idle; the caller now holds the drain token and must
    /// start a drain pass.
    Claimed,
    /// A drain pass is already responsible for this mailbox.
    Pending,
}

/// A thread-safe queue of pending items for one actor.
///
/// Implementations must keep items in FIFO order and must make the
/// enqueue-and-claim in `add` atomic with respect to `try_idle`.
pub trait Mailbox<T>: Send + Sync {
    /// Enqueue an item.
    ///
    /// Never blocks. A rejected item is returned inside the error and stays
    /// the caller's responsibility.
    fn add(&self, item: T) -> Result<Enqueued, MailboxError<T>>;

    /// Pop the oldest item, or `None` if the mailbox is empty.
    fn remove(&self) -> Option<T>;

    /// Number of queued items. May be stale under concurrent mutation.
    fn size(&self) -> usize;

    /// Maximum number of queued items, or `None` when unbounded.
    fn capacity(&self) -> Option<usize>;

    /// Release the drain token if the mailbox is empty.
    ///
    /// Returns `true` if the mailbox went idle. Returns `false` if items
    /// remain, in which case the caller still holds the token and must
    /// arrange another drain pass.
    fn try_idle(&self) -> bool;

    /// Remove and return every queued item and release the drain token,
    /// in one step. A later `add` claims the mailbox again.
    fn clear(&self) -> Vec<T>;

    /// Refuse all further items and return those still queued.
    fn seal(&self) -> Vec<T>;
}

struct MailboxState<T> {
    queue: VecDeque<T>,
    draining: bool,
    sealed: bool,
}

/// First-in first-out mailbox, unbounded or with a fixed capacity.
pub struct FifoMailbox<T> {
    state: Mutex<MailboxState<T>>,
    capacity: Option<usize>,
}

impl<T> FifoMailbox<T> {
    /// Create a mailbox that never rejects for lack of space.
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// Create a mailbox holding at most `capacity` queued items.
    pub fn bounded(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::InvalidMailboxCapacity);
        }
        Ok(Self::with_capacity(Some(capacity)))
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(MailboxState {
                queue: VecDeque::new(),
                draining: false,
                sealed: false,
            }),
            capacity,
        }
    }

    /// Whether the mailbox has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.state.lock().sealed
    }
}

impl<T> Default for FifoMailbox<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T: Send> Mailbox<T> for FifoMailbox<T> {
    fn add(&self, item: T) -> Result<Enqueued, MailboxError<T>> {
        let mut state = self.state.lock();

        if state.sealed {
            return Err(MailboxError::Closed(item));
        }
        if let Some(capacity) = self.capacity {
            if state.queue.len() >= capacity {
                return Err(MailboxError::Full(item));
            }
        }

        state.queue.push_back(item);

        if state.draining {
            Ok(Enqueued::Pending)
        } else {
            state.draining = true;
            Ok(Enqueued::Claimed)
        }
    }

    fn remove(&self) -> Option<T> {
        self.state.lock().queue.pop_front()
    }

    fn size(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn try_idle(&self) -> bool {
        let mut state = self.state.lock();
        if state.queue.is_empty() {
            state.draining = false;
            true
        } else {
            false
        }
    }

    fn clear(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.draining = false;
        state.queue.drain(..).collect()
    }

    fn seal(&self) -> Vec<T> {
        let mut state = self.state.lock();
        state.sealed = true;
        state.queue.drain(..).collect()
    }
}

impl<T> fmt::Debug for FifoMailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FifoMailbox")
            .field("size", &state.queue.len())
            .field("capacity", &self.capacity)
            .field("draining", &state.draining)
            .field("sealed", &state.sealed)
            .finish()
    }
}
