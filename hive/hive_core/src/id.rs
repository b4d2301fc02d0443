//! Identifiers for the Hive actor engine.
//!
//! Actors are addressed by [`ActorId`], a string that is either chosen by the
//! caller or generated. Messages carry a [`MessageId`], a thin wrapper around
//! a UUID with a phantom type parameter so ids of different kinds cannot be
//! mixed up.
//!
//! # Examples
//!
//! ```
//! use hive_core::id::{ActorId, MessageId};
//! use std::str::FromStr;
//!
//! let named = ActorId::new("counter");
//! assert_eq!(named.as_str(), "counter");
//!
//! let generated = ActorId::generate();
//! assert!(generated.as_str().starts_with("actor-"));
//!
//! let id_str = "550e8400-e29b-41d4-a716-446655440000";
//! let message_id = MessageId::from_str(id_str).unwrap();
//! assert_eq!(message_id.to_string(), id_str);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::{Ord, PartialOrd};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Prefix used for generated actor ids.
const GENERATED_ACTOR_PREFIX: &str = "actor-";

/// Identity of an actor within an actor system.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Create an actor id from an explicit name.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a unique actor id of the form `actor-<uuid>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hive_core::id::ActorId;
    ///
    /// assert_ne!(ActorId::generate(), ActorId::generate());
    /// ```
    pub fn generate() -> Self {
        Self(format!("{}{}", GENERATED_ACTOR_PREFIX, Uuid::new_v4()))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ActorId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ActorId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ActorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A type-safe identifier based on UUID.
///
/// Specialized for different entity types using the phantom type parameter
/// `T`, so that identifiers for different entities cannot be mixed up even
/// though they share the same underlying UUID structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Id<T> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: std::marker::PhantomData<T>,
}

impl<T> Id<T> {
    /// Create a new random identifier.
    pub fn new() -> Self {
        Self {
            uuid: Uuid::new_v4(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Create an identifier from a specific UUID.
    ///
    /// # Examples
    ///
    /// ```
    /// use hive_core::id::MessageId;
    /// use uuid::Uuid;
    ///
    /// let uuid = Uuid::new_v4();
    /// let id = MessageId::from_uuid(uuid);
    /// assert_eq!(id.uuid(), uuid);
    /// ```
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: std::marker::PhantomData,
        }
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uuid)
    }
}

impl<T> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            uuid: Uuid::parse_str(s)?,
            _marker: std::marker::PhantomData,
        })
    }
}

/// Marker type for messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageMarker;
/// Identifier for a message.
pub type MessageId = Id<MessageMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_explicit() {
        let id = ActorId::new("MyActor");
        assert_eq!(id.as_str(), "MyActor");
        assert_eq!(id.to_string(), "MyActor");
        assert_eq!(ActorId::from("MyActor"), id);
    }

    #[test]
    fn test_actor_id_generate() {
        let id1 = ActorId::generate();
        let id2 = ActorId::generate();
        assert_ne!(id1, id2, "Generated IDs should be unique");
        assert!(id1.as_str().starts_with(GENERATED_ACTOR_PREFIX));
        // prefix + 36 character UUID
        assert_eq!(id1.as_str().len(), GENERATED_ACTOR_PREFIX.len() + 36);
    }

    #[test]
    fn test_actor_id_serde_is_plain_string() {
        let id = ActorId::new("worker-1");
        let serialized = serde_json::to_string(&id).unwrap();
        assert_eq!(serialized, "\"worker-1\"");
        let deserialized: ActorId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_message_id_new() {
        let id1 = MessageId::new();
        let id2 = MessageId::new();
        assert_ne!(id1, id2);
        assert_eq!(id1.to_string().len(), 36);
    }

    #[test]
    fn test_message_id_from_str() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let id = MessageId::from_str(uuid_str).unwrap();
        assert_eq!(id.to_string(), uuid_str);
        assert!(MessageId::from_str("not-a-uuid").is_err());
    }

    #[test]
    fn test_message_id_serde() {
        let id = MessageId::new();
        let serialized = serde_json::to_string(&id).unwrap();
        let deserialized: MessageId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(id, deserialized);
    }
}
