//! Realtime document store port
//!
//! The store is an external collaborator: it accepts appends and pushes the
//! full ordered result set of a collection to every listener on each change.

pub mod memory;

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::core::models::{ChannelId, Message, NewMessage};
use crate::errors::HuddleError;

pub use memory::MemoryStore;

/// Stream of full, ascending result sets. The first item is the current state.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Vec<Message>, HuddleError>> + Send>>;

/// Slash-separated path of a message collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// `channels/{channel}/messages`
    #[must_use]
    pub fn channel_messages(channel: &ChannelId) -> Self {
        Self(format!("channels/{}/messages", channel.as_str()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append a record; the store assigns its id and ordering key.
    ///
    /// # Errors
    ///
    /// Returns `Store` on permission or transport failure.
    async fn append(&self, path: &CollectionPath, record: NewMessage)
    -> Result<String, HuddleError>;

    /// Subscribe to the collection ordered by the store-assigned key.
    ///
    /// Dropping the stream releases the listener.
    fn subscribe_ordered(&self, path: &CollectionPath) -> SnapshotStream;
}
