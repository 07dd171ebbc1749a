//! In-process document store
//!
//! Assigns monotonic ordering keys and pushes full result sets over a
//! `watch` channel per collection, so a slow listener only ever observes the
//! latest state.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::{CollectionPath, DocumentStore, SnapshotStream};
use crate::core::models::{Message, NewMessage, OrderingKey};
use crate::errors::HuddleError;

#[derive(Debug, Clone)]
enum Push {
    Snapshot(Arc<Vec<Message>>),
    Error(String),
}

struct Collection {
    records: Vec<Message>,
    next_sequence: u64,
    last_timestamp: Option<DateTime<Utc>>,
    pushes: watch::Sender<Push>,
}

impl Collection {
    fn new() -> Self {
        let (pushes, _) = watch::channel(Push::Snapshot(Arc::new(Vec::new())));
        Self {
            records: Vec::new(),
            next_sequence: 0,
            last_timestamp: None,
            pushes,
        }
    }

    fn next_key(&mut self) -> OrderingKey {
        let now = Utc::now();
        let timestamp = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);
        self.next_sequence += 1;
        OrderingKey {
            timestamp,
            sequence: self.next_sequence,
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<CollectionPath, Collection>>,
    append_failures: Mutex<VecDeque<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next append fail with a `Store` error carrying `reason`.
    pub fn fail_next_append(&self, reason: impl Into<String>) {
        lock(&self.append_failures).push_back(reason.into());
    }

    /// Push a listener error to every subscriber of `path`.
    pub fn inject_listener_error(&self, path: &CollectionPath, reason: impl Into<String>) {
        let mut collections = lock(&self.collections);
        let collection = collections
            .entry(path.clone())
            .or_insert_with(Collection::new);
        collection.pushes.send_replace(Push::Error(reason.into()));
    }

    /// Current records of `path`, ascending by ordering key.
    #[must_use]
    pub fn records(&self, path: &CollectionPath) -> Vec<Message> {
        lock(&self.collections)
            .get(path)
            .map(|c| c.records.clone())
            .unwrap_or_default()
    }

    /// Number of live listeners on `path`.
    #[must_use]
    pub fn listener_count(&self, path: &CollectionPath) -> usize {
        lock(&self.collections)
            .get(path)
            .map_or(0, |c| c.pushes.receiver_count())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append(
        &self,
        path: &CollectionPath,
        record: NewMessage,
    ) -> Result<String, HuddleError> {
        if let Some(reason) = lock(&self.append_failures).pop_front() {
            return Err(HuddleError::Store(reason));
        }

        let mut collections = lock(&self.collections);
        let collection = collections
            .entry(path.clone())
            .or_insert_with(Collection::new);

        let message = Message {
            id: Uuid::new_v4().to_string(),
            author_id: record.author_id,
            text: record.text,
            server_timestamp: collection.next_key(),
        };
        let id = message.id.clone();
        debug!(
            "Appended record {} to {} at sequence {}",
            id, path, message.server_timestamp.sequence
        );

        collection.records.push(message);
        collection
            .pushes
            .send_replace(Push::Snapshot(Arc::new(collection.records.clone())));

        Ok(id)
    }

    fn subscribe_ordered(&self, path: &CollectionPath) -> SnapshotStream {
        let mut collections = lock(&self.collections);
        let collection = collections
            .entry(path.clone())
            .or_insert_with(Collection::new);

        let initial = collection.records.clone();
        let receiver = collection.pushes.subscribe();

        let updates = stream::unfold(receiver, |mut receiver| async move {
            receiver.changed().await.ok()?;
            let push = receiver.borrow_and_update().clone();
            let item = match push {
                Push::Snapshot(records) => Ok(records.as_ref().clone()),
                Push::Error(reason) => Err(HuddleError::Subscription(reason)),
            };
            Some((item, receiver))
        });

        Box::pin(stream::once(async move { Ok(initial) }).chain(updates))
    }
}
