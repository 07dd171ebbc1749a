//! Live, ordered view of a channel's messages
//!
//! Each push from the store carries the whole ordered result set; the local
//! snapshot is replaced with it rather than patched.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::models::{ChannelId, FeedSnapshot, Identity};
use crate::errors::HuddleError;
use crate::store::{CollectionPath, DocumentStore};

#[derive(Clone)]
pub struct FeedSubscription {
    store: Arc<dyn DocumentStore>,
}

impl FeedSubscription {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Open a live feed for `channel`.
    ///
    /// Returns `None` without subscribing when there is no identity.
    /// `on_update` receives every new snapshot in transport order; `on_error`
    /// receives listener errors, which never close the subscription.
    #[must_use]
    pub fn open<U, E>(
        &self,
        channel: &ChannelId,
        identity: Option<&Identity>,
        on_update: U,
        on_error: E,
    ) -> Option<Subscription>
    where
        U: Fn(FeedSnapshot) + Send + 'static,
        E: Fn(HuddleError) + Send + 'static,
    {
        let Some(identity) = identity else {
            debug!("No identity yet, not subscribing to channel {}", channel);
            return None;
        };

        let path = CollectionPath::channel_messages(channel);
        let mut stream = self.store.subscribe_ordered(&path);
        let (snapshots, _) = watch::channel(FeedSnapshot::default());
        let receiver = snapshots.subscribe();
        let token = CancellationToken::new();
        let cancel = token.clone();

        info!("Opening feed {} for {}", path, identity);

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = stream.next() => next,
                };
                // A push may race a cancel; nothing is delivered once cancelled.
                if cancel.is_cancelled() {
                    break;
                }
                match next {
                    Some(Ok(records)) => {
                        let snapshot = FeedSnapshot::from_records(records);
                        debug!("Feed {} now has {} messages", path, snapshot.len());
                        snapshots.send_replace(snapshot.clone());
                        on_update(snapshot);
                    }
                    Some(Err(e)) => {
                        warn!("Error fetching messages for {}: {}", path, e);
                        on_error(e);
                    }
                    None => {
                        debug!("Feed {} closed by the store", path);
                        break;
                    }
                }
            }
            debug!("Feed {} released", path);
        });

        Some(Subscription {
            channel: channel.clone(),
            identity: identity.clone(),
            snapshots: receiver,
            token,
        })
    }
}

/// Handle to an open feed. Cancelled on drop.
pub struct Subscription {
    channel: ChannelId,
    identity: Identity,
    snapshots: watch::Receiver<FeedSnapshot>,
    token: CancellationToken,
}

impl Subscription {
    /// Stop delivery and release the store listener. Safe to call repeatedly.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("Cancelling feed for channel {}", self.channel);
        }
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The most recently delivered snapshot.
    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every snapshot replacement.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<FeedSnapshot> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
