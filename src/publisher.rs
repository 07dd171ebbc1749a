use std::sync::Arc;

use tracing::{debug, error, info};

use crate::core::models::{ChannelId, Identity, NewMessage};
use crate::errors::HuddleError;
use crate::store::{CollectionPath, DocumentStore};

/// Why a send was skipped without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyText,
    NoIdentity,
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted by the store under this record id.
    Sent(String),
    Skipped(SkipReason),
}

/// Appends messages on behalf of the resolved identity.
///
/// There is no optimistic echo: a sent message shows up only through the
/// next feed push.
#[derive(Clone, Default)]
pub struct MessagePublisher {
    store: Option<Arc<dyn DocumentStore>>,
}

impl MessagePublisher {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A publisher without a store handle; every send is skipped.
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns the store's error if the append fails. Nothing is retried.
    pub async fn send(
        &self,
        channel: &ChannelId,
        identity: Option<&Identity>,
        text: &str,
    ) -> Result<SendOutcome, HuddleError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Skipped(SkipReason::EmptyText));
        }
        let Some(identity) = identity else {
            debug!("Dropping send to {}: no identity", channel);
            return Ok(SendOutcome::Skipped(SkipReason::NoIdentity));
        };
        let Some(store) = &self.store else {
            debug!("Dropping send to {}: store not initialized", channel);
            return Ok(SendOutcome::Skipped(SkipReason::StoreUnavailable));
        };

        let path = CollectionPath::channel_messages(channel);
        match store.append(&path, NewMessage::new(identity, text)).await {
            Ok(id) => {
                info!("Sent message {} to {}", id, path);
                Ok(SendOutcome::Sent(id))
            }
            Err(e) => {
                error!("Error sending message to {}: {}", path, e);
                Err(e)
            }
        }
    }
}
