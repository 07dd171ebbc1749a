//! Session wiring
//!
//! `HuddleClient` is the explicitly constructed handle to the three external
//! collaborators. `ChatSession` owns the per-session state: the identity, the
//! current channel, its live feed and its summarization coordinator. The feed
//! is reopened on every channel or identity change and released on close.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{info, warn};

use crate::ai::{GeminiClient, Summarizer};
use crate::core::config::AppConfig;
use crate::core::models::{ChannelId, FeedSnapshot, Identity, SummaryResult};
use crate::errors::HuddleError;
use crate::feed::{FeedSubscription, Subscription};
use crate::identity::{IdentityResolver, IdentityService, IdentityWatch};
use crate::publisher::{MessagePublisher, SendOutcome};
use crate::store::DocumentStore;
use crate::summarize::{SummarizationCoordinator, SummarizeRejection};

#[derive(Clone)]
pub struct HuddleClient {
    identity_service: Arc<dyn IdentityService>,
    store: Arc<dyn DocumentStore>,
    summarizer: Arc<dyn Summarizer>,
    custom_token: Option<String>,
}

impl HuddleClient {
    #[must_use]
    pub fn new(
        identity_service: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            identity_service,
            store,
            summarizer,
            custom_token: None,
        }
    }

    /// Build with a Gemini summarizer and the configured custom token.
    ///
    /// # Errors
    ///
    /// Returns `HttpError` if the summarizer HTTP client cannot be built.
    pub fn from_config(
        config: &AppConfig,
        identity_service: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, HuddleError> {
        let summarizer = Arc::new(GeminiClient::from_config(config)?);
        Ok(Self::new(identity_service, store, summarizer)
            .with_custom_token(config.initial_auth_token.clone()))
    }

    #[must_use]
    pub fn with_custom_token(mut self, token: Option<String>) -> Self {
        self.custom_token = token;
        self
    }

    #[must_use]
    pub fn identity_resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.identity_service.clone(), self.custom_token.clone())
    }

    #[must_use]
    pub fn feed(&self) -> FeedSubscription {
        FeedSubscription::new(self.store.clone())
    }

    #[must_use]
    pub fn publisher(&self) -> MessagePublisher {
        MessagePublisher::new(self.store.clone())
    }

    #[must_use]
    pub fn coordinator(&self) -> SummarizationCoordinator {
        SummarizationCoordinator::new(self.summarizer.clone())
    }
}

pub struct ChatSession {
    client: HuddleClient,
    identity: Option<Identity>,
    channel: ChannelId,
    feed: FeedSubscription,
    publisher: MessagePublisher,
    coordinator: SummarizationCoordinator,
    subscription: Option<Subscription>,
    last_feed_error: Arc<Mutex<Option<String>>>,
}

impl ChatSession {
    /// Resolve the identity, then open the feed for `channel`.
    ///
    /// # Errors
    ///
    /// Returns `IdentityUnavailable` if no identity can be established.
    pub async fn start(client: &HuddleClient, channel: ChannelId) -> Result<Self, HuddleError> {
        let identity = client.identity_resolver().resolve().await?;
        info!("Session started as {} in channel {}", identity, channel);

        let mut session = Self {
            client: client.clone(),
            identity: None,
            channel,
            feed: client.feed(),
            publisher: client.publisher(),
            coordinator: client.coordinator(),
            subscription: None,
            last_feed_error: Arc::new(Mutex::new(None)),
        };
        session.set_identity(identity);
        Ok(session)
    }

    fn reopen(&mut self) {
        if let Some(previous) = self.subscription.take() {
            previous.cancel();
        }

        *self
            .last_feed_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;

        // The error slot tracks the most recent push: a good snapshot clears it.
        let cleared = self.last_feed_error.clone();
        let last_error = self.last_feed_error.clone();
        self.subscription = self.feed.open(
            &self.channel,
            self.identity.as_ref(),
            move |_| {
                *cleared.lock().unwrap_or_else(PoisonError::into_inner) = None;
            },
            move |e| {
                *last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
            },
        );
    }

    /// Move to another channel. The old feed is released and summaries start
    /// over with a fresh coordinator.
    pub fn switch_channel(&mut self, channel: ChannelId) {
        if channel == self.channel && self.subscription.is_some() {
            return;
        }
        info!("Switching channel {} -> {}", self.channel, channel);
        self.channel = channel;
        self.coordinator = self.client.coordinator();
        self.reopen();
    }

    pub fn set_identity(&mut self, identity: Identity) {
        if self.identity.as_ref() == Some(&identity) && self.subscription.is_some() {
            return;
        }
        self.identity = Some(identity);
        self.reopen();
    }

    /// Apply the next change from `watch`. A fatal identity error closes the
    /// feed and leaves the session without an identity.
    pub async fn follow_identity(
        &mut self,
        watch: &mut IdentityWatch,
    ) -> Option<Result<Identity, HuddleError>> {
        let next = watch.next().await?;
        match &next {
            Ok(identity) => self.set_identity(identity.clone()),
            Err(e) => {
                warn!("Identity lost: {}", e);
                self.identity = None;
                self.close();
            }
        }
        Some(next)
    }

    /// # Errors
    ///
    /// Returns the store error if the append fails.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, HuddleError> {
        self.publisher
            .send(&self.channel, self.identity.as_ref(), text)
            .await
    }

    /// # Errors
    ///
    /// Returns a `SummarizeRejection` when the feed is empty or a run is
    /// already in flight.
    pub async fn summarize(&self) -> Result<SummaryResult, SummarizeRejection> {
        self.coordinator.summarize(&self.snapshot()).await
    }

    #[must_use]
    pub fn snapshot(&self) -> FeedSnapshot {
        self.subscription
            .as_ref()
            .map(Subscription::snapshot)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn updates(&self) -> Option<watch::Receiver<FeedSnapshot>> {
        self.subscription.as_ref().map(Subscription::updates)
    }

    #[must_use]
    pub fn summary_results(&self) -> watch::Receiver<Option<SummaryResult>> {
        self.coordinator.results()
    }

    /// The listener error from the latest push, if that push failed.
    #[must_use]
    pub fn last_feed_error(&self) -> Option<String> {
        self.last_feed_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Release the feed. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            info!("Closed feed for channel {}", self.channel);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}
