//! Participant identity resolution
//!
//! Strategies are tried in order: an already signed-in principal, then a
//! pre-provisioned custom token, then anonymous sign-in. Only the anonymous
//! path failing is fatal.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::models::{Identity, Principal};
use crate::errors::HuddleError;

pub use memory::MemoryIdentityService;

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn current_principal(&self) -> Option<Principal>;

    /// # Errors
    ///
    /// Returns an error if the service refuses to issue an anonymous session.
    async fn sign_in_anonymous(&self) -> Result<Principal, HuddleError>;

    /// # Errors
    ///
    /// Returns `TokenExchange` if the token is rejected.
    async fn sign_in_with_token(&self, token: &str) -> Result<Principal, HuddleError>;

    /// Auth state notifications. The receiver starts at the current state.
    fn subscribe_changes(&self) -> watch::Receiver<Option<Principal>>;
}

#[derive(Clone)]
pub struct IdentityResolver {
    service: Arc<dyn IdentityService>,
    custom_token: Option<String>,
}

impl IdentityResolver {
    #[must_use]
    pub fn new(service: Arc<dyn IdentityService>, custom_token: Option<String>) -> Self {
        Self {
            service,
            custom_token: custom_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Resolve the participant identity once.
    ///
    /// # Errors
    ///
    /// Returns `IdentityUnavailable` when anonymous issuance fails.
    pub async fn resolve(&self) -> Result<Identity, HuddleError> {
        if let Some(identity) = self
            .service
            .current_principal()
            .await
            .and_then(|p| p.to_identity())
        {
            debug!("Reusing signed-in principal {}", identity);
            return Ok(identity);
        }

        self.sign_in().await
    }

    async fn sign_in(&self) -> Result<Identity, HuddleError> {
        if let Some(token) = &self.custom_token {
            match self.service.sign_in_with_token(token).await {
                Ok(principal) => {
                    if let Some(identity) = principal.to_identity() {
                        info!("Signed in with custom token as {}", identity);
                        return Ok(identity);
                    }
                    warn!("Custom token sign-in returned an empty uid, falling back to anonymous");
                }
                Err(e) => {
                    warn!("Error signing in with custom token: {}", e);
                }
            }
        }

        match self.service.sign_in_anonymous().await {
            Ok(principal) => principal.to_identity().ok_or_else(|| {
                error!("Anonymous sign-in returned an empty uid");
                HuddleError::IdentityUnavailable("anonymous sign-in returned an empty uid".into())
            }),
            Err(e) => {
                error!("Anonymous sign-in failed: {}", e);
                Err(HuddleError::IdentityUnavailable(e.to_string()))
            }
        }
    }

    /// Follow the service's auth state, emitting a new identity whenever the
    /// signed-in principal changes and signing back in after a sign-out.
    #[must_use]
    pub fn watch(&self) -> IdentityWatch {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();
        let resolver = self.clone();
        let cancel = token.clone();

        tokio::spawn(async move {
            let mut changes = resolver.service.subscribe_changes();
            let mut last: Option<Identity> = None;

            loop {
                let principal = changes.borrow_and_update().clone();
                match principal.and_then(|p| p.to_identity()) {
                    Some(identity) => {
                        if last.as_ref() != Some(&identity) {
                            if cancel.is_cancelled() {
                                break;
                            }
                            debug!("Identity changed to {}", identity);
                            last = Some(identity.clone());
                            if tx.send(Ok(identity)).is_err() {
                                break;
                            }
                        }
                    }
                    None => {
                        last = None;
                        // A successful sign-in is reported through `changes`.
                        let outcome = tokio::select! {
                            biased;
                            () = cancel.cancelled() => break,
                            result = resolver.sign_in() => result,
                        };
                        if let Err(e) = outcome {
                            if !cancel.is_cancelled() {
                                let _ = tx.send(Err(e));
                            }
                            break;
                        }
                    }
                }

                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = changes.changed() => {
                        if changed.is_err() {
                            debug!("Identity service closed its change feed");
                            break;
                        }
                    }
                }
            }
        });

        IdentityWatch { receiver: rx, token }
    }
}

/// Live identity updates. Cancelled on drop.
pub struct IdentityWatch {
    receiver: mpsc::UnboundedReceiver<Result<Identity, HuddleError>>,
    token: CancellationToken,
}

impl IdentityWatch {
    /// Next identity change, or a fatal `IdentityUnavailable`. `None` once
    /// the watch has ended or been cancelled, even if changes were queued.
    pub async fn next(&mut self) -> Option<Result<Identity, HuddleError>> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            item = self.receiver.recv() => item.filter(|_| !self.token.is_cancelled()),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for IdentityWatch {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
