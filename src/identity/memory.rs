//! In-process identity service with a static token table.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use super::IdentityService;
use crate::core::models::Principal;
use crate::errors::HuddleError;

pub struct MemoryIdentityService {
    principal: watch::Sender<Option<Principal>>,
    tokens: Mutex<HashMap<String, String>>,
    fail_anonymous: AtomicBool,
    anonymous_sign_ins: AtomicUsize,
    token_sign_ins: AtomicUsize,
}

impl Default for MemoryIdentityService {
    fn default() -> Self {
        let (principal, _) = watch::channel(None);
        Self {
            principal,
            tokens: Mutex::new(HashMap::new()),
            fail_anonymous: AtomicBool::new(false),
            anonymous_sign_ins: AtomicUsize::new(0),
            token_sign_ins: AtomicUsize::new(0),
        }
    }
}

impl MemoryIdentityService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `uid` already signed in.
    #[must_use]
    pub fn signed_in(uid: impl Into<String>) -> Self {
        let service = Self::default();
        service.principal.send_replace(Some(Principal {
            uid: uid.into(),
            anonymous: false,
        }));
        service
    }

    /// Accept `token` in exchange for a session as `uid`.
    #[must_use]
    pub fn with_token(self, token: impl Into<String>, uid: impl Into<String>) -> Self {
        self.tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(token.into(), uid.into());
        self
    }

    /// Make every anonymous sign-in fail.
    pub fn set_anonymous_failure(&self, fail: bool) {
        self.fail_anonymous.store(fail, Ordering::SeqCst);
    }

    pub fn sign_out(&self) {
        self.principal.send_replace(None);
    }

    #[must_use]
    pub fn anonymous_sign_ins(&self) -> usize {
        self.anonymous_sign_ins.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn token_sign_ins(&self) -> usize {
        self.token_sign_ins.load(Ordering::SeqCst)
    }

    fn set_principal(&self, principal: Principal) -> Principal {
        self.principal.send_replace(Some(principal.clone()));
        principal
    }
}

#[async_trait]
impl IdentityService for MemoryIdentityService {
    async fn current_principal(&self) -> Option<Principal> {
        self.principal.borrow().clone()
    }

    async fn sign_in_anonymous(&self) -> Result<Principal, HuddleError> {
        if self.fail_anonymous.load(Ordering::SeqCst) {
            return Err(HuddleError::IdentityUnavailable(
                "anonymous sign-in is disabled".to_string(),
            ));
        }
        self.anonymous_sign_ins.fetch_add(1, Ordering::SeqCst);
        Ok(self.set_principal(Principal {
            uid: Uuid::new_v4().simple().to_string(),
            anonymous: true,
        }))
    }

    async fn sign_in_with_token(&self, token: &str) -> Result<Principal, HuddleError> {
        let uid = self
            .tokens
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or_else(|| HuddleError::TokenExchange("invalid custom token".to_string()))?;
        self.token_sign_ins.fetch_add(1, Ordering::SeqCst);
        Ok(self.set_principal(Principal {
            uid,
            anonymous: false,
        }))
    }

    fn subscribe_changes(&self) -> watch::Receiver<Option<Principal>> {
        self.principal.subscribe()
    }
}
