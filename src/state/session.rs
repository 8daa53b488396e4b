//! Session store: the single owner of authentication state.
//!
//! ARCHITECTURE
//! ============
//! The store is built once in the composition root and shared by `Arc`.
//! Readers take cloned [`Session`] snapshots or subscribe to a
//! `tokio::sync::watch` receiver; only the store writes.
//!
//! LIFECYCLE
//! =========
//! `loading` starts `true` and settles once, after [`SessionStore::restore`]
//! finishes its single validation round trip. Afterwards only `login`,
//! `logout`, and `expire` change the session.
//!
//! STALENESS
//! =========
//! `login` and `logout` bump an epoch under a mutex. Async results capture the
//! epoch before their request and are applied only if it is unchanged when
//! they come back, so a response landing after a logout never reinstates the
//! session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::config::RestorePolicy;
use crate::net::api::AuthApi;
use crate::net::error::ApiError;
use crate::net::types::{RegisterResponse, Role, RoleSet, User, ValidateResponse};
use crate::storage::{self, SessionStorage, StorageError};

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

// =============================================================================
// SESSION SNAPSHOT
// =============================================================================

/// Client-held record of who is signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub loading: bool,
}

impl Session {
    /// State at boot, before startup validation has settled.
    #[must_use]
    pub fn booting() -> Self {
        Self { user: None, token: None, loading: true }
    }

    /// Settled, unauthenticated.
    #[must_use]
    pub fn signed_out() -> Self {
        Self { user: None, token: None, loading: false }
    }

    #[must_use]
    pub fn signed_in(user: User, token: String) -> Self {
        Self { user: Some(user), token: Some(token), loading: false }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|user| user.role)
    }

    /// True when a user is present and their role is in `roles`.
    #[must_use]
    pub fn has_role(&self, roles: impl Into<RoleSet>) -> bool {
        let roles = roles.into();
        self.role().is_some_and(|role| roles.contains(role))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::booting()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The session changed (logout or another login) while the request was in flight.
    #[error("session changed while the request was in flight")]
    Superseded,

    #[error("not signed in")]
    NotAuthenticated,
}

impl AuthError {
    /// Message for the person at the keyboard: the server's own message when
    /// the payload carried one, otherwise `fallback`.
    #[must_use]
    pub fn user_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self {
            Self::Api(e) => e.user_message(fallback),
            _ => fallback,
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore {
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn SessionStorage>,
    policy: RestorePolicy,
    state: watch::Sender<Session>,
    epoch: Mutex<u64>,
    restore_started: AtomicBool,
}

impl SessionStore {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn SessionStorage>, policy: RestorePolicy) -> Self {
        Self {
            api,
            storage,
            policy,
            state: watch::Sender::new(Session::booting()),
            epoch: Mutex::new(0),
            restore_started: AtomicBool::new(false),
        }
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that observes every session change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    #[must_use]
    pub fn has_role(&self, roles: impl Into<RoleSet>) -> bool {
        self.state.borrow().has_role(roles)
    }

    /// Wait until startup validation has settled and return that snapshot.
    pub async fn settled(&self) -> Session {
        let mut rx = self.subscribe();
        match rx.wait_for(|session| !session.loading).await {
            Ok(session) => session.clone(),
            Err(_) => self.snapshot(),
        }
    }

    // =========================================================================
    // STARTUP
    // =========================================================================

    /// Restore the persisted session. Only the first call does any work;
    /// later calls wait for it to settle and return that snapshot.
    pub async fn restore(&self) -> Session {
        if self.restore_started.swap(true, Ordering::SeqCst) {
            return self.settled().await;
        }

        let Some(token) = storage::stored_token(self.storage.as_ref()) else {
            tracing::debug!("no stored token; session starts signed out");
            self.state.send_if_modified(|session| {
                let was_loading = session.loading;
                session.loading = false;
                was_loading
            });
            return self.snapshot();
        };

        let started = self.current_epoch();
        let outcome = self.api.validate(&token).await;

        let epoch = self.lock_epoch();
        if *epoch != started {
            tracing::debug!("session changed during validation; discarding result");
            self.state.send_if_modified(|session| {
                let was_loading = session.loading;
                session.loading = false;
                was_loading
            });
            return self.snapshot();
        }

        match self.validated_user(outcome) {
            Some(user) => {
                tracing::info!(user_id = user.id, role = %user.role, "session restored");
                self.state.send_replace(Session::signed_in(user, token));
            }
            None => {
                if let Err(e) = storage::clear_auth_data(self.storage.as_ref()) {
                    tracing::warn!(error = %e, "failed to clear stored session");
                }
                self.state.send_replace(Session::signed_out());
            }
        }
        drop(epoch);
        self.snapshot()
    }

    fn validated_user(&self, outcome: Result<ValidateResponse, ApiError>) -> Option<User> {
        match outcome {
            Ok(response) => {
                let msg = response.msg.clone();
                let user = response.into_user();
                if user.is_none() {
                    tracing::info!(msg = msg.as_deref().unwrap_or(""), "stored token rejected");
                }
                user
            }
            Err(e) if e.is_transport() && self.policy == RestorePolicy::KeepCached => {
                let cached = storage::cached_user(self.storage.as_ref());
                if cached.is_some() {
                    tracing::warn!(error = %e, "validation unreachable; keeping cached session");
                } else {
                    tracing::warn!(error = %e, "validation unreachable and no cached user");
                }
                cached
            }
            Err(e) => {
                tracing::warn!(error = %e, "token validation failed");
                None
            }
        }
    }

    // =========================================================================
    // EXPLICIT ACTIONS
    // =========================================================================

    /// Sign in. On failure the session is left untouched.
    ///
    /// # Errors
    ///
    /// The API error, a storage failure, or `Superseded` if the session
    /// changed while the request was in flight.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let started = self.current_epoch();
        let response = self.api.login(username, password).await.inspect_err(|e| {
            tracing::info!(%username, error = %e, "login failed");
        })?;

        let mut epoch = self.lock_epoch();
        if *epoch != started {
            tracing::debug!(%username, "session changed during login; discarding result");
            return Err(AuthError::Superseded);
        }

        storage::store_auth_data(self.storage.as_ref(), &response.access_token, &response.user)?;
        *epoch += 1;
        tracing::info!(user_id = response.user.id, role = %response.user.role, "signed in");
        self.state
            .send_replace(Session::signed_in(response.user.clone(), response.access_token));
        Ok(response.user)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// The API error, unchanged.
    pub async fn register(&self, username: &str, password: &str, role: Role) -> Result<RegisterResponse, AuthError> {
        let response = self.api.register(username, password, role).await.inspect_err(|e| {
            tracing::info!(%username, %role, error = %e, "registration failed");
        })?;
        tracing::info!(%username, %role, "registered user");
        Ok(response)
    }

    /// Sign out. Idempotent.
    pub fn logout(&self) {
        let mut epoch = self.lock_epoch();
        self.sign_out(&mut epoch);
    }

    /// Sign out after the server rejected the token on a regular request.
    pub fn expire(&self) {
        tracing::warn!("server rejected bearer token; signing out");
        self.logout();
    }

    /// Like [`expire`](Self::expire), but only while `token` is still the
    /// session's token. A rejection of a token that has since been replaced
    /// by logout or another login is ignored. Returns whether it signed out.
    pub fn expire_if(&self, token: &str) -> bool {
        let mut epoch = self.lock_epoch();
        if self.state.borrow().token.as_deref() != Some(token) {
            tracing::debug!("rejected token is no longer current; keeping session");
            return false;
        }
        tracing::warn!("server rejected bearer token; signing out");
        self.sign_out(&mut epoch);
        true
    }

    fn sign_out(&self, epoch: &mut MutexGuard<'_, u64>) {
        **epoch += 1;
        if let Err(e) = storage::clear_auth_data(self.storage.as_ref()) {
            tracing::warn!(error = %e, "failed to clear stored session");
        }
        self.state.send_replace(Session::signed_out());
    }
}
