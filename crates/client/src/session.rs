//! Session state: bearer token + user profile, persisted and observable.
//!
//! The store is a process-wide singleton shared via `Arc`. Reads are
//! synchronous snapshots; every mutation writes memory first, persists
//! best-effort, and only then bumps the change signal, so an observer that
//! re-reads on a signal can never see a half-updated session.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::watch;
use tracing::warn;

use prickly_pear_core::UserProfile;

use crate::storage::{Storage, keys};

/// A snapshot of the current authentication state.
///
/// `token` and `user` are independently optional: a token may exist before
/// the profile has been fetched. Absence of `token` means the client is
/// anonymous regardless of `user`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Opaque bearer credential.
    pub token: Option<String>,
    /// Normalized identity.
    pub user: Option<UserProfile>,
}

impl Session {
    /// `true` when a token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// Process-wide session store.
///
/// Cheaply cloneable via `Arc`. Observers call [`subscribe`](Self::subscribe)
/// and re-read the store whenever the epoch changes; the signal carries no
/// payload.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    state: RwLock<Session>,
    storage: Arc<dyn Storage>,
    epoch: watch::Sender<u64>,
}

impl SessionStore {
    /// Open the store, restoring any persisted token and profile.
    ///
    /// Malformed persisted state is discarded with a warning, never fatal.
    #[must_use]
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let token = storage.get(keys::TOKEN).unwrap_or_else(|err| {
            warn!(error = %err, "failed to read persisted token");
            None
        });

        let user = storage
            .get(keys::USER)
            .unwrap_or_else(|err| {
                warn!(error = %err, "failed to read persisted profile");
                None
            })
            .and_then(|raw| match serde_json::from_str::<UserProfile>(&raw) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "discarding corrupt persisted profile");
                    None
                }
            });

        let (epoch, _) = watch::channel(0);

        Self {
            inner: Arc::new(SessionStoreInner {
                state: RwLock::new(Session { token, user }),
                storage,
                epoch,
            }),
        }
    }

    /// Synchronous snapshot of the current session.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .token
            .clone()
    }

    /// Store a token in memory and in persisted storage, then signal.
    pub fn set_token(&self, token: &str) {
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            state.token = Some(token.to_owned());
        }
        if let Err(err) = self.inner.storage.set(keys::TOKEN, token) {
            warn!(error = %err, "failed to persist token");
        }
        self.notify();
    }

    /// Store a profile in memory and in persisted storage, then signal.
    pub fn set_user(&self, user: UserProfile) {
        let encoded = serde_json::to_string(&user);
        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            state.user = Some(user);
        }
        match encoded {
            Ok(raw) => {
                if let Err(err) = self.inner.storage.set(keys::USER, &raw) {
                    warn!(error = %err, "failed to persist profile");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode profile"),
        }
        self.notify();
    }

    /// Remove token and profile from memory and persisted storage.
    ///
    /// Returns `true` when there was anything to clear; the signal is only
    /// emitted in that case, so clearing an already-empty store is silent.
    pub fn clear(&self) -> bool {
        let had_any = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let had_any = state.token.is_some() || state.user.is_some();
            *state = Session::default();
            had_any
        };

        if let Err(err) = self.inner.storage.remove(keys::TOKEN) {
            warn!(error = %err, "failed to remove persisted token");
        }
        if let Err(err) = self.inner.storage.remove(keys::USER) {
            warn!(error = %err, "failed to remove persisted profile");
        }

        if had_any {
            self.notify();
        }
        had_any
    }

    /// Subscribe to change signals. The value is an epoch counter; re-read
    /// the store on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.epoch.subscribe()
    }

    fn notify(&self) {
        self.inner.epoch.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }
}
