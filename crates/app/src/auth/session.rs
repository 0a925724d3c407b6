//! Client session: the remembered credential and backend session cookie.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, info, warn};

use crate::auth::{
    AccessToken, Customer, CredentialStore, CredentialsError, MemoryCredentialStore, SessionState,
};

/// Explicit session object handed to every service instead of ambient global storage.
///
/// Reads are served from memory; every change is written through to the store. A failed write
/// is logged and otherwise ignored, so a broken credentials file never blocks a request.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    state: RwLock<SessionState>,
}

impl Session {
    /// Open a session backed by `store`, loading whatever it remembers.
    pub fn open(store: Arc<dyn CredentialStore>) -> Result<Self, CredentialsError> {
        let state = store.load()?;

        Ok(Self {
            store,
            state: RwLock::new(state),
        })
    }

    /// Session with nothing remembered and nothing persisted beyond the process.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryCredentialStore::new()),
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Token to attach as a bearer credential, if any.
    pub fn bearer(&self) -> Option<AccessToken> {
        self.read(|state| state.token.clone())
    }

    pub fn customer(&self) -> Option<Customer> {
        self.read(|state| state.customer.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.token.is_some() || state.customer.is_some())
    }

    pub fn cookie(&self) -> Option<String> {
        self.read(|state| state.cookie.clone())
    }

    /// Remember a successful login.
    pub fn sign_in(&self, token: Option<AccessToken>, customer: Customer) {
        info!(customer_id = customer.customer_id, "signed in");

        self.update(|state| {
            state.token = token;
            state.customer = Some(customer);
            true
        });
    }

    /// Forget the credential and the remembered user. The session cookie, which carries the
    /// server-side cart, is kept. Returns whether anything was cleared.
    pub fn evict(&self) -> bool {
        let mut evicted = false;

        self.update(|state| {
            evicted = state.token.is_some() || state.customer.is_some();
            state.token = None;
            state.customer = None;
            evicted
        });

        if evicted {
            info!("credentials evicted");
        }

        evicted
    }

    /// Remember the latest backend session cookie.
    pub fn set_cookie(&self, cookie: Option<String>) {
        self.update(|state| {
            if state.cookie == cookie {
                return false;
            }

            debug!("session cookie updated");

            state.cookie = cookie;
            true
        });
    }

    fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update(&self, f: impl FnOnce(&mut SessionState) -> bool) {
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

            if !f(&mut state) {
                return;
            }

            state.clone()
        };

        if let Err(error) = self.store.save(&snapshot) {
            warn!("failed to persist session: {error}");
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
