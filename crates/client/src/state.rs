//! Client composition root.

use std::sync::Arc;

use crate::api::{ApiClient, ApiError};
use crate::cart::CartAggregator;
use crate::config::ClientConfig;
use crate::services::auth::AuthService;
use crate::session::SessionStore;
use crate::storage::{FileStore, MemoryStore, Storage, StorageError};

/// Error creating the client state.
#[derive(Debug, thiserror::Error)]
pub enum ClientStateError {
    /// The persisted-state file could not be opened.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    /// The HTTP client could not be built.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// Everything an embedding application needs, wired together.
///
/// This struct is cheaply cloneable via `Arc`. The session store and cart
/// are process-wide singletons: clones observe the same state.
#[derive(Clone)]
pub struct ClientState {
    inner: Arc<ClientStateInner>,
}

struct ClientStateInner {
    config: ClientConfig,
    session: SessionStore,
    api: ApiClient,
    auth: AuthService,
    cart: CartAggregator,
}

impl ClientState {
    /// Wire the full client from configuration.
    ///
    /// State is file-backed when `config.state_file` is set, in-memory
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be opened or the HTTP
    /// client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientStateError> {
        let storage: Arc<dyn Storage> = match &config.state_file {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_storage(config, storage)
    }

    /// Wire the full client over an explicit storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, ClientStateError> {
        let session = SessionStore::open(Arc::clone(&storage));
        let api = ApiClient::new(&config, session.clone())?;
        let auth = AuthService::new(api.clone(), session.clone(), Arc::clone(&storage));
        let cart = CartAggregator::open(storage);

        Ok(Self {
            inner: Arc::new(ClientStateInner {
                config,
                session,
                api,
                auth,
                cart,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Get a reference to the API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the credential lifecycle service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the cart.
    #[must_use]
    pub fn cart(&self) -> &CartAggregator {
        &self.inner.cart
    }
}
