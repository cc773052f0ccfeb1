//! Prickly Pear client core.
//!
//! The client-side identity & commerce-state core of a commerce storefront:
//! a persisted session, the credential lifecycle flows, a request gateway
//! that owns the unauthenticated boundary, and a persisted cart.
//!
//! # Architecture
//!
//! - [`session`] - token + user profile, persisted, observable via a watch
//!   channel
//! - [`api`] - request gateway (bearer attachment, timeout ceiling, global
//!   session invalidation) and payload normalization for an inconsistently
//!   shaped backend
//! - [`services::auth`] - registration, verification, login, and
//!   password-reset flows with single-flight guards
//! - [`cart`] - line-item aggregation with write-through persistence
//! - [`state`] - composition root wiring the above together
//!
//! # Example
//!
//! ```rust,ignore
//! use prickly_pear_client::{ClientState, ClientConfig};
//!
//! let config = ClientConfig::from_env()?;
//! let state = ClientState::new(config)?;
//!
//! state.auth().login("user@example.com", "password").await?;
//! assert!(state.session().session().is_authenticated());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;

pub use api::{ApiClient, ApiError, ApiResponse, SessionNotice};
pub use cart::CartAggregator;
pub use config::{ClientConfig, ConfigError};
pub use services::auth::{
    AuthError, AuthService, LoginOutcome, RegisterOutcome, ResendOutcome, ResetOtpOutcome,
    ResetOutcome, ResetRequestOutcome, VerifyOutcome,
};
pub use session::{Session, SessionStore};
pub use state::ClientState;
pub use storage::{FileStore, MemoryStore, Storage, StorageError};
