//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `PRICKLY_PEAR_API_BASE` - Base URL of the backend API
//!
//! ## Optional
//! - `PRICKLY_PEAR_TIMEOUT_SECS` - Outbound call ceiling in seconds (default: 30)
//! - `PRICKLY_PEAR_STATE_FILE` - Path of the persisted-state file; when unset,
//!   state lives in memory only

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::api::endpoints::{self, AuthScheme};

/// Default ceiling for a single backend call, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL all endpoint paths are joined onto.
    pub api_base: Url,
    /// Ceiling for a single outbound call.
    pub timeout: Duration,
    /// Per-endpoint `Authorization` header conventions. Endpoints not listed
    /// use [`AuthScheme::Bearer`].
    pub auth_overrides: HashMap<String, AuthScheme>,
    /// Persisted-state file. `None` keeps state in memory only.
    pub state_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Build a configuration with defaults for everything but the API base.
    #[must_use]
    pub fn new(api_base: Url) -> Self {
        Self {
            api_base: ensure_trailing_slash(api_base),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            auth_overrides: default_auth_overrides(),
            state_file: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base = get_required_env("PRICKLY_PEAR_API_BASE")?
            .parse::<Url>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PRICKLY_PEAR_API_BASE".to_string(), e.to_string())
            })?;

        let timeout_secs = get_env_or_default(
            "PRICKLY_PEAR_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("PRICKLY_PEAR_TIMEOUT_SECS".to_string(), e.to_string())
        })?;

        let state_file = get_optional_env("PRICKLY_PEAR_STATE_FILE").map(PathBuf::from);

        Ok(Self {
            api_base: ensure_trailing_slash(api_base),
            timeout: Duration::from_secs(timeout_secs),
            auth_overrides: default_auth_overrides(),
            state_file,
        })
    }
}

/// The account-verification route predates the `Bearer` convention and
/// expects the raw token in the `Authorization` header.
fn default_auth_overrides() -> HashMap<String, AuthScheme> {
    HashMap::from([(endpoints::ACCOUNT_VERIFY.to_owned(), AuthScheme::Raw)])
}

/// `Url::join` replaces the last path segment unless the base ends in `/`.
fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
