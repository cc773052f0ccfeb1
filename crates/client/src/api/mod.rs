//! Backend API access.
//!
//! # Architecture
//!
//! - [`ApiClient`] wraps `reqwest` and is the single chokepoint for the
//!   unauthenticated boundary: it attaches the bearer credential to outgoing
//!   calls and invalidates the session on authorization-class failures from
//!   non-public endpoints. No other component interprets authorization
//!   errors.
//! - [`normalize`] recovers tokens and profiles from the backend's varying
//!   payload shapes. It is the only place shape-guessing lives.
//! - [`endpoints`] names the consumed paths, the public-path whitelist, and
//!   the per-endpoint authorization header conventions.

mod client;
pub mod endpoints;
pub mod normalize;

pub use client::{ApiClient, ApiResponse, SessionNotice};

use thiserror::Error;

/// Errors from the transport layer.
///
/// Everything the backend actually answered - success or failure - comes
/// back as an [`ApiResponse`]; this error covers the cases where no usable
/// response exists at all.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed: connect error, timeout, or broken transfer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request path could not be joined onto the API base.
    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}
