//! HTTP gateway to the backend.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::session::SessionStore;

use super::ApiError;
use super::endpoints::{self, AuthScheme};

/// Message shown when the gateway wipes the session.
const SESSION_EXPIRED_MESSAGE: &str =
    "Your session has expired or the account was removed. Please sign in again.";

/// Capacity of the notice channel; invalidation is rare and consumers read
/// promptly, so a small buffer is plenty.
const NOTICE_CAPACITY: usize = 8;

/// Notice broadcast when the gateway invalidates the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The backend rejected an authenticated call. The session has been
    /// cleared; route the user to an unauthenticated landing view and show
    /// `message`.
    Expired {
        /// User-visible explanation.
        message: String,
    },
}

/// A backend response: status plus parsed JSON body.
///
/// Non-2xx statuses are data, not transport errors - flows classify them
/// themselves (except authorization failures, which the gateway already
/// handled before this value was returned).
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: StatusCode,
    /// Parsed body. Non-JSON bodies are wrapped as `{"message": <text>}` so
    /// message classification still works; empty bodies are `null`.
    pub body: Value,
}

impl ApiResponse {
    /// `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The server-reported message, wherever the backend put it.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        const MESSAGE_PATHS: &[&[&str]] = &[&["message"], &["error"], &["data", "message"]];
        MESSAGE_PATHS
            .iter()
            .find_map(|path| super::normalize::lookup(&self.body, path).and_then(Value::as_str))
    }
}

/// Client for the storefront backend.
///
/// Every outgoing call goes through here: the stored token is attached
/// (unless the caller supplied its own `Authorization` header), a fixed
/// timeout bounds the call, and authorization-class failures from
/// non-public endpoints invalidate the session exactly once.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    base: Url,
    session: SessionStore,
    auth_overrides: HashMap<String, AuthScheme>,
    notices: broadcast::Sender<SessionNotice>,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionStore) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                base: config.api_base.clone(),
                session,
                auth_overrides: config.auth_overrides.clone(),
                notices,
            }),
        })
    }

    /// Subscribe to session-invalidation notices.
    #[must_use]
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.inner.notices.subscribe()
    }

    /// POST a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unjoinable path.
    pub async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.request(Method::POST, path, Some(body), HeaderMap::new())
            .await
    }

    /// GET a path.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unjoinable path.
    pub async fn get(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.request(Method::GET, path, None, HeaderMap::new()).await
    }

    /// Issue a request with explicit method, optional body, and extra
    /// headers. A caller-supplied `Authorization` header wins over the
    /// stored token.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or an unjoinable path.
    #[instrument(skip(self, body, headers), fields(path = %path))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        mut headers: HeaderMap,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.inner.base.join(path.trim_start_matches('/'))?;

        if !headers.contains_key(AUTHORIZATION)
            && let Some(token) = self.inner.session.token()
        {
            let value = self.scheme_for(path).header_value(&token);
            match HeaderValue::from_str(&value) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(err) => warn!(error = %err, "stored token is not a valid header value"),
            }
        }

        let mut request = self.inner.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        let body = parse_body(&text);

        debug!(status = %status, "backend responded");
        self.enforce_auth_boundary(path, status);

        Ok(ApiResponse { status, body })
    }

    /// The single chokepoint for the unauthenticated boundary.
    ///
    /// Authorization-class failures from non-public endpoints clear the
    /// session and broadcast one notice. Clearing an already-empty store
    /// emits nothing, so several calls failing in the same tick produce
    /// exactly one notice.
    fn enforce_auth_boundary(&self, path: &str, status: StatusCode) {
        let auth_failure = matches!(status.as_u16(), 401 | 403 | 404);
        if !auth_failure || endpoints::is_public(path) {
            return;
        }

        if self.inner.session.clear() {
            warn!(%path, %status, "authenticated call rejected, session invalidated");
            let _ = self.inner.notices.send(SessionNotice::Expired {
                message: SESSION_EXPIRED_MESSAGE.to_owned(),
            });
        }
    }

    fn scheme_for(&self, path: &str) -> AuthScheme {
        let trimmed = path.trim_start_matches('/');
        self.inner
            .auth_overrides
            .iter()
            .find(|(configured, _)| configured.trim_start_matches('/') == trimmed)
            .map_or_else(AuthScheme::default, |(_, scheme)| *scheme)
    }
}

/// Parse a response body defensively.
///
/// The backend occasionally answers with plain text; wrapping it keeps the
/// message reachable for classification instead of failing the call.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| json!({ "message": text }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_json() {
        let body = parse_body(r#"{"message":"ok"}"#);
        assert_eq!(body["message"], "ok");
    }

    #[test]
    fn test_parse_body_plain_text_is_wrapped() {
        let body = parse_body("Service unavailable");
        assert_eq!(body["message"], "Service unavailable");
    }

    #[test]
    fn test_parse_body_empty() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("   "), Value::Null);
    }

    #[test]
    fn test_response_message_locations() {
        let flat = ApiResponse {
            status: StatusCode::OK,
            body: json!({"message": "hello"}),
        };
        assert_eq!(flat.message(), Some("hello"));

        let error_field = ApiResponse {
            status: StatusCode::BAD_REQUEST,
            body: json!({"error": "nope"}),
        };
        assert_eq!(error_field.message(), Some("nope"));

        let nested = ApiResponse {
            status: StatusCode::OK,
            body: json!({"data": {"message": "deep"}}),
        };
        assert_eq!(nested.message(), Some("deep"));

        let none = ApiResponse {
            status: StatusCode::OK,
            body: Value::Null,
        };
        assert_eq!(none.message(), None);
    }
}
