//! Integration tests for Prickly Pear.
//!
//! Each test spins an in-process fake backend (axum on an ephemeral port),
//! points a [`ClientState`] at it, and drives the public flows end to end.
//!
//! # Test Categories
//!
//! - `auth_flows` - registration, verification, login, password reset
//! - `session_invalidation` - bearer attachment and the unauthenticated
//!   boundary
//! - `cart_persistence` - cart state across restarts
//!
//! The backend answers any path with a canned response scripted per test
//! via [`TestBackend::respond`], records every request it sees, and can
//! delay answers to hold operations in flight.

// Test harness; panics abort the test run, which is what we want.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

use prickly_pear_client::{ClientConfig, ClientState, Storage};
use prickly_pear_core::Product;

/// One request as the fake backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// `Authorization` header value, if any.
    pub authorization: Option<String>,
    /// Parsed JSON body; `null` when absent or not JSON.
    pub body: Value,
}

/// A scripted response.
#[derive(Debug, Clone)]
pub struct CannedResponse {
    /// HTTP status to answer with.
    pub status: u16,
    /// JSON body to answer with.
    pub body: Value,
    /// Optional delay before answering, to hold a call in flight.
    pub delay: Option<Duration>,
}

/// In-process fake backend.
#[derive(Clone, Default)]
pub struct TestBackend {
    inner: Arc<BackendInner>,
}

#[derive(Default)]
struct BackendInner {
    responses: Mutex<HashMap<String, CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl TestBackend {
    /// Start the backend on an ephemeral port. Returns the handle used to
    /// script it and the base URL to point a client at.
    pub async fn spawn() -> (Self, Url) {
        let backend = Self::default();
        let router = Router::new()
            .fallback(handle)
            .with_state(backend.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve test backend");
        });

        let base = format!("http://{addr}/").parse().expect("base url");
        (backend, base)
    }

    /// Script the response for `path`, replacing any previous script.
    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.respond_with(
            path,
            CannedResponse {
                status,
                body,
                delay: None,
            },
        );
    }

    /// Script a delayed response for `path`.
    pub fn respond_slow(&self, path: &str, status: u16, body: Value, delay: Duration) {
        self.respond_with(
            path,
            CannedResponse {
                status,
                body,
                delay: Some(delay),
            },
        );
    }

    /// Script a full [`CannedResponse`] for `path`.
    pub fn respond_with(&self, path: &str, response: CannedResponse) {
        let mut responses = self
            .inner
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        responses.insert(path.to_owned(), response);
    }

    /// Every request seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests seen for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.requests().iter().filter(|r| r.path == path).count()
    }

    /// Number of requests seen in total.
    pub fn total_hits(&self) -> usize {
        self.requests().len()
    }

    /// The most recent request for `path`.
    pub fn last_request(&self, path: &str) -> Option<RecordedRequest> {
        self.requests().into_iter().rev().find(|r| r.path == path)
    }
}

async fn handle(State(backend): State<TestBackend>, request: Request) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    {
        let mut requests = backend
            .inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        requests.push(RecordedRequest {
            method,
            path: path.clone(),
            authorization,
            body,
        });
    }

    let canned = {
        let responses = backend
            .inner
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        responses.get(&path).cloned()
    };

    match canned {
        Some(canned) => {
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            let status =
                StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(canned.body)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "no canned response" })),
        )
            .into_response(),
    }
}

// =============================================================================
// Client helpers
// =============================================================================

/// A client wired against the fake backend with in-memory storage.
pub fn client_for(base: &Url) -> ClientState {
    ClientState::new(ClientConfig::new(base.clone())).expect("client state")
}

/// A client wired against the fake backend with explicit storage, so tests
/// can pre-seed and inspect persisted state.
pub fn client_with_storage(base: &Url, storage: Arc<dyn Storage>) -> ClientState {
    ClientState::with_storage(ClientConfig::new(base.clone()), storage).expect("client state")
}

/// A product fixture.
pub fn product(id: &str, price: &str) -> Product {
    Product {
        id: id.to_owned(),
        name: format!("Product {id}"),
        price: price.parse().expect("decimal price"),
        image_url: None,
        extra: serde_json::Map::new(),
    }
}
