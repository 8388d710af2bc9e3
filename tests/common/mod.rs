//! Shared harness: a real server on an ephemeral port backed by the
//! in-memory store.

#![allow(dead_code, clippy::panic)]

pub mod scenarios;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use eventflow::api;
use eventflow::app_state::AppState;
use eventflow::domain::EventBus;
use eventflow::persistence::{EnrollmentStore, MemoryStore};

/// A running server plus a client pointed at it.
pub struct TestServer {
    /// Bound address.
    pub addr: SocketAddr,
    /// HTTP client.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Starts a server on `127.0.0.1:0`.
    pub async fn spawn() -> Self {
        let store: Arc<dyn EnrollmentStore> = Arc::new(MemoryStore::new());
        let app = api::app(
            AppState::new(store, EventBus::new(1024)),
            Duration::from_secs(10),
        );
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// WebSocket URL of the feed.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Sends a request as `actor` (if any) and returns status and JSON body.
    pub async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        actor: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut req = self.client.request(method, self.url(path));
        if let Some(actor) = actor {
            req = req.header("X-User-Id", actor);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let Ok(resp) = req.send().await else {
            panic!("request to {path} failed");
        };
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Registers a user and returns its id.
    pub async fn user(&self, name: &str, role: &str) -> String {
        let (status, body) = self
            .call(
                reqwest::Method::POST,
                "/api/v1/users",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{name}@example.org"),
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, 201, "user creation: {body}");
        id_of(&body)
    }

    /// Creates an event owned by `organizer` and returns its id.
    pub async fn event(&self, organizer: &str, capacity: u32, starts_at: DateTime<Utc>) -> String {
        let (status, body) = self
            .call(
                reqwest::Method::POST,
                "/api/v1/events",
                Some(organizer),
                Some(json!({
                    "title": "Rust Workshop",
                    "starts_at": starts_at,
                    "capacity": capacity,
                })),
            )
            .await;
        assert_eq!(status, 201, "event creation: {body}");
        id_of(&body)
    }
}

/// Extracts the `id` string of a JSON record.
pub fn id_of(body: &Value) -> String {
    let Some(id) = body.get("id").and_then(Value::as_str) else {
        panic!("no id in {body}");
    };
    id.to_string()
}

/// Extracts the error kind of an error envelope.
pub fn kind_of(body: &Value) -> &str {
    body.pointer("/error/kind")
        .and_then(Value::as_str)
        .unwrap_or_default()
}
