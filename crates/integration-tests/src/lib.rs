//! Integration tests for the ChinChin client.
//!
//! Every test starts its own `wiremock` server and a client over an in-memory
//! store, so tests share no state and need no running backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p chinchin-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `refresh_replay` - 401 handling, single-flight refresh and replay
//! - `facade` - CRUD, cache mirroring, error mapping and cart rules
//! - `session` - login, logout and restore
//! - `transport` - timeouts and unreachable servers

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use chinchin_client::{
    ChinChinClient, ClientConfig, CollectionKind, KeyValueStore, MemoryStore, Signal, StorageKey,
};
use tokio::sync::broadcast;
use wiremock::MockServer;

/// A client wired to a fresh mock backend.
pub struct TestContext {
    pub server: MockServer,
    pub store: Arc<MemoryStore>,
    pub client: ChinChinClient,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Like [`new`](Self::new), with a short per-request timeout.
    pub async fn with_timeout(timeout: Duration) -> Self {
        Self::build(Some(timeout)).await
    }

    async fn build(timeout: Option<Duration>) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let mut config = ClientConfig::new(&server.uri(), "unused.json").unwrap();
        if let Some(timeout) = timeout {
            config.request_timeout = timeout;
        }
        let client = ChinChinClient::with_store(&config, store.clone()).unwrap();
        Self {
            server,
            store,
            client,
        }
    }

    /// Store credentials as if a login had happened.
    pub fn sign_in(&self, access_token: &str, refresh_token: Option<&str>) {
        let mut entries = vec![
            (StorageKey::AccessToken, access_token),
            (
                StorageKey::UserProfile,
                r#"{"name":"Lan","email":"lan@chinchin.vn","role":"user"}"#,
            ),
        ];
        if let Some(refresh) = refresh_token {
            entries.push((StorageKey::RefreshToken, refresh));
        }
        self.store.set_all(&entries).unwrap();
    }

    pub fn get(&self, key: StorageKey) -> Option<String> {
        self.store.get(key).unwrap()
    }

    /// Cached collection parsed back to JSON.
    pub fn cached(&self, kind: CollectionKind) -> Option<serde_json::Value> {
        self.get(StorageKey::Collection(kind))
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    pub fn credentials_cleared(&self) -> bool {
        StorageKey::CREDENTIALS.iter().all(|key| self.get(*key).is_none())
    }

    /// Path of an endpoint as the mock server sees it.
    #[must_use]
    pub fn api_path(path: &str) -> String {
        format!("/api/{path}")
    }
}

/// Everything already published on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<Signal>) -> Vec<Signal> {
    let mut signals = Vec::new();
    while let Ok(signal) = rx.try_recv() {
        signals.push(signal);
    }
    signals
}
