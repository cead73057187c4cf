//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An application router over the in-memory backend
//! - A fixed random seed so reviewer picks are reproducible
//! - JSON request helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use reviewrota_api::app::{build_router, AppState};
use reviewrota_api::config::Config;
use reviewrota_api::shutdown::Shutdown;
use reviewrota_shared::models::User;
use reviewrota_shared::storage::{InMemoryStore, StoreResult, Stores, UserStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// User store whose `get_by_id` takes `delay` before answering
pub struct SlowUsers {
    inner: Arc<InMemoryStore>,
    delay: Duration,
}

#[async_trait]
impl UserStore for SlowUsers {
    async fn create_or_update(&self, user: &User) -> StoreResult<()> {
        self.inner.create_or_update(user).await
    }

    async fn get_by_id(&self, user_id: &str) -> StoreResult<Option<User>> {
        tokio::time::sleep(self.delay).await;
        UserStore::get_by_id(self.inner.as_ref(), user_id).await
    }

    async fn get_active_by_team(&self, team_name: &str) -> StoreResult<Vec<User>> {
        self.inner.get_active_by_team(team_name).await
    }

    async fn update_is_active(&self, user_id: &str, is_active: bool) -> StoreResult<bool> {
        self.inner.update_is_active(user_id, is_active).await
    }

    async fn get_by_team(&self, team_name: &str) -> StoreResult<Vec<User>> {
        self.inner.get_by_team(team_name).await
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<InMemoryStore>,
    pub cancel: CancellationToken,
    pub shutdown: Shutdown,
}

impl TestContext {
    /// Creates a new test context with an empty in-memory store
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::build(Config::in_memory(), Stores::in_memory(store.clone()), store)
    }

    /// User lookups take `delay`; requests time out after one second
    pub fn with_slow_users(delay: Duration) -> Self {
        let mut config = Config::in_memory();
        config.api.request_timeout_secs = 1;
        config.storage.timeout_ms = 60_000;

        let store = Arc::new(InMemoryStore::new());
        let stores = Stores {
            users: Arc::new(SlowUsers {
                inner: store.clone(),
                delay,
            }),
            ..Stores::in_memory(store.clone())
        };
        Self::build(config, stores, store)
    }

    fn build(mut config: Config, stores: Stores, store: Arc<InMemoryStore>) -> Self {
        config.rng_seed = Some(7);

        let cancel = CancellationToken::new();
        let shutdown = Shutdown::new(cancel.clone(), config.graceful_shutdown_timeout());
        let state = AppState::new(config, stores, None, cancel.clone());

        Self {
            app: build_router(state),
            store,
            cancel,
            shutdown,
        }
    }

    /// Sends a request and returns status plus parsed JSON body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&body))
            })
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Creates a team from `(user_id, is_active)` pairs
    pub async fn create_team(&self, team_name: &str, members: &[(&str, bool)]) {
        let members: Vec<Value> = members
            .iter()
            .map(|(id, active)| {
                json!({ "user_id": id, "username": format!("User {id}"), "is_active": active })
            })
            .collect();

        let (status, body) = self
            .post("/team/add", json!({ "team_name": team_name, "members": members }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    /// Opens a pull request and returns the `pr` object
    pub async fn create_pr(&self, id: &str, author: &str) -> Value {
        let (status, body) = self
            .post(
                "/pullRequest/create",
                json!({
                    "pull_request_id": id,
                    "pull_request_name": format!("PR {id}"),
                    "author_id": author,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["pr"].clone()
    }
}

/// Error code from an error response body
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

/// Reviewer IDs from a `pr` object
pub fn reviewers(pr: &Value) -> Vec<String> {
    pr["assigned_reviewers"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(|id| id.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
