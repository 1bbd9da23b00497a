//! Common test utilities

#![allow(dead_code)]

pub mod test_fixtures;

use agricool::client::{OfflinePublisher, PumpCommandPublisher};
use agricool::config::ServerConfig;
use agricool::http_transport::{router, AppState};
use agricool::models::Notification;
use agricool::realtime::RealtimeHub;
use agricool::services::PumpCorrelator;
use agricool::storage::Database;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Fully wired application over an in-memory store and offline publisher
pub struct TestHarness {
    pub state: Arc<AppState>,
    pub publisher: Arc<OfflinePublisher>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(ServerConfig::offline()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let db = Database::connect(&config.database)
            .await
            .expect("in-memory database");
        let publisher = Arc::new(OfflinePublisher::new());
        let dyn_publisher: Arc<dyn PumpCommandPublisher> = publisher.clone();
        let state = Arc::new(AppState::new(
            &config,
            db,
            RealtimeHub::new(config.http.broadcast_capacity),
            dyn_publisher,
        ));
        state.correlator.restore().await.expect("restore");

        Self { state, publisher }
    }

    pub fn correlator(&self) -> &PumpCorrelator {
        &self.state.correlator
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Every stored notification, newest first
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state
            .notifications
            .list(Some(10_000))
            .await
            .expect("list notifications")
    }

    /// Send one request through the router and decode the JSON body
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }
}
